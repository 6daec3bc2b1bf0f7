use sipr_sip_msg::{HeaderKind, NameAddr, SipMsg};

use super::{CONTENT_LENGTH, CRLF, MessageBuilder, REPLY_VERSION, TO, TOTAG};
use crate::arena::ShmStr;
use crate::error::{Result, TmError};
use crate::transaction::CellState;

/// Reason phrase used for locally generated replies
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Trying",
        180 => "Ringing",
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        481 => "Call/Transaction Does Not Exist",
        486 => "Busy Here",
        487 => "Request Terminated",
        500 => "Server Internal Error",
        503 => "Service Unavailable",
        600 => "Busy Everywhere",
        603 => "Decline",
        _ => "Unknown",
    }
}

impl MessageBuilder {
    /// Final reply to the request stored on the server side of a transaction.
    ///
    /// The To header gets `to_tag` unless the request already carried one.
    pub fn build_local_reply(
        &self,
        state: &CellState,
        code: u16,
        reason: &str,
        to_tag: &str,
    ) -> Result<ShmStr> {
        let request = state
            .uas
            .request
            .as_ref()
            .ok_or_else(|| TmError::ProtocolViolation("transaction has no request".to_string()))?;
        let msg = SipMsg::scan(request)?;

        let vias: Vec<&[u8]> = msg.vias().map(|h| h.raw).collect();
        if vias.is_empty() {
            return Err(TmError::MissingHeader("Via"));
        }
        let from = msg.from().ok_or(TmError::MissingHeader("From"))?.raw;
        let to = msg.to().ok_or(TmError::MissingHeader("To"))?;
        let callid = msg.call_id().ok_or(TmError::MissingHeader("Call-ID"))?.raw;
        let cseq = msg.header(HeaderKind::CSeq).ok_or(TmError::MissingHeader("CSeq"))?.raw;

        let to_body = sipr_sip_msg::parser::trim_lws(to.body);
        let to_has_tag = NameAddr::parse(to.body)?.tag.is_some();
        let to_len = if to_has_tag {
            to.raw.len()
        } else {
            TO.len() + to_body.len() + TOTAG.len() + to_tag.len() + CRLF.len()
        };
        let code = code.to_string();

        let len = REPLY_VERSION.len()
            + code.len()
            + 1
            + reason.len()
            + CRLF.len()
            + vias.iter().map(|v| v.len()).sum::<usize>()
            + from.len()
            + to_len
            + callid.len()
            + cseq.len()
            + self.signature_len()
            + CONTENT_LENGTH.len()
            + 1
            + CRLF.len() * 2;

        let mut buf = self.arena.alloc(len)?;
        buf.put(REPLY_VERSION)?;
        buf.put(code.as_bytes())?;
        buf.put(b" ")?;
        buf.put(reason.as_bytes())?;
        buf.put(CRLF)?;
        for via in vias {
            buf.put(via)?;
        }
        buf.put(from)?;
        if to_has_tag {
            buf.put(to.raw)?;
        } else {
            buf.put(TO)?;
            buf.put(to_body)?;
            buf.put(TOTAG)?;
            buf.put(to_tag.as_bytes())?;
            buf.put(CRLF)?;
        }
        buf.put(callid)?;
        buf.put(cseq)?;
        self.put_signature(&mut buf)?;
        buf.put(CONTENT_LENGTH)?;
        buf.put(b"0")?;
        buf.put(CRLF)?;
        buf.put(CRLF)?;
        buf.finish()
    }
}
