use super::{
    CALLID, CONTENT_LENGTH, CRLF, CSEQ, FROM, MessageBuilder, SIP_VERSION, TO, TOTAG, calc_branch,
    via_builder,
};
use crate::arena::{ShmBuf, ShmStr};
use crate::dialog::Dialog;
use crate::error::{Result, TmError};
use crate::transaction::{CellHeaders, CellId};
use crate::transport::SocketInfo;

/// A request built within a dialog, with the header slices a local cell
/// keeps for its ACK and CANCEL
#[derive(Debug, Clone)]
pub struct UacRequest {
    pub buffer: ShmStr,
    pub ruri: ShmStr,
    pub headers: CellHeaders,
}

fn name_addr_len(display: Option<&ShmStr>, uri: &[u8]) -> usize {
    match display {
        Some(display) => display.len() + 1 + uri.len() + 1,
        None => uri.len(),
    }
}

impl MessageBuilder {
    /// Request `method` within `dialog`, sent as branch `branch` of the
    /// transaction `id`.
    ///
    /// `headers` are extra header lines, CRLF terminated; `body` may be empty.
    #[allow(clippy::too_many_arguments)]
    pub fn build_uac_req(
        &self,
        method: &[u8],
        headers: &[u8],
        body: &[u8],
        dialog: &Dialog,
        id: CellId,
        md5: &str,
        branch: usize,
        sock: &SocketInfo,
    ) -> Result<UacRequest> {
        let ruri = dialog
            .hooks
            .request_uri
            .as_ref()
            .ok_or_else(|| TmError::ProtocolViolation("dialog has no request URI".to_string()))?;
        let via = via_builder(sock, &calc_branch(id, md5, branch, self.syn_branch));
        let cseq = dialog.local_seq.value.to_string();
        let content_length = body.len().to_string();
        let remote_tag = dialog.remote_tag.as_ref();

        let from_tag_len = if dialog.local_tag.is_empty() { 0 } else { TOTAG.len() + dialog.local_tag.len() };

        let to_len = TO.len()
            + name_addr_len(dialog.remote_display.as_ref(), &dialog.remote_uri)
            + remote_tag.map_or(0, |t| TOTAG.len() + t.len())
            + CRLF.len();
        let from_len = FROM.len()
            + name_addr_len(dialog.local_display.as_ref(), &dialog.local_uri)
            + from_tag_len
            + CRLF.len();
        let len = method.len()
            + 1
            + ruri.len()
            + SIP_VERSION.len()
            + via.len()
            + to_len
            + from_len
            + CSEQ.len()
            + cseq.len()
            + 1
            + method.len()
            + CRLF.len()
            + CALLID.len()
            + dialog.call_id.len()
            + CRLF.len()
            + dialog.calculate_routeset_length()
            + CONTENT_LENGTH.len()
            + content_length.len()
            + CRLF.len()
            + self.signature_len()
            + headers.len()
            + CRLF.len()
            + body.len();

        let mut buf = self.arena.alloc(len)?;
        buf.put(method)?;
        buf.put(b" ")?;
        let ruri_start = buf.position();
        buf.put(ruri)?;
        let ruri_end = buf.position();
        buf.put(SIP_VERSION)?;
        buf.put(via.as_bytes())?;

        let to_start = buf.position();
        buf.put(TO)?;
        put_name_addr(&mut buf, dialog.remote_display.as_ref(), &dialog.remote_uri)?;
        if let Some(tag) = remote_tag {
            buf.put(TOTAG)?;
            buf.put(tag)?;
        }
        buf.put(CRLF)?;

        let from_start = buf.position();
        buf.put(FROM)?;
        put_name_addr(&mut buf, dialog.local_display.as_ref(), &dialog.local_uri)?;
        if !dialog.local_tag.is_empty() {
            buf.put(TOTAG)?;
            buf.put(&dialog.local_tag)?;
        }
        buf.put(CRLF)?;

        let cseq_start = buf.position();
        buf.put(CSEQ)?;
        buf.put(cseq.as_bytes())?;
        let cseq_end = buf.position();
        buf.put(b" ")?;
        buf.put(method)?;
        buf.put(CRLF)?;

        let callid_start = buf.position();
        buf.put(CALLID)?;
        buf.put(&dialog.call_id)?;
        buf.put(CRLF)?;
        let callid_end = buf.position();

        dialog.print_routeset(&mut buf)?;
        buf.put(CONTENT_LENGTH)?;
        buf.put(content_length.as_bytes())?;
        buf.put(CRLF)?;
        self.put_signature(&mut buf)?;
        buf.put(headers)?;
        buf.put(CRLF)?;
        buf.put(body)?;

        let buffer = buf.finish()?;
        Ok(UacRequest {
            ruri: buffer.slice(ruri_start..ruri_end),
            headers: CellHeaders {
                to: buffer.slice(to_start..from_start),
                from: buffer.slice(from_start..cseq_start),
                callid: buffer.slice(callid_start..callid_end),
                cseq_n: buffer.slice(cseq_start..cseq_end),
            },
            buffer,
        })
    }
}

fn put_name_addr(buf: &mut ShmBuf, display: Option<&ShmStr>, uri: &[u8]) -> Result<()> {
    match display {
        Some(display) => {
            buf.put(display)?;
            buf.put(b"<")?;
            buf.put(uri)?;
            buf.put(b">")
        }
        None => buf.put(uri),
    }
}
