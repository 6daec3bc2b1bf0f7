use super::{CONTENT_LENGTH, CRLF, MessageBuilder, SIP_VERSION, t_calc_branch, via_builder};
use crate::arena::ShmStr;
use crate::error::{Result, TmError};
use crate::transaction::{Cell, CellState};

const CANCEL: &[u8] = b"CANCEL";

impl MessageBuilder {
    /// CANCEL for branch `branch` of the local transaction `cancelled`,
    /// carrying extra `headers` and an optional `body`.
    ///
    /// Content-Length is only printed when a body is given.
    pub fn build_uac_cancel(
        &self,
        headers: &[u8],
        body: &[u8],
        cancelled: &Cell,
        state: &CellState,
        branch: usize,
    ) -> Result<ShmStr> {
        let uac = state.uac.get(branch).ok_or_else(|| {
            TmError::ProtocolViolation(format!("no branch {branch} on {}", cancelled.id))
        })?;
        let via = via_builder(&uac.send_sock, &t_calc_branch(cancelled, branch, self.syn_branch));
        let content_length = (!body.is_empty()).then(|| body.len().to_string());
        let h = &cancelled.headers;

        let len = CANCEL.len()
            + 1
            + uac.uri.len()
            + SIP_VERSION.len()
            + via.len()
            + h.from.len()
            + h.callid.len()
            + h.to.len()
            + h.cseq_n.len()
            + 1
            + CANCEL.len()
            + CRLF.len()
            + content_length.as_ref().map_or(0, |l| CONTENT_LENGTH.len() + l.len() + CRLF.len())
            + self.signature_len()
            + headers.len()
            + CRLF.len()
            + body.len();

        let mut buf = self.arena.alloc(len)?;
        buf.put(CANCEL)?;
        buf.put(b" ")?;
        buf.put(&uac.uri)?;
        buf.put(SIP_VERSION)?;
        buf.put(via.as_bytes())?;
        buf.put(&h.from)?;
        buf.put(&h.callid)?;
        buf.put(&h.to)?;
        buf.put(&h.cseq_n)?;
        buf.put(b" ")?;
        buf.put(CANCEL)?;
        buf.put(CRLF)?;
        if let Some(length) = &content_length {
            buf.put(CONTENT_LENGTH)?;
            buf.put(length.as_bytes())?;
            buf.put(CRLF)?;
        }
        self.put_signature(&mut buf)?;
        buf.put(headers)?;
        buf.put(CRLF)?;
        buf.put(body)?;
        buf.finish()
    }
}
