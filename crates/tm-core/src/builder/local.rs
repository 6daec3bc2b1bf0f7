use sipr_sip_msg::{HeaderKind, SipMsg};

use super::{
    CONTENT_LENGTH, CRLF, MAXFWD_HEADER, MessageBuilder, SIP_VERSION, cseq_number_prefix,
    t_calc_branch, via_builder,
};
use crate::arena::ShmStr;
use crate::error::{Result, TmError};
use crate::transaction::{Cell, CellState};

impl MessageBuilder {
    /// Hop-by-hop ACK or CANCEL for branch `branch` of `cell`.
    ///
    /// `to` is the complete To line to use, normally the one of the reply
    /// being acknowledged. Route headers are copied from the request sent on
    /// the branch unless the transaction is local.
    pub fn build_local(
        &self,
        cell: &Cell,
        state: &CellState,
        branch: usize,
        method: &[u8],
        to: &[u8],
    ) -> Result<ShmStr> {
        let uac = state
            .uac
            .get(branch)
            .ok_or_else(|| TmError::ProtocolViolation(format!("no branch {branch} on {}", cell.id)))?;
        let overrides = state.overrides;
        let rescan = !cell.is_local || overrides.from || overrides.to || overrides.cseq;
        let sent = match (&uac.request, rescan) {
            (Some(request), true) => Some(SipMsg::scan(request)?),
            _ => None,
        };

        let from: &[u8] = match (&sent, overrides.from) {
            (Some(msg), true) => msg.from().ok_or(TmError::MissingHeader("From"))?.raw,
            _ => cell.headers.from.as_bytes(),
        };
        let to: &[u8] = match (&sent, overrides.to) {
            (Some(msg), true) => msg.to().ok_or(TmError::MissingHeader("To"))?.raw,
            _ => to,
        };
        let cseq_n: &[u8] = match (&sent, overrides.cseq) {
            (Some(msg), true) => {
                cseq_number_prefix(msg.header(HeaderKind::CSeq).ok_or(TmError::MissingHeader("CSeq"))?)?
            }
            _ => cell.headers.cseq_n.as_bytes(),
        };
        let routes: Vec<&[u8]> = match (&sent, cell.is_local) {
            (Some(msg), false) => msg.routes().map(|h| h.raw).collect(),
            _ => Vec::new(),
        };
        let via = via_builder(&uac.send_sock, &t_calc_branch(cell, branch, self.syn_branch));
        let callid: &[u8] = &cell.headers.callid;

        let len = method.len()
            + 1
            + uac.uri.len()
            + SIP_VERSION.len()
            + via.len()
            + from.len()
            + callid.len()
            + to.len()
            + cseq_n.len()
            + 1
            + method.len()
            + CRLF.len()
            + MAXFWD_HEADER.len()
            + routes.iter().map(|r| r.len()).sum::<usize>()
            + self.signature_len()
            + CONTENT_LENGTH.len()
            + 1
            + CRLF.len() * 2;

        let mut buf = self.arena.alloc(len)?;
        buf.put(method)?;
        buf.put(b" ")?;
        buf.put(&uac.uri)?;
        buf.put(SIP_VERSION)?;
        buf.put(via.as_bytes())?;
        buf.put(from)?;
        buf.put(callid)?;
        buf.put(to)?;
        buf.put(cseq_n)?;
        buf.put(b" ")?;
        buf.put(method)?;
        buf.put(CRLF)?;
        buf.put(MAXFWD_HEADER)?;
        for route in routes {
            buf.put(route)?;
        }
        self.put_signature(&mut buf)?;
        buf.put(CONTENT_LENGTH)?;
        buf.put(b"0")?;
        buf.put(CRLF)?;
        buf.put(CRLF)?;
        buf.finish()
    }
}
