use sipr_sip_msg::uri::has_lr_param;
use sipr_sip_msg::{NameAddr, SipMsg, parse_rr};

use super::{
    ACK_ROUTE_SEPARATOR, CONTENT_LENGTH, CRLF, MAXFWD_HEADER, MessageBuilder, ROUTE_PREFIX,
    SIP_VERSION, t_calc_branch, via_builder,
};
use crate::arena::ShmStr;
use crate::error::{Result, TmError};
use crate::transaction::{Cell, CellState};

const ACK: &[u8] = b"ACK";

/// An ACK and where to send it
#[derive(Debug, Clone)]
pub struct DlgAck {
    pub buffer: ShmStr,
    /// URI of the first hop
    pub next_hop: ShmStr,
}

impl MessageBuilder {
    /// ACK for `reply`, received on branch `branch` of a local INVITE.
    ///
    /// A 2xx ACK follows the dialog's route set, taken from the reply's
    /// Record-Route in reverse order; any other final reply is acknowledged
    /// hop-by-hop to the branch URI.
    pub fn build_dlg_ack(
        &self,
        reply: &SipMsg<'_>,
        cell: &Cell,
        state: &CellState,
        branch: usize,
        to: &[u8],
    ) -> Result<DlgAck> {
        let code = reply
            .status()
            .ok_or_else(|| TmError::ProtocolViolation("ACK requested for a request".to_string()))?;
        let uac = state
            .uac
            .get(branch)
            .ok_or_else(|| TmError::ProtocolViolation(format!("no branch {branch} on {}", cell.id)))?;

        let mut hops: Vec<&[u8]> = Vec::new();
        let mut trailing: Option<&[u8]> = None;
        let (ruri, next_hop): (&[u8], &[u8]) = if (200..300).contains(&code) {
            let contact = reply.contact().ok_or(TmError::MissingHeader("Contact"))?;
            let contact = NameAddr::parse(contact.body)?.uri;

            let mut tokens = Vec::new();
            for header in reply.record_routes() {
                tokens.extend(parse_rr(header.body)?);
            }
            tokens.reverse();

            match tokens.first().copied() {
                None => (contact, contact),
                Some(first) if has_lr_param(first.uri) => {
                    hops = tokens.iter().map(|t| t.text).collect();
                    (contact, first.uri)
                }
                Some(first) => {
                    hops = tokens[1..].iter().map(|t| t.text).collect();
                    trailing = Some(contact);
                    (first.uri, first.uri)
                }
            }
        } else {
            (uac.uri.as_bytes(), uac.uri.as_bytes())
        };

        let entries = hops.len() + usize::from(trailing.is_some());
        let routes_len = if entries == 0 {
            0
        } else {
            ROUTE_PREFIX.len()
                + hops.iter().map(|h| h.len()).sum::<usize>()
                + trailing.map_or(0, |c| c.len() + 2)
                + ACK_ROUTE_SEPARATOR.len() * (entries - 1)
                + CRLF.len()
        };

        let via = via_builder(&uac.send_sock, &t_calc_branch(cell, branch, self.syn_branch));
        let from: &[u8] = &cell.headers.from;
        let callid: &[u8] = &cell.headers.callid;
        let cseq_n: &[u8] = &cell.headers.cseq_n;

        let len = ACK.len()
            + 1
            + ruri.len()
            + SIP_VERSION.len()
            + via.len()
            + from.len()
            + callid.len()
            + to.len()
            + cseq_n.len()
            + 1
            + ACK.len()
            + CRLF.len()
            + MAXFWD_HEADER.len()
            + routes_len
            + self.signature_len()
            + CONTENT_LENGTH.len()
            + 1
            + CRLF.len() * 2;

        let mut buf = self.arena.alloc(len)?;
        buf.put(ACK)?;
        buf.put(b" ")?;
        buf.put(ruri)?;
        buf.put(SIP_VERSION)?;
        buf.put(via.as_bytes())?;
        buf.put(from)?;
        buf.put(callid)?;
        buf.put(to)?;
        buf.put(cseq_n)?;
        buf.put(b" ")?;
        buf.put(ACK)?;
        buf.put(CRLF)?;
        buf.put(MAXFWD_HEADER)?;
        if entries > 0 {
            buf.put(ROUTE_PREFIX)?;
            for (i, hop) in hops.iter().enumerate() {
                if i > 0 {
                    buf.put(ACK_ROUTE_SEPARATOR)?;
                }
                buf.put(hop)?;
            }
            if let Some(contact) = trailing {
                if !hops.is_empty() {
                    buf.put(ACK_ROUTE_SEPARATOR)?;
                }
                buf.put(b"<")?;
                buf.put(contact)?;
                buf.put(b">")?;
            }
            buf.put(CRLF)?;
        }
        self.put_signature(&mut buf)?;
        buf.put(CONTENT_LENGTH)?;
        buf.put(b"0")?;
        buf.put(CRLF)?;
        buf.put(CRLF)?;

        Ok(DlgAck { buffer: buf.finish()?, next_hop: self.arena.dup(next_hop)? })
    }
}
