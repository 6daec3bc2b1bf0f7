//! Wire serialization of locally generated messages.
//!
//! Every builder works in two passes: the exact length is summed from the
//! pieces first, then the pieces are written into a [`ShmBuf`] of that size.
//! A mismatch between the two passes surfaces as
//! [`TmError::BufferTooSmall`](crate::TmError::BufferTooSmall).

use sipr_sip_msg::{CSeqView, HeaderField};

use crate::arena::{SharedArena, ShmBuf};
use crate::config::TmConfig;
use crate::error::Result;

pub mod branch;
mod cancel;
mod dlg_ack;
mod forward;
mod local;
mod reply;
mod uac_req;
pub mod via;

pub use branch::{BRANCH_MAGIC, BranchKey, ParsedBranch, calc_branch, parse_branch, t_calc_branch};
pub use dlg_ack::DlgAck;
pub use reply::reason_phrase;
pub use uac_req::UacRequest;
pub use via::{via_branch, via_builder};

pub const CRLF: &[u8] = b"\r\n";
pub const SIP_VERSION: &[u8] = b" SIP/2.0\r\n";
pub const REPLY_VERSION: &[u8] = b"SIP/2.0 ";
pub const TO: &[u8] = b"To: ";
pub const FROM: &[u8] = b"From: ";
pub const CALLID: &[u8] = b"Call-ID: ";
pub const CSEQ: &[u8] = b"CSeq: ";
pub const CONTENT_LENGTH: &[u8] = b"Content-Length: ";
pub const MAXFWD_HEADER: &[u8] = b"Max-Forwards: 70\r\n";
pub const TOTAG: &[u8] = b";tag=";
pub const ROUTE_PREFIX: &[u8] = b"Route: ";
pub const ROUTE_SEPARATOR: &[u8] = b",\r\n       ";
pub const ACK_ROUTE_SEPARATOR: &[u8] = b", ";

/// Builds requests and replies into the shared arena
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    arena: SharedArena,
    syn_branch: bool,
    signature: Option<String>,
}

impl MessageBuilder {
    pub fn new(arena: SharedArena, syn_branch: bool, signature: Option<String>) -> Self {
        MessageBuilder { arena, syn_branch, signature }
    }

    pub fn from_config(config: &TmConfig, arena: SharedArena) -> Self {
        Self::new(arena, config.syn_branch, config.server_signature.clone())
    }

    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    pub fn syn_branch(&self) -> bool {
        self.syn_branch
    }

    fn signature_len(&self) -> usize {
        self.signature.as_ref().map_or(0, |s| s.len() + CRLF.len())
    }

    fn put_signature(&self, buf: &mut ShmBuf) -> Result<()> {
        if let Some(signature) = &self.signature {
            buf.put(signature.as_bytes())?;
            buf.put(CRLF)?;
        }
        Ok(())
    }
}

/// `CSeq: <number>` cut from a CSeq header line, method and CRLF left out
pub(crate) fn cseq_number_prefix<'a>(field: &HeaderField<'a>) -> Result<&'a [u8]> {
    let cseq = CSeqView::parse(field.body)?;
    let end = cseq.number_raw.as_ptr() as usize - field.raw.as_ptr() as usize + cseq.number_raw.len();
    Ok(&field.raw[..end])
}
