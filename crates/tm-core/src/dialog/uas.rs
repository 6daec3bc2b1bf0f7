//! Dialog as seen by the UAS: created from the request and the 2xx we send.

use sipr_sip_msg::{HeaderKind, NameAddr, SipMsg};
use tracing::debug;

use super::uac::contact_uri;
use super::{Dialog, DialogState, DlgSeq, DlgUpdate, Hooks, RouteOrder, RouteSource, get_route_set};
use crate::arena::SharedArena;
use crate::error::{Result, TmError};
use crate::tags::TagGenerator;

/// Create a confirmed dialog from a request we answer with `code`.
///
/// Only 2xx codes create dialogs.
pub fn new_dlg_uas(
    request: &SipMsg<'_>,
    code: u16,
    tags: &TagGenerator,
    arena: &SharedArena,
) -> Result<Dialog> {
    if !(200..300).contains(&code) {
        return Err(TmError::ProtocolViolation(format!(
            "dialog cannot be created by a {code} reply"
        )));
    }
    if !request.is_request() {
        return Err(TmError::ProtocolViolation("not a request".to_string()));
    }

    let call_id = request.require(HeaderKind::CallId)?.body;
    let cseq = request.cseq().ok_or(TmError::MissingHeader("CSeq"))??;
    let from = NameAddr::parse(request.require(HeaderKind::From)?.body)?;
    let to = NameAddr::parse(request.require(HeaderKind::To)?.body)?;
    let from_tag = from.tag.unwrap_or_default();

    let local_tag = tags.local_tag(&[call_id, from_tag, cseq.number_raw]);

    let remote_target = contact_uri(request, arena)?;
    let remote_tag = match from.tag {
        Some(tag) => Some(arena.dup(tag)?),
        None => None,
    };
    let call_id = arena.dup(call_id)?;
    let local_tag = arena.dup(local_tag.as_bytes())?;
    let remote_uri = arena.dup(&from.without_tag())?;
    let local_uri = arena.dup(&to.without_tag())?;
    let route_set = get_route_set(request, RouteSource::RecordRoute, RouteOrder::Normal, arena)?;

    let mut dialog = Dialog {
        call_id,
        local_tag,
        remote_tag,
        local_seq: DlgSeq::new(fastrand::u32(1..0x8000_0000)),
        remote_seq: DlgSeq::new(cseq.number),
        local_uri,
        remote_uri,
        local_display: None,
        remote_display: None,
        remote_target,
        route_set,
        hooks: Hooks::default(),
        send_sock: None,
        secure: request.ruri().is_some_and(|uri| uri.starts_with(b"sips:")),
        state: DialogState::Confirmed,
        arena: arena.clone(),
    };
    dialog.calculate_hooks();
    debug!(call_id = %dialog.call_id, "UAS dialog created");
    Ok(dialog)
}

impl Dialog {
    /// Fold a request received within this dialog into its state.
    ///
    /// Requests whose CSeq is not above the last one seen are ignored.
    pub fn dlg_request_uas(&mut self, request: &SipMsg<'_>) -> Result<DlgUpdate> {
        self.ensure_alive()?;
        let cseq = request.cseq().ok_or(TmError::MissingHeader("CSeq"))??;

        if self.remote_seq.is_set && cseq.number <= self.remote_seq.value {
            return Ok(DlgUpdate::Unchanged);
        }
        self.remote_seq = DlgSeq::new(cseq.number);

        if request.method() == Some(&b"INVITE"[..]) {
            if let Some(target) = contact_uri(request, &self.arena)? {
                self.remote_target = Some(target);
                self.calculate_hooks();
                return Ok(DlgUpdate::TargetRefreshed);
            }
        }
        Ok(DlgUpdate::SequenceUpdated)
    }
}
