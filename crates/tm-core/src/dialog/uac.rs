//! Dialog as seen by the UAC: created before the request goes out, then
//! driven by the replies.

use sipr_sip_msg::{NameAddr, SipMsg};
use tracing::debug;

use super::{Dialog, DialogState, DlgSeq, DlgUpdate, Hooks, RouteOrder, RouteSource, get_route_set};
use crate::arena::{SharedArena, ShmStr};
use crate::error::{Result, TmError};

/// Start a dialog for an initial request we are about to send.
///
/// Either every field is copied into `arena` or nothing stays allocated.
pub fn new_dlg_uac(
    call_id: &[u8],
    local_tag: &[u8],
    local_seq: u32,
    local_uri: &[u8],
    remote_uri: &[u8],
    arena: &SharedArena,
) -> Result<Dialog> {
    let call_id = arena.dup(call_id)?;
    let local_tag = arena.dup(local_tag)?;
    let local_uri = arena.dup(local_uri)?;
    let remote_uri = arena.dup(remote_uri)?;

    let mut dialog = Dialog {
        call_id,
        local_tag,
        remote_tag: None,
        local_seq: DlgSeq::new(local_seq),
        remote_seq: DlgSeq::default(),
        local_uri,
        remote_uri,
        local_display: None,
        remote_display: None,
        remote_target: None,
        route_set: Vec::new(),
        hooks: Hooks::default(),
        send_sock: None,
        secure: false,
        state: DialogState::New,
        arena: arena.clone(),
    };
    dialog.calculate_hooks();
    debug!(call_id = %dialog.call_id, "UAC dialog created");
    Ok(dialog)
}

/// Contact URI of a message, copied
pub(crate) fn contact_uri(msg: &SipMsg<'_>, arena: &SharedArena) -> Result<Option<ShmStr>> {
    match msg.contact() {
        Some(contact) => {
            let contact = NameAddr::parse(contact.body)?;
            Ok(Some(arena.dup(contact.uri)?))
        }
        None => Ok(None),
    }
}

impl Dialog {
    /// Fold a reply to a request sent in this dialog into its state
    pub fn dlg_response_uac(&mut self, reply: &SipMsg<'_>) -> Result<DlgUpdate> {
        let code = reply
            .status()
            .ok_or_else(|| TmError::ProtocolViolation("not a reply".to_string()))?;

        match self.state {
            DialogState::New | DialogState::Early => {
                if code < 200 {
                    return Ok(DlgUpdate::Unchanged);
                }
                if code >= 300 {
                    self.state = DialogState::Destroyed;
                    return Ok(DlgUpdate::Destroyed);
                }
                self.response2dlg(reply)?;
                self.state = DialogState::Confirmed;
                Ok(DlgUpdate::Confirmed)
            }
            DialogState::Confirmed => {
                if code == 481 {
                    self.state = DialogState::Destroyed;
                    return Ok(DlgUpdate::Destroyed);
                }
                if !(200..300).contains(&code) {
                    return Ok(DlgUpdate::Unchanged);
                }
                let refresh = match reply.cseq() {
                    Some(cseq) => cseq?.method == b"INVITE",
                    None => false,
                };
                if !refresh {
                    return Ok(DlgUpdate::Unchanged);
                }
                match contact_uri(reply, &self.arena)? {
                    Some(target) => {
                        self.remote_target = Some(target);
                        self.calculate_hooks();
                        Ok(DlgUpdate::TargetRefreshed)
                    }
                    None => Ok(DlgUpdate::Unchanged),
                }
            }
            DialogState::Destroyed => Err(TmError::ProtocolViolation(
                "dialog already destroyed".to_string(),
            )),
        }
    }

    /// Take remote target, remote tag and route set from a 2xx
    fn response2dlg(&mut self, reply: &SipMsg<'_>) -> Result<()> {
        let target = contact_uri(reply, &self.arena)?;
        let remote_tag = match reply.to() {
            Some(to) => match NameAddr::parse(to.body)?.tag {
                Some(tag) => Some(self.arena.dup(tag)?),
                None => None,
            },
            None => None,
        };
        let route_set = get_route_set(reply, RouteSource::RecordRoute, RouteOrder::Reverse, &self.arena)?;

        if target.is_some() {
            self.remote_target = target;
        }
        if remote_tag.is_some() {
            self.remote_tag = remote_tag;
        }
        self.route_set = route_set;
        self.calculate_hooks();
        Ok(())
    }

    /// Take the next local sequence number for a request within the dialog.
    ///
    /// ACK and CANCEL reuse the number of the request they belong to.
    pub fn next_local_seq(&mut self, method: &[u8]) -> Result<u32> {
        self.ensure_alive()?;
        if method != b"ACK" && method != b"CANCEL" {
            self.local_seq.value = self.local_seq.value.wrapping_add(1);
            self.local_seq.is_set = true;
        }
        Ok(self.local_seq.value)
    }
}
