//! Dialog state kept by a UAC or UAS.
//!
//! ```text
//!            1xx (enter_early)
//!   New ─────────────────────► Early
//!    │ 2xx                       │ 2xx
//!    └──────────► Confirmed ◄────┘
//!    │ >=300         │ 481       │ >=300
//!    └──────────► Destroyed ◄────┘
//! ```
//!
//! A dialog is owned by exactly one party at a time; every string in it is a
//! deep copy charged to the [`SharedArena`] it was created with.

use std::fmt;

use crate::arena::{SharedArena, ShmStr};
use crate::error::{Result, TmError};
use crate::transport::SocketInfo;

pub mod hooks;
pub mod route_set;
pub mod uac;
pub mod uas;

pub use hooks::Hooks;
pub use route_set::{RouteEntry, RouteOrder, RouteSource, get_route_set};
pub use uac::new_dlg_uac;
pub use uas::new_dlg_uas;

/// Dialog states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogState {
    New,
    Early,
    Confirmed,
    Destroyed,
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialogState::New => "new",
            DialogState::Early => "early",
            DialogState::Confirmed => "confirmed",
            DialogState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// A CSeq counter that may not have been seen yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DlgSeq {
    pub value: u32,
    pub is_set: bool,
}

impl DlgSeq {
    pub fn new(value: u32) -> Self {
        DlgSeq { value, is_set: true }
    }
}

/// What a reply or request did to a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlgUpdate {
    Unchanged,
    /// Only the remote sequence number moved
    SequenceUpdated,
    Confirmed,
    TargetRefreshed,
    Destroyed,
}

/// A SIP dialog
#[derive(Debug, Clone)]
pub struct Dialog {
    /// Call-ID
    pub call_id: ShmStr,

    /// Our tag
    pub local_tag: ShmStr,

    /// Peer's tag; unknown until the first reply with a To tag
    pub remote_tag: Option<ShmStr>,

    /// Sequence number of the last request we sent
    pub local_seq: DlgSeq,

    /// Highest sequence number received from the peer
    pub remote_seq: DlgSeq,

    /// Our URI, From of our requests
    pub local_uri: ShmStr,

    /// Peer's URI, To of our requests
    pub remote_uri: ShmStr,

    pub local_display: Option<ShmStr>,
    pub remote_display: Option<ShmStr>,

    /// Peer's Contact
    pub remote_target: Option<ShmStr>,

    /// Route set in the order our requests must traverse it
    pub route_set: Vec<RouteEntry>,

    /// Derived from the route set and remote target by
    /// [`Dialog::calculate_hooks`]
    pub hooks: Hooks,

    /// Socket requests in this dialog leave from
    pub send_sock: Option<SocketInfo>,

    /// The dialog was established over TLS / with a sips URI
    pub secure: bool,

    state: DialogState,
    arena: SharedArena,
}

impl Dialog {
    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    /// The Call-ID plus both tags
    pub fn id(&self) -> (&[u8], &[u8], Option<&[u8]>) {
        (&self.call_id, &self.local_tag, self.remote_tag.as_deref())
    }

    /// Move a fresh dialog into the early state once a provisional reply
    /// has been seen
    pub fn enter_early(&mut self) -> Result<()> {
        match self.state {
            DialogState::New => {
                self.state = DialogState::Early;
                Ok(())
            }
            DialogState::Early => Ok(()),
            other => Err(TmError::ProtocolViolation(format!(
                "cannot enter early state from {other}"
            ))),
        }
    }

    /// Release the dialog and everything it owns
    pub fn destroy(self) {
        tracing::debug!(call_id = %self.call_id, state = %self.state, "dialog destroyed");
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.state == DialogState::Destroyed {
            return Err(TmError::ProtocolViolation(
                "dialog already destroyed".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Dialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(v: &Option<ShmStr>) -> String {
            v.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
        }

        writeln!(f, "dialog {{")?;
        writeln!(f, "  call_id:       {}", self.call_id)?;
        writeln!(f, "  local_tag:     {}", self.local_tag)?;
        writeln!(f, "  remote_tag:    {}", opt(&self.remote_tag))?;
        writeln!(f, "  local_seq:     {} (set: {})", self.local_seq.value, self.local_seq.is_set)?;
        writeln!(f, "  remote_seq:    {} (set: {})", self.remote_seq.value, self.remote_seq.is_set)?;
        writeln!(f, "  local_uri:     {}", self.local_uri)?;
        writeln!(f, "  remote_uri:    {}", self.remote_uri)?;
        writeln!(f, "  remote_target: {}", opt(&self.remote_target))?;
        writeln!(f, "  secure:        {}", self.secure)?;
        writeln!(f, "  state:         {}", self.state)?;
        for route in &self.route_set {
            writeln!(f, "  route:         {}", route.text)?;
        }
        writeln!(f, "  request_uri:   {}", opt(&self.hooks.request_uri))?;
        writeln!(f, "  next_hop:      {}", opt(&self.hooks.next_hop))?;
        writeln!(f, "  first_route:   {:?}", self.hooks.first_route)?;
        writeln!(f, "  last_route:    {}", opt(&self.hooks.last_route))?;
        write!(f, "}}")
    }
}
