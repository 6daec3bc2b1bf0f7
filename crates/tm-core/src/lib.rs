//! # sipr-tm-core
//!
//! Stateful SIP transaction and dialog core for a proxy / UA.
//!
//! The crate covers:
//!
//! - the per-request branch set and fork table ([`dset`], [`fork`])
//! - transaction cells and their hash table ([`transaction`])
//! - retransmission, final-response, wait and delete timers ([`timer`],
//!   driven by [`TransactionManager::run_timers`])
//! - UAC and UAS dialogs with RFC 3261 route-set handling ([`dialog`])
//! - wire serialization of locally generated requests and replies
//!   ([`builder`])
//!
//! Messages come in as [`sipr_sip_msg::SipMsg`] views and leave as byte
//! buffers through a [`Transport`]. Anything that outlives the processing of
//! one message is copied into a byte-budgeted [`SharedArena`].
//!
//! ## Example
//!
//! ```
//! use sipr_tm_core::arena::SharedArena;
//! use sipr_tm_core::dialog::{DialogState, new_dlg_uac};
//!
//! let arena = SharedArena::new(4096);
//! let dialog = new_dlg_uac(
//!     b"a84b4c76e66710@pc33.example.com",
//!     b"1928301774",
//!     314159,
//!     b"sip:alice@example.com",
//!     b"sip:bob@example.com",
//!     &arena,
//! )
//! .unwrap();
//!
//! assert_eq!(dialog.state(), DialogState::New);
//! assert_eq!(dialog.hooks.request_uri.as_ref().unwrap(), b"sip:bob@example.com");
//! dialog.destroy();
//! assert_eq!(arena.used(), 0);
//! ```

pub mod arena;
pub mod builder;
pub mod config;
pub mod context;
pub mod dialog;
pub mod dset;
pub mod error;
pub mod fork;
pub mod manager;
pub mod tags;
pub mod timer;
pub mod transaction;
pub mod transport;

pub use arena::{ScratchArena, SharedArena, ShmBuf, ShmStr};
pub use builder::MessageBuilder;
pub use config::{FrTimeoutPolicy, TmConfig};
pub use context::RequestContext;
pub use dialog::{Dialog, DialogState, DlgUpdate};
pub use dset::{BranchSet, RequestTarget};
pub use error::{Result, TmError};
pub use fork::{ForkEntry, ForkTable};
pub use manager::{ReplyDisposition, TransactionManager};
pub use timer::{RetrTier, TimerListId, TimerSettings, TimerWheel};
pub use transaction::{Cell, CellId, HashTable};
pub use transport::{Destination, LiteralResolver, Proto, Resolver, SocketInfo, Transport, TransportError};
