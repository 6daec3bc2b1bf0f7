//! Transaction timers.
//!
//! Eight lists, each with a fixed timeout and its own lock:
//!
//! ```text
//!   retransmission   RT_T1_TO_1 ─▶ RT_T1_TO_2 ─▶ RT_T1_TO_3 ─▶ RT_T2 ─┐
//!                                                             ▲      │
//!                                                             └──────┘
//!   final response   FR (non-INVITE / no provisional yet), FR_INV
//!   teardown         WAIT ─▶ DELETE (re-queued while still referenced)
//! ```
//!
//! A retransmission buffer lives in exactly one list at a time. When it is due
//! the list hands it to the dispatcher, which resends it and queues it on the
//! next tier unless the branch was stopped in the meantime.

pub mod list;
pub mod types;
pub mod wheel;

pub use list::{TimerLink, TimerList};
pub use types::{RetrTier, TimerListId, TimerSettings};
pub use wheel::TimerWheel;
