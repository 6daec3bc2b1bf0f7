//! Transaction cells and the table they are matched in.
//!
//! A [`Cell`] is shared between the worker that created it, the workers that
//! process its replies and the timer lists. Immutable identity (hash index,
//! label, header copies) sits directly on the cell; everything that changes
//! while replies arrive is behind [`Cell::lock`].

pub mod cell;
pub mod hash;

pub use cell::{
    Activity, BranchPick, Cell, CellHeaders, CellId, CellRef, CellState, RetrBuf, RetrTimers, TimerPayload,
    UacBranch, UacOverrides, UasSide,
};
pub use hash::HashTable;
