use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::arena::ShmStr;
use crate::timer::{RetrTier, TimerLink, TimerWheel};
use crate::transport::{Destination, SocketInfo};

/// Position of a transaction in the hash table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    pub hash_index: u32,
    pub label: u32,
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash_index, self.label)
    }
}

/// What a retransmission buffer carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// A request sent downstream on a branch
    Request,
    /// A CANCEL generated for a branch
    LocalCancel,
    /// A final reply sent upstream
    Reply,
}

/// A buffer queued for retransmission; owned by the timer list holding it
#[derive(Debug, Clone)]
pub struct RetrBuf {
    pub buffer: ShmStr,
    pub dest: Destination,
    pub activity: Activity,
    pub branch: usize,
    pub tier: RetrTier,
}

impl RetrBuf {
    /// A buffer starting at the first retransmission tier
    pub fn new(buffer: ShmStr, dest: Destination, activity: Activity, branch: usize) -> Self {
        RetrBuf { buffer, dest, activity, branch, tier: RetrTier::T1To1 }
    }
}

/// Everything the timer lists hold
pub enum TimerPayload {
    Retransmit { cell: Arc<Cell>, retr: RetrBuf },
    /// `generation` must still match [`RetrTimers::fr_gen`] when it fires
    FinalResponse { cell: Arc<Cell>, branch: usize, activity: Activity, generation: u32 },
    Wait(Arc<Cell>),
    Delete(Arc<Cell>),
}

impl TimerPayload {
    pub fn cell(&self) -> &Arc<Cell> {
        match self {
            TimerPayload::Retransmit { cell, .. }
            | TimerPayload::FinalResponse { cell, .. }
            | TimerPayload::Wait(cell)
            | TimerPayload::Delete(cell) => cell,
        }
    }
}

/// Retransmission and final-response timers of one buffer
#[derive(Debug, Default)]
pub struct RetrTimers {
    pub retr: Option<TimerLink>,
    pub fr: Option<TimerLink>,
    /// Bumped on every arm and stop of `fr`; a payload carrying an older
    /// value was dequeued before it was replaced
    pub fr_gen: u32,
    /// Set once retransmission must not be re-armed
    pub stopped: bool,
}

impl RetrTimers {
    /// Stop retransmitting; the final-response timer keeps running
    pub fn stop_retr(&mut self, wheel: &TimerWheel<TimerPayload>) {
        self.stopped = true;
        if let Some(link) = self.retr.take() {
            wheel.stop(link);
        }
    }

    pub fn stop_fr(&mut self, wheel: &TimerWheel<TimerPayload>) {
        self.fr_gen = self.fr_gen.wrapping_add(1);
        if let Some(link) = self.fr.take() {
            wheel.stop(link);
        }
    }

    pub fn stop_all(&mut self, wheel: &TimerWheel<TimerPayload>) {
        self.stop_retr(wheel);
        self.stop_fr(wheel);
    }
}

/// Client side of one fork branch
#[derive(Debug)]
pub struct UacBranch {
    pub uri: ShmStr,
    /// `None` for a branch that is never sent
    pub dest: Option<Destination>,
    pub send_sock: SocketInfo,
    /// The request as sent
    pub request: Option<ShmStr>,
    /// Highest status received so far, 0 for none
    pub last_received: u16,
    pub request_timers: RetrTimers,
    pub local_cancel: Option<ShmStr>,
    pub cancel_timers: RetrTimers,
}

impl UacBranch {
    pub fn new(uri: ShmStr, dest: Option<Destination>, send_sock: SocketInfo) -> Self {
        UacBranch {
            uri,
            dest,
            send_sock,
            request: None,
            last_received: 0,
            request_timers: RetrTimers::default(),
            local_cancel: None,
            cancel_timers: RetrTimers::default(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.last_received >= 200
    }

    /// A provisional reply arrived and no final one yet
    pub fn is_ringing(&self) -> bool {
        (100..200).contains(&self.last_received)
    }
}

/// Server side: the request that created the transaction and our reply to it
#[derive(Debug, Default)]
pub struct UasSide {
    pub request: Option<ShmStr>,
    pub source: Option<Destination>,
    pub status: u16,
    pub response: Option<ShmStr>,
    pub reply_timers: RetrTimers,
    pub to_tag: Option<String>,
}

/// Re-read From/To/CSeq from the branch's sent request instead of the
/// transaction copies when building ACK/CANCEL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UacOverrides {
    pub from: bool,
    pub to: bool,
    pub cseq: bool,
}

/// Mutable transaction state; the lock doubles as the reply-processing lock
#[derive(Debug, Default)]
pub struct CellState {
    pub uas: UasSide,
    pub uac: Vec<UacBranch>,
    pub on_wait: bool,
    pub wait_link: Option<TimerLink>,
    pub overrides: UacOverrides,
    /// A failure route is armed, so a timed-out branch may still be re-forked
    pub on_failure: bool,
}

impl CellState {
    /// No branch is still waiting for a final reply
    pub fn all_final(&self) -> bool {
        self.uac.iter().all(UacBranch::is_final)
    }

    /// Branch whose final reply answers the transaction.
    ///
    /// Branches never sent are skipped. A 487 wins once the transaction
    /// was cancelled, 503 ranks below everything else and otherwise the
    /// lowest code wins, ties going to the first branch.
    pub fn pick_branch(&self) -> BranchPick {
        let cancelled = self.uac.iter().any(|uac| uac.local_cancel.is_some());
        let mut best: Option<(usize, u16)> = None;
        for (branch, uac) in self.uac.iter().enumerate() {
            if uac.request.is_none() {
                continue;
            }
            let code = uac.last_received;
            if code < 200 {
                return BranchPick::Pending;
            }
            let better = match best {
                None => true,
                Some((_, lowest)) if cancelled && lowest == 487 => false,
                Some(_) if cancelled && code == 487 => true,
                Some((_, lowest)) => lowest == 503 || (code != 503 && code < lowest),
            };
            if better {
                best = Some((branch, code));
            }
        }
        match best {
            Some((branch, code)) => BranchPick::Best { branch, code },
            None => BranchPick::Empty,
        }
    }
}

/// Outcome of [`CellState::pick_branch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchPick {
    /// A sent branch still waits for its final reply
    Pending,
    Best { branch: usize, code: u16 },
    /// Only blind branches
    Empty,
}

/// Header copies kept for building ACK and CANCEL
#[derive(Debug, Clone)]
pub struct CellHeaders {
    /// `From: ...\r\n`
    pub from: ShmStr,
    /// `To: ...\r\n`
    pub to: ShmStr,
    /// `Call-ID: ...\r\n`
    pub callid: ShmStr,
    /// `CSeq: <number>`, without method or CRLF
    pub cseq_n: ShmStr,
}

/// One transaction
pub struct Cell {
    pub id: CellId,
    pub md5: String,
    pub method: ShmStr,
    pub ruri: ShmStr,
    pub headers: CellHeaders,
    pub is_invite: bool,
    /// Created by this node rather than by a received request
    pub is_local: bool,
    state: Mutex<CellState>,
    refs: AtomicUsize,
    freed: AtomicBool,
}

impl Cell {
    pub fn new(
        id: CellId,
        md5: String,
        method: ShmStr,
        ruri: ShmStr,
        headers: CellHeaders,
        is_local: bool,
    ) -> Self {
        let is_invite = method.as_bytes() == b"INVITE";
        Cell {
            id,
            md5,
            method,
            ruri,
            headers,
            is_invite,
            is_local,
            state: Mutex::new(CellState::default()),
            refs: AtomicUsize::new(0),
            freed: AtomicBool::new(false),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock()
    }

    /// Mark the cell as in use by a worker; the delete timer waits for it
    pub fn acquire(self: &Arc<Self>) -> CellRef {
        self.refs.fetch_add(1, Ordering::AcqRel);
        CellRef { cell: Arc::clone(self) }
    }

    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    pub fn is_freed(&self) -> bool {
        self.freed.load(Ordering::Acquire)
    }

    /// Release the buffers of the transaction. Only the first call does
    /// anything and returns `true`.
    pub fn free(&self) -> bool {
        if self.freed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut state = self.state.lock();
        state.uac.clear();
        state.uas = UasSide::default();
        trace!(cell = %self.id, "cell freed");
        true
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("ruri", &self.ruri)
            .field("is_local", &self.is_local)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// In-flight reference to a cell, released on drop
#[derive(Debug)]
pub struct CellRef {
    cell: Arc<Cell>,
}

impl CellRef {
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }
}

impl std::ops::Deref for CellRef {
    type Target = Cell;

    fn deref(&self) -> &Cell {
        &self.cell
    }
}

impl Drop for CellRef {
    fn drop(&mut self) {
        self.cell.refs.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::SharedArena;

    fn cell() -> Arc<Cell> {
        let arena = SharedArena::unbounded();
        let dup = |s: &[u8]| arena.dup(s).unwrap();
        Arc::new(Cell::new(
            CellId { hash_index: 1, label: 1 },
            String::new(),
            dup(b"INVITE"),
            dup(b"sip:bob@b.example"),
            CellHeaders {
                from: dup(b"From: <sip:a@a.example>;tag=1\r\n"),
                to: dup(b"To: <sip:bob@b.example>\r\n"),
                callid: dup(b"Call-ID: c1\r\n"),
                cseq_n: dup(b"CSeq: 1"),
            },
            false,
        ))
    }

    #[test]
    fn test_refs_follow_guards() {
        let c = cell();
        assert!(c.is_invite);
        let a = c.acquire();
        let b = c.acquire();
        assert_eq!(c.ref_count(), 2);
        drop(a);
        assert_eq!(c.ref_count(), 1);
        drop(b);
        assert_eq!(c.ref_count(), 0);
    }

    #[test]
    fn test_free_once() {
        let c = cell();
        assert!(c.free());
        assert!(!c.free());
        assert!(c.is_freed());
    }

    fn state(codes: &[(bool, u16)]) -> CellState {
        let arena = SharedArena::unbounded();
        let sock = SocketInfo::new("127.0.0.1:5060".parse().unwrap(), crate::transport::Proto::Udp);
        let mut state = CellState::default();
        for &(sent, code) in codes {
            let mut uac = UacBranch::new(arena.dup(b"sip:b@b.example").unwrap(), None, sock.clone());
            if sent {
                uac.request = Some(arena.dup(b"INVITE").unwrap());
            }
            uac.last_received = code;
            state.uac.push(uac);
        }
        state
    }

    #[test]
    fn test_pick_lowest_final() {
        let picked = state(&[(true, 486), (true, 404), (true, 404)]).pick_branch();
        assert_eq!(picked, BranchPick::Best { branch: 1, code: 404 });
        assert_eq!(state(&[(true, 486), (true, 180)]).pick_branch(), BranchPick::Pending);
    }

    #[test]
    fn test_pick_ranks_503_last() {
        let picked = state(&[(true, 503), (true, 600)]).pick_branch();
        assert_eq!(picked, BranchPick::Best { branch: 1, code: 600 });
        assert_eq!(state(&[(true, 503)]).pick_branch(), BranchPick::Best { branch: 0, code: 503 });
    }

    #[test]
    fn test_pick_skips_blind_branches() {
        let picked = state(&[(false, 0), (true, 408)]).pick_branch();
        assert_eq!(picked, BranchPick::Best { branch: 1, code: 408 });
        assert_eq!(state(&[(false, 408)]).pick_branch(), BranchPick::Empty);
    }

    #[test]
    fn test_pick_prefers_487_once_cancelled() {
        let mut s = state(&[(true, 404), (true, 487)]);
        assert_eq!(s.pick_branch(), BranchPick::Best { branch: 0, code: 404 });
        s.uac[1].local_cancel = Some(SharedArena::unbounded().dup(b"CANCEL").unwrap());
        assert_eq!(s.pick_branch(), BranchPick::Best { branch: 1, code: 487 });
    }
}
