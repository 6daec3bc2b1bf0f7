//! What the timer lists do when a payload comes due.
//!
//! Every handler owns its payload: the list lock was released by
//! [`TimerWheel::expire`](crate::timer::TimerWheel::expire) before dispatch.
//! Handlers log send failures and never panic on a vanished peer.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use super::TransactionManager;
use crate::config::FrTimeoutPolicy;
use crate::timer::TimerListId;
use crate::transaction::{Activity, BranchPick, Cell, CellState, RetrBuf, RetrTimers, TimerPayload};

fn timers_for(state: &mut CellState, activity: Activity, branch: usize) -> Option<&mut RetrTimers> {
    match activity {
        Activity::Request => state.uac.get_mut(branch).map(|u| &mut u.request_timers),
        Activity::LocalCancel => state.uac.get_mut(branch).map(|u| &mut u.cancel_timers),
        Activity::Reply => Some(&mut state.uas.reply_timers),
    }
}

impl TransactionManager {
    /// Resend the buffer and queue it on the next tier
    pub(crate) fn retransmission_handler(&self, cell: Arc<Cell>, mut retr: RetrBuf, now: Instant) {
        if cell.is_freed() {
            return;
        }
        let mut state = cell.lock();
        let Some(timers) = timers_for(&mut state, retr.activity, retr.branch) else {
            return;
        };
        timers.retr = None;
        if timers.stopped {
            trace!(cell = %cell.id, branch = retr.branch, "retransmission stopped meanwhile");
            return;
        }

        if let Err(err) = self.transport.send(&retr.dest, &retr.buffer) {
            warn!(
                cell = %cell.id,
                branch = retr.branch,
                activity = ?retr.activity,
                error = %err,
                "retransmission failed"
            );
        }

        retr.tier = retr.tier.next();
        let list = retr.tier.list();
        trace!(cell = %cell.id, branch = retr.branch, list = %list, "retransmitted");
        let payload = TimerPayload::Retransmit { cell: Arc::clone(&cell), retr };
        timers.retr = Some(self.wheel.schedule(list, payload, now));
    }

    /// No final reply arrived in time
    pub(crate) fn final_response_handler(
        &self,
        cell: Arc<Cell>,
        branch: usize,
        activity: Activity,
        generation: u32,
        now: Instant,
    ) {
        if cell.is_freed() {
            return;
        }
        let mut state = cell.lock();
        let Some(timers) = timers_for(&mut state, activity, branch) else {
            return;
        };
        if timers.fr.is_none() || timers.fr_gen != generation {
            trace!(cell = %cell.id, branch, activity = ?activity, "final-response timer replaced meanwhile");
            return;
        }
        timers.fr = None;

        match activity {
            Activity::LocalCancel => {
                if let Some(uac) = state.uac.get_mut(branch) {
                    uac.cancel_timers.stop_retr(&self.wheel);
                }
                debug!(cell = %cell.id, branch, "no final reply to local CANCEL");
            }
            Activity::Reply => {
                state.uas.reply_timers.stop_retr(&self.wheel);
                debug!(cell = %cell.id, "no ACK for local reply");
                self.put_on_wait_locked(&cell, &mut state, now);
            }
            Activity::Request => self.request_timeout(&cell, &mut state, branch, now),
        }
    }

    fn request_timeout(&self, cell: &Arc<Cell>, state: &mut CellState, branch: usize, now: Instant) {
        let Some(uac) = state.uac.get(branch) else {
            return;
        };
        if uac.is_final() {
            return;
        }

        let silent = self.config.fr_policy == FrTimeoutPolicy::SilentWhenSafe
            && !cell.is_local
            && cell.is_invite
            && state.uac.len() == 1
            && !state.on_failure
            && uac.last_received > 0;
        if silent {
            state.uac[branch].request_timers.stop_retr(&self.wheel);
            debug!(cell = %cell.id, branch, "final response timeout, no 408 sent");
            self.put_on_wait_locked(cell, state, now);
            return;
        }

        let cancel = cell.is_invite && uac.is_ringing() && uac.dest.is_some();
        state.uac[branch].request_timers.stop_retr(&self.wheel);
        if cancel {
            if let Err(err) = self.cancel_branch_locked(cell, state, branch, None, now) {
                warn!(cell = %cell.id, branch, error = %err, "cancelling timed out branch failed");
            }
        }
        state.uac[branch].last_received = 408;
        debug!(cell = %cell.id, branch, "branch timed out");

        if state.uas.status >= 200 {
            // answered through another branch
            if state.all_final() {
                self.put_on_wait_locked(cell, state, now);
            }
            return;
        }
        let code = match state.pick_branch() {
            BranchPick::Pending => return,
            BranchPick::Best { code, .. } => code,
            BranchPick::Empty => 408,
        };
        if cell.is_local {
            self.put_on_wait_locked(cell, state, now);
        } else if let Err(err) = self.reply_local_locked(cell, state, code, None, now) {
            error!(cell = %cell.id, code, error = %err, "local reply to timed out transaction not sent");
            self.put_on_wait_locked(cell, state, now);
        }
    }

    /// Take the cell out of the hash table and stop everything it still
    /// runs; it is freed after the delete grace period
    pub(crate) fn wait_handler(&self, cell: Arc<Cell>, now: Instant) {
        self.table.remove(&cell);
        {
            let mut state = cell.lock();
            state.wait_link = None;
            for uac in &mut state.uac {
                uac.request_timers.stop_all(&self.wheel);
                uac.cancel_timers.stop_all(&self.wheel);
            }
            state.uas.reply_timers.stop_all(&self.wheel);
        }
        trace!(cell = %cell.id, "wait period over");
        self.wheel.schedule(TimerListId::Delete, TimerPayload::Delete(cell), now);
    }

    /// Free the cell once nobody is working on it any more
    pub(crate) fn delete_handler(&self, cell: Arc<Cell>, now: Instant) {
        let refs = cell.ref_count();
        if refs > 0 {
            trace!(cell = %cell.id, refs, "cell still referenced, delete postponed");
            self.wheel.schedule(TimerListId::Delete, TimerPayload::Delete(cell), now);
            return;
        }
        if cell.free() {
            debug!(cell = %cell.id, "transaction deleted");
        }
    }
}
