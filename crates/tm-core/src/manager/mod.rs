//! Transaction manager: creates cells, forks requests, matches replies and
//! drives the timer lists.
//!
//! Locks are always taken in the order cell, then timer list. Bucket locks
//! of the hash table are never held while either of the others is taken.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sipr_sip_msg::{HeaderKind, SipMsg};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::arena::SharedArena;
use crate::builder::{MessageBuilder, cseq_number_prefix, reason_phrase, t_calc_branch, via_branch, via_builder};
use crate::config::TmConfig;
use crate::context::RequestContext;
use crate::dialog::Dialog;
use crate::error::{Result, TmError};
use crate::fork::ForkTable;
use crate::tags::{TagGenerator, md5_hex};
use crate::timer::{TimerListId, TimerWheel};
use crate::transaction::{
    Activity, BranchPick, Cell, CellHeaders, CellState, HashTable, RetrBuf, RetrTimers, TimerPayload, UacBranch,
};
use crate::transport::{Destination, Resolver, SocketInfo, Transport};

mod handlers;

/// What happened to a reply handed to [`TransactionManager::on_reply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// Pass the reply upstream
    Relay { branch: usize, code: u16 },
    /// The reply completed the transaction; it is now on WAIT
    Completed { branch: usize, code: u16 },
    /// Consumed here: a retransmission, a reply to our CANCEL, or a negative
    /// reply held back while other branches are pending
    Absorbed,
}

/// The transaction core
pub struct TransactionManager {
    config: TmConfig,
    arena: SharedArena,
    table: HashTable,
    wheel: TimerWheel<TimerPayload>,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn Resolver>,
    builder: MessageBuilder,
    tags: TagGenerator,
    sock: SocketInfo,
    running: AtomicBool,
}

impl TransactionManager {
    pub fn new(
        config: TmConfig,
        sock: SocketInfo,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self> {
        config.validate()?;
        let arena = SharedArena::new(config.shm_limit);
        let builder = MessageBuilder::from_config(&config, arena.clone());
        info!(
            hash_size = config.hash_size,
            max_branches = config.max_branches,
            local = %sock.hostport(),
            "transaction manager created"
        );
        Ok(TransactionManager {
            table: HashTable::new(config.hash_size),
            wheel: TimerWheel::new(config.timers.clone()),
            tags: TagGenerator::new(&config.tag_seed),
            builder,
            arena,
            transport,
            resolver,
            sock,
            config,
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &TmConfig {
        &self.config
    }

    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    pub fn table(&self) -> &HashTable {
        &self.table
    }

    pub fn wheel(&self) -> &TimerWheel<TimerPayload> {
        &self.wheel
    }

    pub fn builder(&self) -> &MessageBuilder {
        &self.builder
    }

    pub fn tags(&self) -> &TagGenerator {
        &self.tags
    }

    pub fn sock(&self) -> &SocketInfo {
        &self.sock
    }

    pub fn resolver(&self) -> &dyn Resolver {
        self.resolver.as_ref()
    }

    /// A fresh worker-local context sized by this manager's configuration
    pub fn new_context(&self) -> RequestContext {
        RequestContext::new(&self.config)
    }

    /// Create the server transaction for a received request.
    ///
    /// The request is copied into the shared arena; the cell keeps its
    /// From, To, Call-ID and CSeq lines for building ACK and CANCEL later.
    pub fn new_transaction(&self, request: &[u8], source: Destination) -> Result<Arc<Cell>> {
        let stored = self.arena.dup(request)?;
        let msg = SipMsg::scan(&stored)?;
        let (method, ruri) = match (msg.method(), msg.ruri()) {
            (Some(method), Some(ruri)) => (method, ruri),
            _ => {
                return Err(TmError::ProtocolViolation(
                    "transactions are created by requests".to_string(),
                ));
            }
        };
        let from = msg.from().ok_or(TmError::MissingHeader("From"))?;
        let to = msg.to().ok_or(TmError::MissingHeader("To"))?;
        let callid = msg.call_id().ok_or(TmError::MissingHeader("Call-ID"))?;
        let cseq = msg.header(HeaderKind::CSeq).ok_or(TmError::MissingHeader("CSeq"))?;
        let cseq_n = cseq_number_prefix(cseq)?;
        let cseq_view = sipr_sip_msg::CSeqView::parse(cseq.body)?;

        let hash_index = self.table.hash(callid.body, cseq_view.number_raw);
        let id = self.table.next_id(hash_index);
        let md5 = md5_hex(&[from.body, to.body, callid.body, cseq_view.number_raw, ruri]);

        let headers = CellHeaders {
            from: stored.slice_ref(from.raw),
            to: stored.slice_ref(to.raw),
            callid: stored.slice_ref(callid.raw),
            cseq_n: stored.slice_ref(cseq_n),
        };
        let cell = Arc::new(Cell::new(
            id,
            md5,
            stored.slice_ref(method),
            stored.slice_ref(ruri),
            headers,
            false,
        ));
        {
            let mut state = cell.lock();
            state.uas.request = Some(stored.clone());
            state.uas.source = Some(source);
        }
        self.table.insert(Arc::clone(&cell));
        debug!(cell = %id, method = %cell.method, "transaction created");
        Ok(cell)
    }

    /// Send the request of `cell` to every branch of `forks`.
    ///
    /// Returns the number of branches sent. A branch whose send fails is
    /// closed as if it had answered 503; only when every send fails is the
    /// transport error returned. An entry without a destination becomes a
    /// blind branch that only runs a final-response timer.
    pub fn forward(&self, cell: &Arc<Cell>, forks: &ForkTable) -> Result<usize> {
        if forks.is_empty() {
            return Err(TmError::NoDestination(cell.ruri.to_string()));
        }
        let now = Instant::now();
        let mut state = cell.lock();
        let request = state
            .uas
            .request
            .clone()
            .ok_or_else(|| TmError::ProtocolViolation("transaction has no request".to_string()))?;

        let mut sent = 0;
        let mut last_error = None;
        for (_, entry) in forks.iter() {
            let branch = state.uac.len();
            if branch >= self.config.max_branches {
                return Err(TmError::CapacityExceeded {
                    what: "transaction branches",
                    limit: self.config.max_branches,
                });
            }
            let uri = self.arena.dup(&entry.uri)?;
            let Some(dest) = entry.dest else {
                state.uac.push(UacBranch::new(uri, None, self.sock.clone()));
                self.start_fr(cell, &mut state.uac[branch].request_timers, TimerListId::Fr, branch, Activity::Request, now);
                continue;
            };

            let via = via_builder(&self.sock, &t_calc_branch(cell, branch, self.builder.syn_branch()));
            let buffer = self.builder.build_forward(&request, &uri, &via)?;
            let mut uac = UacBranch::new(uri, Some(dest), self.sock.clone());
            uac.request = Some(buffer.clone());
            state.uac.push(uac);

            match self.transport.send(&dest, &buffer) {
                Ok(()) => {
                    trace!(cell = %cell.id, branch, dest = %dest, "branch sent");
                    let retr = RetrBuf::new(buffer, dest, Activity::Request, branch);
                    self.start_retr(cell, &mut state.uac[branch].request_timers, retr, now);
                    sent += 1;
                }
                Err(err) => {
                    warn!(cell = %cell.id, branch, error = %err, "sending branch failed");
                    state.uac[branch].last_received = 503;
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if sent == 0 && state.uac.iter().all(|u| u.dest.is_some()) => Err(err.into()),
            _ => Ok(sent),
        }
    }

    /// Add a branch that is never sent; its final-response timer makes sure
    /// the transaction still completes
    pub fn add_blind_uac(&self, cell: &Arc<Cell>) -> Result<usize> {
        let mut state = cell.lock();
        let branch = state.uac.len();
        if branch >= self.config.max_branches {
            return Err(TmError::CapacityExceeded {
                what: "transaction branches",
                limit: self.config.max_branches,
            });
        }
        state.uac.push(UacBranch::new(cell.ruri.clone(), None, self.sock.clone()));
        self.start_fr(cell, &mut state.uac[branch].request_timers, TimerListId::Fr, branch, Activity::Request, Instant::now());
        debug!(cell = %cell.id, branch, "blind branch added");
        Ok(branch)
    }

    /// Match a reply to its branch and update timers and branch state
    pub fn on_reply(&self, reply: &[u8]) -> Result<ReplyDisposition> {
        let msg = SipMsg::scan(reply)?;
        let code = msg
            .status()
            .ok_or_else(|| TmError::ProtocolViolation("not a reply".to_string()))?;
        let via = msg.vias().next().ok_or(TmError::MissingHeader("Via"))?;
        let branch_param = via_branch(via.body).ok_or(TmError::MissingHeader("Via branch"))?;
        let (cell, branch) = self.table.match_branch(branch_param).ok_or_else(|| {
            TmError::TransactionNotFound(String::from_utf8_lossy(branch_param).into_owned())
        })?;
        let cell = cell.acquire();
        let cseq = msg.cseq().ok_or(TmError::MissingHeader("CSeq"))??;
        let now = Instant::now();

        let mut state = cell.lock();
        if branch >= state.uac.len() {
            return Err(TmError::TransactionNotFound(format!("{} branch {branch}", cell.id)));
        }

        // CANCEL shares the branch id of the request it cancels
        if cseq.method == b"CANCEL" && cell.method.as_bytes() != b"CANCEL" {
            let uac = &mut state.uac[branch];
            if code >= 200 {
                uac.cancel_timers.stop_all(&self.wheel);
            } else {
                uac.cancel_timers.stop_retr(&self.wheel);
            }
            trace!(cell = %cell.id, branch, code, "reply to local CANCEL");
            return Ok(ReplyDisposition::Absorbed);
        }

        if state.uac[branch].is_final() {
            if cell.is_invite && code >= 300 {
                self.send_branch_ack(&cell, &state, branch, &msg);
            }
            trace!(cell = %cell.id, branch, code, "final reply retransmission");
            return Ok(ReplyDisposition::Absorbed);
        }

        if code < 200 {
            if cell.is_invite && state.uas.status >= 200 {
                // answered meanwhile; the branch could not be cancelled before
                state.uac[branch].last_received = code;
                if let Err(err) = self.cancel_branch_locked(cell.cell(), &mut state, branch, None, now) {
                    warn!(cell = %cell.id, branch, error = %err, "late branch not cancelled");
                }
                return Ok(ReplyDisposition::Absorbed);
            }
            let uac = &mut state.uac[branch];
            uac.last_received = uac.last_received.max(code);
            if cell.is_invite {
                uac.request_timers.stop_retr(&self.wheel);
                uac.request_timers.stop_fr(&self.wheel);
                self.start_fr(cell.cell(), &mut uac.request_timers, TimerListId::FrInv, branch, Activity::Request, now);
            }
            debug!(cell = %cell.id, branch, code, "provisional reply");
            return Ok(ReplyDisposition::Relay { branch, code });
        }

        let uac = &mut state.uac[branch];
        uac.request_timers.stop_all(&self.wheel);
        uac.last_received = code;
        if cell.is_invite && code >= 300 {
            self.send_branch_ack(&cell, &state, branch, &msg);
        }
        debug!(cell = %cell.id, branch, code, "final reply");

        if state.uas.status >= 200 {
            // only INVITE 2xx still go upstream once the transaction is answered
            if state.all_final() {
                self.put_on_wait_locked(cell.cell(), &mut state, now);
            }
            return Ok(if cell.is_invite && code < 300 {
                ReplyDisposition::Relay { branch, code }
            } else {
                ReplyDisposition::Absorbed
            });
        }

        let (picked, picked_code) = if code < 300 || code >= 600 {
            (branch, code)
        } else {
            match state.pick_branch() {
                BranchPick::Best { branch, code } => (branch, code),
                BranchPick::Pending | BranchPick::Empty => return Ok(ReplyDisposition::Absorbed),
            }
        };
        state.uas.status = picked_code;
        if cell.is_invite && (code < 300 || code >= 600) {
            self.cancel_pending_locked(cell.cell(), &mut state, branch, now);
        }
        self.put_on_wait_locked(cell.cell(), &mut state, now);
        debug!(cell = %cell.id, branch = picked, code = picked_code, "transaction answered");
        Ok(ReplyDisposition::Completed { branch: picked, code: picked_code })
    }

    /// CANCEL every ringing branch but `except`; branches without a
    /// provisional reply are cancelled when one arrives
    fn cancel_pending_locked(&self, cell: &Arc<Cell>, state: &mut CellState, except: usize, now: Instant) {
        for branch in 0..state.uac.len() {
            if branch == except || !state.uac[branch].is_ringing() {
                continue;
            }
            if let Err(err) = self.cancel_branch_locked(cell, state, branch, None, now) {
                warn!(cell = %cell.id, branch, error = %err, "pending branch not cancelled");
            }
        }
    }

    /// Hop-by-hop ACK for a negative final reply to an INVITE branch
    fn send_branch_ack(&self, cell: &Cell, state: &CellState, branch: usize, reply: &SipMsg<'_>) {
        let Some(dest) = state.uac[branch].dest else {
            return;
        };
        let to = match reply.to() {
            Some(to) => to.raw,
            None => cell.headers.to.as_bytes(),
        };
        let result = self
            .builder
            .build_local(cell, state, branch, b"ACK", to)
            .and_then(|ack| self.transport.send(&dest, &ack).map_err(TmError::from));
        if let Err(err) = result {
            warn!(cell = %cell.id, branch, error = %err, "ACK for negative reply not sent");
        }
    }

    /// CANCEL a ringing branch of a proxied transaction
    pub fn cancel_branch(&self, cell: &Arc<Cell>, branch: usize) -> Result<()> {
        let mut state = cell.lock();
        self.cancel_branch_locked(cell, &mut state, branch, None, Instant::now())
    }

    /// CANCEL a ringing branch of a local transaction, with extra headers
    /// and an optional body
    pub fn cancel_uac(&self, cell: &Arc<Cell>, branch: usize, headers: &[u8], body: &[u8]) -> Result<()> {
        let mut state = cell.lock();
        self.cancel_branch_locked(cell, &mut state, branch, Some((headers, body)), Instant::now())
    }

    pub(crate) fn cancel_branch_locked(
        &self,
        cell: &Arc<Cell>,
        state: &mut CellState,
        branch: usize,
        extra: Option<(&[u8], &[u8])>,
        now: Instant,
    ) -> Result<()> {
        let uac = state
            .uac
            .get(branch)
            .ok_or_else(|| TmError::ProtocolViolation(format!("no branch {branch} on {}", cell.id)))?;
        if uac.is_final() || uac.local_cancel.is_some() {
            return Ok(());
        }
        if !uac.is_ringing() {
            return Err(TmError::ProtocolViolation(format!(
                "branch {branch} of {} has not received a provisional reply",
                cell.id
            )));
        }
        let dest = uac.dest.ok_or_else(|| TmError::NoDestination(uac.uri.to_string()))?;

        let cancel = match extra {
            Some((headers, body)) => self.builder.build_uac_cancel(headers, body, cell, state, branch)?,
            None => self.builder.build_local(cell, state, branch, b"CANCEL", &cell.headers.to)?,
        };
        self.transport.send(&dest, &cancel)?;

        let uac = &mut state.uac[branch];
        uac.local_cancel = Some(cancel.clone());
        let retr = RetrBuf::new(cancel, dest, Activity::LocalCancel, branch);
        self.start_retr(cell, &mut uac.cancel_timers, retr, now);
        debug!(cell = %cell.id, branch, "branch cancelled");
        Ok(())
    }

    /// Send a request within `dialog` as a new local transaction.
    ///
    /// The local CSeq is bumped for everything but ACK and CANCEL.
    pub fn request_within(
        &self,
        dialog: &mut Dialog,
        method: &[u8],
        headers: &[u8],
        body: &[u8],
    ) -> Result<Arc<Cell>> {
        let seq = dialog.next_local_seq(method)?;
        let seq_text = seq.to_string();
        let hash_index = self.table.hash(&dialog.call_id, seq_text.as_bytes());
        let id = self.table.next_id(hash_index);
        let md5 = md5_hex(&[dialog.call_id.as_bytes(), dialog.local_tag.as_bytes(), seq_text.as_bytes(), method]);
        let sock = dialog.send_sock.clone().unwrap_or_else(|| self.sock.clone());

        let request = self.builder.build_uac_req(method, headers, body, dialog, id, &md5, 0, &sock)?;
        let next_hop = dialog
            .hooks
            .next_hop
            .as_ref()
            .ok_or_else(|| TmError::NoDestination(dialog.call_id.to_string()))?;
        let dest = self
            .resolver
            .resolve(next_hop)
            .ok_or_else(|| TmError::NoDestination(next_hop.to_string()))?;

        let cell = Arc::new(Cell::new(
            id,
            md5,
            self.arena.dup(method)?,
            request.ruri.clone(),
            request.headers,
            true,
        ));
        let now = Instant::now();
        let mut state = cell.lock();
        let mut uac = UacBranch::new(request.ruri, Some(dest), sock);
        uac.request = Some(request.buffer.clone());
        state.uac.push(uac);

        if let Err(err) = self.transport.send(&dest, &request.buffer) {
            warn!(cell = %id, error = %err, "request within dialog not sent");
            return Err(err.into());
        }
        if method == b"ACK" {
            state.uac[0].last_received = 200;
            drop(state);
            return Ok(cell);
        }

        self.table.insert(Arc::clone(&cell));
        let retr = RetrBuf::new(request.buffer, dest, Activity::Request, 0);
        self.start_retr(&cell, &mut state.uac[0].request_timers, retr, now);
        drop(state);
        debug!(cell = %id, method = %String::from_utf8_lossy(method), "request within dialog sent");
        Ok(cell)
    }

    /// Build and send the ACK for a final reply to a local INVITE
    pub fn send_dlg_ack(&self, reply: &[u8], cell: &Arc<Cell>, branch: usize) -> Result<()> {
        let msg = SipMsg::scan(reply)?;
        let to = msg.to().ok_or(TmError::MissingHeader("To"))?.raw;
        let ack = {
            let state = cell.lock();
            self.builder.build_dlg_ack(&msg, cell, &state, branch, to)?
        };
        let dest = self
            .resolver
            .resolve(&ack.next_hop)
            .ok_or_else(|| TmError::NoDestination(ack.next_hop.to_string()))?;
        self.transport.send(&dest, &ack.buffer)?;
        debug!(cell = %cell.id, branch, dest = %dest, "dialog ACK sent");
        Ok(())
    }

    /// Answer the request of `cell` with a locally generated final reply
    pub fn reply_local(&self, cell: &Arc<Cell>, code: u16, reason: Option<&str>) -> Result<()> {
        let mut state = cell.lock();
        self.reply_local_locked(cell, &mut state, code, reason, Instant::now())
    }

    pub(crate) fn reply_local_locked(
        &self,
        cell: &Arc<Cell>,
        state: &mut CellState,
        code: u16,
        reason: Option<&str>,
        now: Instant,
    ) -> Result<()> {
        if state.uas.status >= 200 {
            return Err(TmError::ProtocolViolation(format!(
                "{} already answered with {}",
                cell.id, state.uas.status
            )));
        }
        let dest = state
            .uas
            .source
            .ok_or_else(|| TmError::NoDestination(format!("source of {}", cell.id)))?;
        let to_tag = match &state.uas.to_tag {
            Some(tag) => tag.clone(),
            None => {
                let tag = self.tags.local_tag(&[cell.headers.callid.as_bytes(), cell.headers.cseq_n.as_bytes()]);
                state.uas.to_tag = Some(tag.clone());
                tag
            }
        };
        let reason = reason.unwrap_or_else(|| reason_phrase(code));
        let response = self.builder.build_local_reply(state, code, reason, &to_tag)?;

        state.uas.status = code;
        state.uas.response = Some(response.clone());
        if let Err(err) = self.transport.send(&dest, &response) {
            warn!(cell = %cell.id, code, error = %err, "local reply not sent");
        }
        debug!(cell = %cell.id, code, "local reply");

        if cell.is_invite && code >= 300 {
            // wait for the ACK
            let retr = RetrBuf::new(response, dest, Activity::Reply, 0);
            self.start_retr(cell, &mut state.uas.reply_timers, retr, now);
        } else {
            self.put_on_wait_locked(cell, state, now);
        }
        Ok(())
    }

    /// Resend the final reply of `cell`, e.g. on a request retransmission
    pub fn retransmit_reply(&self, cell: &Cell) -> Result<()> {
        let (response, dest) = {
            let state = cell.lock();
            match (&state.uas.response, state.uas.source) {
                (Some(response), Some(dest)) => (response.clone(), dest),
                _ => {
                    return Err(TmError::ProtocolViolation(format!(
                        "{} has no reply to retransmit",
                        cell.id
                    )));
                }
            }
        };
        self.transport.send(&dest, &response)?;
        trace!(cell = %cell.id, "reply retransmitted");
        Ok(())
    }

    /// The ACK for our negative INVITE reply arrived
    pub fn ack_received(&self, cell: &Arc<Cell>) {
        let mut state = cell.lock();
        state.uas.reply_timers.stop_all(&self.wheel);
        self.put_on_wait_locked(cell, &mut state, Instant::now());
    }

    /// Start the wait period after which the cell is removed
    pub fn put_on_wait(&self, cell: &Arc<Cell>) {
        let mut state = cell.lock();
        self.put_on_wait_locked(cell, &mut state, Instant::now());
    }

    pub(crate) fn put_on_wait_locked(&self, cell: &Arc<Cell>, state: &mut CellState, now: Instant) {
        if state.on_wait {
            return;
        }
        state.on_wait = true;
        state.wait_link = Some(self.wheel.schedule(TimerListId::Wait, TimerPayload::Wait(Arc::clone(cell)), now));
        trace!(cell = %cell.id, "put on wait");
    }

    fn start_fr(
        &self,
        cell: &Arc<Cell>,
        timers: &mut RetrTimers,
        list: TimerListId,
        branch: usize,
        activity: Activity,
        now: Instant,
    ) {
        timers.fr_gen = timers.fr_gen.wrapping_add(1);
        let payload = TimerPayload::FinalResponse { cell: Arc::clone(cell), branch, activity, generation: timers.fr_gen };
        timers.fr = Some(self.wheel.schedule(list, payload, now));
    }

    /// Arm retransmission (unreliable transports only) and the
    /// final-response timer for a buffer just sent
    fn start_retr(&self, cell: &Arc<Cell>, timers: &mut RetrTimers, retr: RetrBuf, now: Instant) {
        let (branch, activity) = (retr.branch, retr.activity);
        if !retr.dest.proto.is_reliable() {
            let list = retr.tier.list();
            let payload = TimerPayload::Retransmit { cell: Arc::clone(cell), retr };
            timers.retr = Some(self.wheel.schedule(list, payload, now));
        }
        self.start_fr(cell, timers, TimerListId::Fr, branch, activity, now);
    }

    /// Fire everything due at `now`; returns the number of timers handled
    pub fn run_timers(&self, now: Instant) -> usize {
        let due = self.wheel.expire(now);
        let count = due.len();
        for (list, payload) in due {
            trace!(list = %list, cell = %payload.cell().id, "timer fired");
            self.fire(payload, now);
        }
        count
    }

    /// Run the handler for one payload taken off a timer list
    pub fn fire(&self, payload: TimerPayload, now: Instant) {
        match payload {
            TimerPayload::Retransmit { cell, retr } => self.retransmission_handler(cell, retr, now),
            TimerPayload::FinalResponse { cell, branch, activity, generation } => {
                self.final_response_handler(cell, branch, activity, generation, now)
            }
            TimerPayload::Wait(cell) => self.wait_handler(cell, now),
            TimerPayload::Delete(cell) => self.delete_handler(cell, now),
        }
    }

    /// Run [`TransactionManager::run_timers`] every tick until
    /// [`TransactionManager::shutdown`] is called
    pub fn spawn_timer_task(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let tick = self.config.timers.tick;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            debug!(?tick, "timer task started");
            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;
                self.run_timers(Instant::now());
            }
            debug!("timer task stopped");
        })
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("sock", &self.sock)
            .field("transactions", &self.table.len())
            .field("shm_used", &self.arena.used())
            .finish()
    }
}
