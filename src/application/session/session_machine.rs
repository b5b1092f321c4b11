use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;

use log::{debug, error, warn};

use super::bridge::{NotificationBridge, Outbox};
use super::config::SessionConfig;
use super::session_types::{PhaseEvent, SessionFlags, SessionPhase};
use crate::adapters::secure_channel::{TxMessage, TxmtrChannel};
use crate::core::dispatch::{DispatchError, ExecutionMode, GateTicket, TopologyGate, WorkQueue};
use crate::core::wire::CommandId;
use crate::domain::message::{MessageBuf, MessageId, message_name};
use crate::ports::client::ClientNotification;
use crate::ports::secure_channel::{SecureChannel, SecureChannelError};

/// Protocol data of the current authentication attempt.
///
/// Invariant: `context_handle.is_some() == flags.tx_initialized`.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) flags: SessionFlags,
    pub(crate) phase: SessionPhase,
    pub(crate) context_handle: Option<u32>,
    /// Last message prepared for the sink.
    pub(crate) pending_outbound: Option<MessageBuf>,
    /// ID byte of `pending_outbound` when the client confirmed the send.
    pub(crate) last_message_sent: Option<u8>,
    /// Sink message most recently handed to the trusted application.
    pub(crate) last_message_received: Option<MessageBuf>,
    /// Deadline from the trusted application for the current message.
    pub(crate) timeout_ms: u32,
    /// Deadline reported by the client with the latest wakeup.
    pub(crate) timeout_left_ms: u32,
    pub(crate) repeater: bool,
    pub(crate) no_stored_km: bool,
    pub(crate) update_stream: bool,
}

impl SessionState {
    pub(crate) fn advance(&mut self, ev: PhaseEvent) {
        match self.phase.next(ev) {
            Some(p) => self.phase = p,
            None => warn!("phase {} ignores {ev:?}", self.phase),
        }
    }

    /// Clear protocol fields for a new attempt.
    ///
    /// Resource flags and the context handle are kept; the start step
    /// releases whatever a previous attempt left behind.
    pub(crate) fn reset_protocol(&mut self) {
        self.no_stored_km = false;
        self.last_message_received = None;
        self.repeater = false;
        self.update_stream = false;
        self.last_message_sent = None;
        self.pending_outbound = None;
        self.timeout_ms = 0;
        self.timeout_left_ms = 0;
        self.flags.authenticated = false;
        self.flags.error = false;
        self.advance(PhaseEvent::Reset);
    }

    fn store_outbound(&mut self, tx: &TxMessage) {
        self.pending_outbound = Some(tx.message.clone());
        self.timeout_ms = tx.timeout_ms;
    }
}

/// Point-in-time view of a session for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub active: bool,
    pub flags: SessionFlags,
    pub phase: SessionPhase,
    pub context_handle: Option<u32>,
    pub last_message_sent: Option<u8>,
    pub last_message_received: Option<u8>,
    pub timeout_ms: u32,
    pub repeater: bool,
    pub no_stored_km: bool,
    pub update_stream: bool,
    pub execution_mode: ExecutionMode,
}

/// Protocol steps scheduled from `wakeup`.
///
/// A received message travels with its step, so queued receives are
/// processed in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Start,
    MessageSent,
    MessageReceived(MessageBuf),
    Timeout,
    QueryStreamType,
    Teardown,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::MessageSent => "message sent",
            Step::MessageReceived(_) => "message received",
            Step::Timeout => "timeout",
            Step::QueryStreamType => "query stream type",
            Step::Teardown => "teardown",
        }
    }
}

/// Session internals shared between the public handle and queued work.
///
/// Lock order: `wakeup_lock`, `channel`, `state`. `channel` is held for a
/// whole step and is what keeps secure-channel commands strictly sequential.
/// Worker jobs never take `wakeup_lock`.
pub(crate) struct Shared<T: SecureChannel> {
    pub(crate) config: SessionConfig,
    pub(crate) active: AtomicBool,
    pub(crate) feature_supported: AtomicBool,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) channel: Mutex<TxmtrChannel<T>>,
    pub(crate) mode: Mutex<ExecutionMode>,
    pub(crate) wakeup_lock: Mutex<()>,
    pub(crate) gate: TopologyGate,
    pub(crate) queue: WorkQueue,
    pub(crate) bridge: NotificationBridge,
}

impl<T: SecureChannel + 'static> Shared<T> {
    pub(crate) fn new(
        transport: T,
        bridge: NotificationBridge,
        config: SessionConfig,
    ) -> Result<Self, DispatchError> {
        let queue = WorkQueue::spawn(&config.worker_name)?;
        let channel = TxmtrChannel::new(transport, config.app_name.clone(), config.shared_buffer_size);
        Ok(Self {
            active: AtomicBool::new(false),
            feature_supported: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
            channel: Mutex::new(channel),
            mode: Mutex::new(config.execution_mode),
            wakeup_lock: Mutex::new(()),
            gate: TopologyGate::new(),
            queue,
            bridge,
            config,
        })
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn channel(&self) -> MutexGuard<'_, TxmtrChannel<T>> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn mode(&self) -> MutexGuard<'_, ExecutionMode> {
        self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wakeup_guard(&self) -> MutexGuard<'_, ()> {
        self.wakeup_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let execution_mode = *self.mode();
        let st = self.state();
        SessionSnapshot {
            active: self.is_active(),
            flags: st.flags,
            phase: st.phase,
            context_handle: st.context_handle,
            last_message_sent: st.last_message_sent,
            last_message_received: st.last_message_received.as_ref().map(MessageBuf::id_byte),
            timeout_ms: st.timeout_ms,
            repeater: st.repeater,
            no_stored_km: st.no_stored_km,
            update_stream: st.update_stream,
            execution_mode,
        }
    }

    /// Queue `step` on the worker.
    pub(crate) fn enqueue(self: &Arc<Self>, step: Step) -> Result<(), DispatchError> {
        let me = Arc::clone(self);
        self.queue.enqueue(Box::new(move || me.run(step)))
    }

    /// Run `step` on the current thread and deliver what it produced.
    pub(crate) fn run(self: &Arc<Self>, step: Step) {
        let out = self.execute(step);
        self.bridge.deliver(out, &self.active);
    }

    /// Run `step` under the step lock. The notifications it produced are
    /// returned undelivered.
    pub(crate) fn execute(self: &Arc<Self>, step: Step) -> Outbox {
        let mut out = Outbox::new();
        let mut chan = self.channel();
        match step {
            Step::Start => self.start(&mut chan, &mut out),
            Step::MessageSent => self.message_sent(&mut chan, &mut out),
            Step::MessageReceived(msg) => self.message_received(&mut chan, &mut out, msg),
            Step::Timeout => self.timeout_elapsed(&mut chan, &mut out),
            Step::QueryStreamType => {
                if self.guard(Step::QueryStreamType.name()) {
                    self.query_stream_type(&mut chan, &mut out);
                }
            }
            Step::Teardown => self.teardown(&mut chan, &mut out),
        }
        out
    }

    /// Whether a step or a direct command currently holds the step lock.
    pub(crate) fn step_in_progress(&self) -> bool {
        matches!(self.channel.try_lock(), Err(TryLockError::WouldBlock))
    }

    /// Steps other than start and teardown need a live session with the
    /// application loaded. Stale callbacks end here.
    fn guard(&self, step: &'static str) -> bool {
        if !self.is_active() {
            debug!("{step}: session stopped");
            return false;
        }
        if !self.state().flags.app_loaded {
            debug!("{step}: app not loaded");
            return false;
        }
        true
    }

    fn context(&self, command: CommandId) -> Result<u32, SecureChannelError> {
        self.state()
            .context_handle
            .ok_or(SecureChannelError::NoContext(command))
    }

    fn start(&self, chan: &mut TxmtrChannel<T>, out: &mut Outbox) {
        if !self.is_active() {
            debug!("start: session stopped before it ran");
            return;
        }
        self.state().reset_protocol();
        self.release(chan);
        if let Err(e) = self.load_and_init(chan, out) {
            error!("start failed: {e}");
            self.teardown(chan, out);
        }
    }

    fn load_and_init(
        &self,
        chan: &mut TxmtrChannel<T>,
        out: &mut Outbox,
    ) -> Result<(), SecureChannelError> {
        chan.load_library()?;
        {
            let mut st = self.state();
            st.flags.app_loaded = true;
            st.advance(PhaseEvent::LibraryLoaded);
        }
        if !self.is_active() {
            return Ok(());
        }
        let (ctx, first) = chan.txmtr_init()?;
        {
            let mut st = self.state();
            st.context_handle = Some(ctx);
            st.flags.tx_initialized = true;
            st.store_outbound(&first);
            st.advance(PhaseEvent::TransmitterInitialized);
        }
        debug!("{} ready for sink", first.message.name());
        out.push(ClientNotification::SendMessage {
            message: first.message,
            timeout_ms: first.timeout_ms,
        });
        Ok(())
    }

    fn message_sent(self: &Arc<Self>, chan: &mut TxmtrChannel<T>, out: &mut Outbox) {
        if !self.guard(Step::MessageSent.name()) {
            return;
        }
        let (last, repeater, update_stream, timeout_ms) = {
            let st = self.state();
            let timeout = if st.timeout_left_ms != 0 {
                st.timeout_left_ms
            } else {
                st.timeout_ms
            };
            (st.last_message_sent, st.repeater, st.update_stream, timeout)
        };
        debug!("{} sent to sink", last.map_or("NONE", message_name));

        match last.and_then(|id| MessageId::try_from(id).ok()) {
            Some(MessageId::SkeSendEks) => {
                if repeater {
                    self.queue_topology_wait();
                }
                match self.enable_encryption(chan) {
                    Ok(true) => {
                        {
                            let mut st = self.state();
                            st.flags.authenticated = true;
                            st.advance(PhaseEvent::EncryptionEnabled);
                        }
                        out.push(ClientNotification::StatusSuccess);
                        out.push(ClientNotification::LinkPoll);
                    }
                    Ok(false) => debug!("session stopped during encryption enable"),
                    Err(e) => {
                        error!("enable encryption failed: {e}");
                        self.teardown(chan, out);
                    }
                }
            }
            Some(MessageId::RepeaterAuthSendAck) => {
                debug!("repeater authentication successful");
                if update_stream {
                    self.state().update_stream = false;
                    self.query_stream_type(chan, out);
                } else {
                    out.push(ClientNotification::LinkPoll);
                }
            }
            _ => out.push(ClientNotification::ReceiveMessage { timeout_ms }),
        }
    }

    /// Wait the mandated delay, then program the session key. `Ok(false)` if
    /// the session stopped meanwhile.
    fn enable_encryption(&self, chan: &mut TxmtrChannel<T>) -> Result<bool, SecureChannelError> {
        thread::sleep(self.config.hw_key_delay());
        if !self.is_active() {
            return Ok(false);
        }
        let ctx = self.context(CommandId::TXMTR_SET_HW_KEY)?;
        chan.set_hw_key(ctx)?;
        Ok(self.is_active())
    }

    fn queue_topology_wait(self: &Arc<Self>) {
        let ticket = self.gate.arm();
        let me = Arc::clone(self);
        if let Err(e) = self.queue.enqueue(Box::new(move || me.topology_wait(ticket))) {
            error!("topology wait not queued: {e}");
        }
    }

    fn topology_wait(self: &Arc<Self>, ticket: GateTicket) {
        if self.gate.wait(ticket, self.config.topology_wait()) {
            debug!("topology wait released");
            return;
        }
        if !self.is_active() {
            return;
        }
        error!("topology receiver id list timeout");
        let mut out = Outbox::new();
        {
            let mut chan = self.channel();
            if self.is_active() {
                self.teardown(&mut chan, &mut out);
            }
        }
        self.bridge.deliver(out, &self.active);
    }

    fn message_received(&self, chan: &mut TxmtrChannel<T>, out: &mut Outbox, msg: MessageBuf) {
        if !self.guard("message received") {
            return;
        }
        let (no_stored_km, ctx) = {
            let mut st = self.state();
            st.last_message_received = Some(msg.clone());
            (st.no_stored_km, st.context_handle)
        };
        let Some(ctx) = ctx else {
            error!("{}", SecureChannelError::NoContext(CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE));
            self.teardown(chan, out);
            return;
        };
        debug!("msg received: {} from sink", msg.name());

        let result = chan.process_received_message(ctx, &msg);
        if !self.is_active() {
            return;
        }
        let rsp = match result {
            Ok(rsp) => rsp,
            Err(e) => {
                error!("processing {} failed: {e}", msg.name());
                self.teardown(chan, out);
                return;
            }
        };

        match msg.message_id() {
            // pairing sub-flow: AKE_Send_Pairing_Info follows H'
            Some(MessageId::AkeSendHPrime) if no_stored_km => {
                self.state().timeout_ms = rsp.timeout_ms;
                out.push(ClientNotification::ReceiveMessage {
                    timeout_ms: rsp.timeout_ms,
                });
                return;
            }
            Some(MessageId::RepeaterAuthStreamReady) => {
                debug!("got Auth_Stream_Ready, nothing sent to rx");
                out.push(ClientNotification::LinkPoll);
                return;
            }
            _ => {}
        }

        let announces_repeater = rsp.announces_repeater();
        let Some(reply) = rsp.message else {
            error!(
                "{}",
                SecureChannelError::EmptyMessage(CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE)
            );
            self.teardown(chan, out);
            return;
        };
        debug!("recvd {} from TZ", reply.name());

        let tx = TxMessage {
            message: reply,
            timeout_ms: rsp.timeout_ms,
        };
        {
            let mut st = self.state();
            st.no_stored_km = tx.message.message_id() == Some(MessageId::AkeNoStoredKm);
            if announces_repeater {
                debug!("repeater detected");
                st.repeater = true;
                st.update_stream = true;
            }
            st.store_outbound(&tx);
            st.advance(PhaseEvent::MessageExchanged);
        }
        out.push(ClientNotification::SendMessage {
            message: tx.message,
            timeout_ms: tx.timeout_ms,
        });
    }

    fn timeout_elapsed(&self, chan: &mut TxmtrChannel<T>, out: &mut Outbox) {
        if !self.guard(Step::Timeout.name()) {
            return;
        }
        let result = self
            .context(CommandId::TXMTR_SEND_MESSAGE_TIMEOUT)
            .and_then(|ctx| chan.send_message_timeout(ctx));
        if !self.is_active() {
            return;
        }
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!("send message timeout failed: {e}");
                self.teardown(chan, out);
                return;
            }
        };
        if let Some(lc_init) = reply.lc_init_resend() {
            debug!("resending {}", lc_init.name());
            let tx = TxMessage {
                message: lc_init.clone(),
                timeout_ms: reply.timeout_ms,
            };
            self.state().store_outbound(&tx);
            out.push(ClientNotification::SendMessage {
                message: tx.message,
                timeout_ms: tx.timeout_ms,
            });
            return;
        }
        if reply.responder == CommandId::TXMTR_SEND_MESSAGE_TIMEOUT.0 {
            error!("{}", CommandId::TXMTR_SEND_MESSAGE_TIMEOUT);
        } else {
            error!("unexpected timeout reply from {:#x}", reply.responder);
        }
        self.teardown(chan, out);
    }

    fn query_stream_type(&self, chan: &mut TxmtrChannel<T>, out: &mut Outbox) {
        if !self.is_active() || !self.state().repeater {
            debug!("stream type query ignored: not an active repeater session");
            return;
        }
        let result = self
            .context(CommandId::TXMTR_QUERY_STREAM_TYPE)
            .and_then(|ctx| chan.query_stream_type(ctx));
        if !self.is_active() {
            return;
        }
        match result {
            Ok(tx) => {
                debug!("{} ready for sink", tx.message.name());
                self.state().store_outbound(&tx);
                out.push(ClientNotification::SendMessage {
                    message: tx.message,
                    timeout_ms: tx.timeout_ms,
                });
            }
            Err(e) => {
                error!("query stream type failed: {e}");
                self.teardown(chan, out);
            }
        }
    }

    /// Release secure-channel resources held by the session, deinit before
    /// unload. Failures are logged; the flags are cleared regardless.
    fn release(&self, chan: &mut TxmtrChannel<T>) {
        let (tx_initialized, ctx, app_loaded) = {
            let st = self.state();
            (st.flags.tx_initialized, st.context_handle, st.flags.app_loaded)
        };
        if tx_initialized {
            if let Some(ctx) = ctx {
                if let Err(e) = chan.txmtr_deinit(ctx) {
                    error!("txmtr deinit failed: {e}");
                }
            }
            let mut st = self.state();
            st.flags.tx_initialized = false;
            st.context_handle = None;
        }
        if app_loaded {
            if let Err(e) = chan.unload_library() {
                error!("library unload failed: {e}");
            }
            self.state().flags.app_loaded = false;
        }
    }

    /// Release resources and end the session. Idempotent.
    ///
    /// `StatusFailed` is produced only if the session was still active, i.e.
    /// not deliberately stopped.
    pub(crate) fn teardown(&self, chan: &mut TxmtrChannel<T>, out: &mut Outbox) {
        self.release(chan);
        let was_active = self.active.swap(false, Ordering::SeqCst);
        {
            let mut st = self.state();
            if was_active {
                st.flags.error = true;
                st.advance(PhaseEvent::Failed);
            }
            if st.phase != SessionPhase::TornDown && st.phase != SessionPhase::Idle {
                st.advance(PhaseEvent::TornDown);
            }
        }
        self.gate.signal();
        if was_active {
            out.push(ClientNotification::StatusFailed);
        }
    }
}
