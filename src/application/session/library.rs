use std::sync::Arc;
use std::sync::atomic::Ordering;

use log::{debug, error, warn};

use super::bridge::{NotificationBridge, Outbox};
use super::config::SessionConfig;
use super::errors::SessionError;
use super::session_machine::{SessionSnapshot, Shared, Step};
use super::session_types::{WakeupCommand, WakeupData};
use crate::core::dispatch::{ExecutionMode, WorkerStatus};
use crate::core::wire::CommandId;
use crate::domain::message::MessageBuf;
use crate::domain::topology::Topology;
use crate::ports::client::ClientNotifier;
use crate::ports::secure_channel::{SecureChannel, SecureChannelError};

/// Handle of one registered HDCP 2.2 transmitter session.
///
/// The HDMI layer drives the protocol with [`HdcpLibrary::wakeup`] and is
/// driven back through its [`ClientNotifier`]. Dropping the handle (or
/// [`HdcpLibrary::deregister`]) stops the session, releases the trusted
/// application and joins the worker.
pub struct HdcpLibrary<T: SecureChannel + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: SecureChannel + 'static> HdcpLibrary<T> {
    /// Register a session over `transport`, reporting to `client`.
    ///
    /// # Errors
    /// * `SessionError::Config` if `config` does not validate.
    /// * `SessionError::Dispatch` if the worker thread cannot be spawned.
    pub fn register(
        transport: T,
        client: Arc<dyn ClientNotifier>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        debug!(
            "registering session, {} on worker {}",
            config.execution_mode, config.worker_name
        );
        let shared = Shared::new(transport, NotificationBridge::new(client), config)?;
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Feed one event from the HDMI layer into the session.
    ///
    /// Wakeups are taken in arrival order. Tethered: the resulting step has
    /// run when this returns, and a concurrent wakeup waits for it; only the
    /// notification delivery happens outside that ordering, so the client may
    /// call back in. Threaded: the step is queued behind earlier steps.
    /// Events for a stopped session (other than `Start` and `Stop`) are
    /// ignored. `Stop` clears the active flag before waiting its turn, which
    /// cancels a step already in progress.
    ///
    /// # Errors
    /// * `SessionError::Message` for an empty or oversized message.
    /// * `SessionError::MissingMessage` for a receive event without bytes.
    /// * `SessionError::Busy` for `Start` while a step is queued or running.
    /// * `SessionError::Dispatch` if the step cannot be queued.
    pub fn wakeup(&self, data: WakeupData<'_>) -> Result<(), SessionError> {
        let shared = &self.shared;
        let captured = data.message.map(MessageBuf::inbound).transpose()?;
        let step = match data.command {
            WakeupCommand::Start => Step::Start,
            WakeupCommand::Stop => Step::Teardown,
            WakeupCommand::MessageSendSuccess => Step::MessageSent,
            WakeupCommand::MessageSendFailed | WakeupCommand::MessageReceiveFailed => {
                Step::Teardown
            }
            WakeupCommand::MessageReceiveSuccess => {
                Step::MessageReceived(captured.ok_or(SessionError::MissingMessage)?)
            }
            WakeupCommand::MessageReceiveTimeout => Step::Timeout,
            WakeupCommand::QueryStreamType => Step::QueryStreamType,
        };
        if data.command == WakeupCommand::Stop {
            shared.active.store(false, Ordering::SeqCst);
        }

        let guard = shared.wakeup_guard();
        let mode = *shared.mode();
        debug!(
            "{}, timeout left: {}ms, {mode}",
            data.command, data.timeout_ms
        );

        match data.command {
            WakeupCommand::Start => {
                if shared.queue.pending() > 0 || shared.step_in_progress() {
                    self.log_worker_status();
                    return Err(SessionError::Busy);
                }
            }
            // a start that slipped in ahead of this stop is cancelled too
            WakeupCommand::Stop => shared.active.store(false, Ordering::SeqCst),
            _ => {
                if !shared.is_active() {
                    debug!("hdcp2.2 session tearing down");
                    return Ok(());
                }
                if !shared.state().flags.app_loaded {
                    debug!("hdcp2.2 app not loaded");
                    return Ok(());
                }
            }
        }

        {
            let mut st = shared.state();
            st.timeout_left_ms = data.timeout_ms;
            if data.command == WakeupCommand::MessageSendSuccess {
                st.last_message_sent = st.pending_outbound.as_ref().map(MessageBuf::id_byte);
            }
        }
        shared.gate.signal();

        let starting = step == Step::Start;
        if starting {
            shared.active.store(true, Ordering::SeqCst);
        }
        match mode {
            ExecutionMode::Threaded => {
                if let Err(e) = shared.enqueue(step) {
                    if starting {
                        shared.active.store(false, Ordering::SeqCst);
                    }
                    return Err(e.into());
                }
            }
            ExecutionMode::Tethered => {
                let out = shared.execute(step);
                drop(guard);
                shared.bridge.deliver(out, &shared.active);
            }
        }
        Ok(())
    }

    /// Switch tethered / threaded execution for subsequent wakeups.
    pub fn update_exec_type(&self, mode: ExecutionMode) {
        let mut current = self.shared.mode();
        if *current == mode {
            debug!("exec mode same as {mode}");
        } else {
            *current = mode;
            debug!("exec mode changed to {mode}");
        }
    }

    #[must_use]
    pub fn execution_mode(&self) -> ExecutionMode {
        *self.shared.mode()
    }

    /// Whether the trusted application can be loaded on this device.
    ///
    /// Probes by loading and unloading the library once; a positive answer
    /// is cached. Never disturbs a running session.
    pub fn feature_supported(&self) -> bool {
        let shared = &self.shared;
        if shared.feature_supported.load(Ordering::SeqCst) {
            return true;
        }
        let mut chan = shared.channel();
        if shared.state().flags.app_loaded {
            shared.feature_supported.store(true, Ordering::SeqCst);
            return true;
        }
        match chan.load_library() {
            Ok(()) => {
                debug!("HDCP2p2 supported");
                shared.feature_supported.store(true, Ordering::SeqCst);
                if let Err(e) = chan.unload_library() {
                    warn!("probe unload failed: {e}");
                }
                true
            }
            Err(e) => {
                debug!("HDCP2p2 not supported: {e}");
                false
            }
        }
    }

    /// Downstream receivers known to the transmitter context.
    ///
    /// # Errors
    /// * `SessionError::NotInitialized` without a transmitter context.
    /// * `SessionError::SecureChannel` if the command fails.
    pub fn topology_info(&self) -> Result<Topology, SessionError> {
        let mut chan = self.shared.channel();
        let ctx = self.context(CommandId::TXMTR_GET_TOPOLOGY_INFO)?;
        Ok(chan.get_topology_info(ctx)?)
    }

    /// Tell the trusted application where the new SRM lies.
    ///
    /// # Errors
    /// * `SessionError::NotInitialized` without a transmitter context.
    /// * `SessionError::SecureChannel` if the command fails.
    pub fn update_srm(&self, offset: u32, length: u32) -> Result<(), SessionError> {
        let mut chan = self.shared.channel();
        let ctx = self.context(CommandId::TXMTR_UPDATE_SRM)?;
        Ok(chan.update_srm(ctx, offset, length)?)
    }

    fn context(&self, command: CommandId) -> Result<u32, SessionError> {
        let st = self.shared.state();
        match (st.flags.tx_initialized, st.context_handle) {
            (true, Some(ctx)) => Ok(ctx),
            _ => {
                debug!("{}", SecureChannelError::NoContext(command));
                Err(SessionError::NotInitialized)
            }
        }
    }

    /// Pending and executing work on the session worker.
    #[must_use]
    pub fn worker_status(&self) -> WorkerStatus {
        self.shared.queue.status()
    }

    fn log_worker_status(&self) {
        let st = self.worker_status();
        debug!(
            "{}: {} work item(s) pending, executing: {}",
            self.shared.queue.name(),
            st.pending,
            st.executing
        );
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Stop the session and release everything it holds.
    pub fn deregister(self) {
        drop(self);
    }
}

impl<T: SecureChannel + 'static> Drop for HdcpLibrary<T> {
    fn drop(&mut self) {
        let shared = &self.shared;
        shared.active.store(false, Ordering::SeqCst);
        shared.gate.signal();
        if let Err(e) = shared.queue.shutdown() {
            error!("{e}");
        }
        let mut out = Outbox::new();
        {
            let mut chan = shared.channel();
            shared.teardown(&mut chan, &mut out);
        }
        shared.bridge.deliver(out, &shared.active);
        let mut st = shared.state();
        st.last_message_received = None;
        st.pending_outbound = None;
        debug!("session deregistered");
    }
}
