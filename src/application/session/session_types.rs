use core::fmt;

/// Resource and outcome flags of one authentication attempt.
///
/// Flags accumulate independently; `Init` is the state with none set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionFlags {
    /// Trusted application started and HDCP 2.2 library loaded.
    pub app_loaded: bool,
    /// Transmitter context exists; the context handle is valid.
    pub tx_initialized: bool,
    /// Session key programmed into the link hardware.
    pub authenticated: bool,
    /// Session ended in a protocol failure.
    pub error: bool,
}

impl SessionFlags {
    #[must_use]
    pub fn is_init(&self) -> bool {
        *self == Self::default()
    }
}

/// Coarse progress of a session, kept for diagnostics.
///
/// Teardown is reachable from every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    AppLoaded,
    TxInitialized,
    /// At least one message pair exchanged with the sink.
    Authenticating,
    Authenticated,
    Failed,
    TornDown,
}

/// Events that move [`SessionPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Start wakeup: fresh attempt.
    Reset,
    LibraryLoaded,
    TransmitterInitialized,
    MessageExchanged,
    EncryptionEnabled,
    Failed,
    TornDown,
}

impl SessionPhase {
    /// Transition table. `None` means `ev` is not valid in this phase.
    #[must_use]
    pub fn next(self, ev: PhaseEvent) -> Option<SessionPhase> {
        use PhaseEvent as E;
        use SessionPhase as P;
        let new = match (self, ev) {
            (_, E::Reset) => P::Idle,
            (P::Idle, E::LibraryLoaded) => P::AppLoaded,
            (P::AppLoaded, E::TransmitterInitialized) => P::TxInitialized,
            (P::TxInitialized | P::Authenticating, E::MessageExchanged) => P::Authenticating,
            // repeater topology exchange continues after encryption is on
            (P::Authenticated, E::MessageExchanged) => P::Authenticated,
            (P::TxInitialized | P::Authenticating, E::EncryptionEnabled) => P::Authenticated,
            (p, E::Failed) if p != P::TornDown => P::Failed,
            (_, E::TornDown) => P::TornDown,
            _ => return None,
        };
        Some(new)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Triggers the HDMI layer may send into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakeupCommand {
    Start,
    Stop,
    MessageSendSuccess,
    MessageSendFailed,
    MessageReceiveSuccess,
    MessageReceiveFailed,
    MessageReceiveTimeout,
    QueryStreamType,
}

impl WakeupCommand {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WakeupCommand::Start => "HDCP_LIB_WKUP_CMD_START",
            WakeupCommand::Stop => "HDCP_LIB_WKUP_CMD_STOP",
            WakeupCommand::MessageSendSuccess => "HDCP_LIB_WKUP_CMD_MSG_SEND_SUCCESS",
            WakeupCommand::MessageSendFailed => "HDCP_LIB_WKUP_CMD_MSG_SEND_FAILED",
            WakeupCommand::MessageReceiveSuccess => "HDCP_LIB_WKUP_CMD_MSG_RECV_SUCCESS",
            WakeupCommand::MessageReceiveFailed => "HDCP_LIB_WKUP_CMD_MSG_RECV_FAILED",
            WakeupCommand::MessageReceiveTimeout => "HDCP_LIB_WKUP_CMD_MSG_RECV_TIMEOUT",
            WakeupCommand::QueryStreamType => "HDCP_LIB_WKUP_CMD_QUERY_STREAM_TYPE",
        }
    }
}

impl fmt::Display for WakeupCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One wakeup with its side data.
///
/// `timeout_ms` is the time the HDMI layer reports as left; `message` carries
/// the bytes read from the sink for `MessageReceiveSuccess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeupData<'a> {
    pub command: WakeupCommand,
    pub timeout_ms: u32,
    pub message: Option<&'a [u8]>,
}

impl<'a> WakeupData<'a> {
    #[must_use]
    pub fn new(command: WakeupCommand) -> Self {
        Self {
            command,
            timeout_ms: 0,
            message: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: &'a [u8]) -> Self {
        self.message = Some(message);
        self
    }

    /// `MessageReceiveSuccess` carrying `message`.
    #[must_use]
    pub fn received(message: &'a [u8]) -> Self {
        Self::new(WakeupCommand::MessageReceiveSuccess).with_message(message)
    }
}

impl From<WakeupCommand> for WakeupData<'_> {
    fn from(command: WakeupCommand) -> Self {
        Self::new(command)
    }
}
