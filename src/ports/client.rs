//! Client (HDMI controller) notification port.
//!
//! The session hands control back to the HDMI layer exclusively through
//! [`ClientNotifier::notify`]. The HDMI layer performs the requested action
//! (transmit, receive, poll link) and later reports the outcome through the
//! session's `wakeup` entry point.
use core::fmt;

use thiserror::Error;

use crate::domain::message::MessageBuf;

/// Closed set of notification codes understood by the HDMI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCode {
    /// No action; never delivered.
    Invalid,
    SendMessage,
    ReceiveMessage,
    LinkPoll,
    StatusSuccess,
    StatusFailed,
}

impl NotificationCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCode::Invalid => "HDMI_HDCP_WKUP_CMD_INVALID",
            NotificationCode::SendMessage => "HDMI_HDCP_WKUP_CMD_SEND_MESSAGE",
            NotificationCode::ReceiveMessage => "HDMI_HDCP_WKUP_CMD_RECV_MESSAGE",
            NotificationCode::LinkPoll => "HDMI_HDCP_WKUP_CMD_LINK_POLL",
            NotificationCode::StatusSuccess => "HDMI_HDCP_WKUP_CMD_STATUS_SUCCESS",
            NotificationCode::StatusFailed => "HDMI_HDCP_WKUP_CMD_STATUS_FAILED",
        }
    }
}

impl fmt::Display for NotificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification with its side data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotification {
    /// Transmit `message` to the sink; the sink must answer within `timeout_ms`.
    SendMessage { message: MessageBuf, timeout_ms: u32 },
    /// Read the next message from the sink within `timeout_ms`.
    ReceiveMessage { timeout_ms: u32 },
    /// Start periodic link-integrity polling.
    LinkPoll,
    /// Authentication completed and encryption is enabled.
    StatusSuccess,
    /// Authentication failed; the session has been torn down.
    StatusFailed,
}

impl ClientNotification {
    #[must_use]
    pub fn code(&self) -> NotificationCode {
        match self {
            ClientNotification::SendMessage { .. } => NotificationCode::SendMessage,
            ClientNotification::ReceiveMessage { .. } => NotificationCode::ReceiveMessage,
            ClientNotification::LinkPoll => NotificationCode::LinkPoll,
            ClientNotification::StatusSuccess => NotificationCode::StatusSuccess,
            ClientNotification::StatusFailed => NotificationCode::StatusFailed,
        }
    }

    /// Forward notifications advance the protocol and are dropped once the
    /// session has stopped; only `StatusFailed` survives a stop.
    #[must_use]
    pub fn is_forward(&self) -> bool {
        !matches!(self, ClientNotification::StatusFailed)
    }
}

/// Errors a client may report when it cannot accept a notification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("client rejected notification: {0}")]
    Rejected(String),
    #[error("client gone")]
    Disconnected,
}

/// Callback interface implemented by the HDMI controller.
///
/// Implementations must not block for long; they typically queue the
/// requested action and return.
pub trait ClientNotifier: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    /// A returned error is logged by the session and otherwise ignored.
    fn notify(&self, notification: &ClientNotification) -> Result<(), NotifyError>;
}

impl<C: ClientNotifier + ?Sized> ClientNotifier for std::sync::Arc<C> {
    fn notify(&self, notification: &ClientNotification) -> Result<(), NotifyError> {
        (**self).notify(notification)
    }
}
