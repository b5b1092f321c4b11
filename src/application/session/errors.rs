use thiserror::Error;

use crate::core::dispatch::DispatchError;
use crate::domain::message::MessageError;
use crate::ports::secure_channel::SecureChannelError;

/// Rejected session configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("hw key delay {ms}ms below the {min}ms minimum")]
    HwKeyDelayTooShort { ms: u64, min: u64 },

    #[error("topology wait must be positive")]
    ZeroTopologyWait,

    #[error("trusted application name is empty")]
    EmptyAppName,

    #[error("worker name {0:?} is not a valid thread name")]
    InvalidWorkerName(String),

    #[error("shared buffer of {actual} bytes cannot hold {required} bytes of request and response")]
    SharedBufferTooSmall { required: usize, actual: usize },
}

/// Errors returned synchronously by the public session API.
///
/// Protocol failures inside a step never surface here; they end in teardown
/// and a `StatusFailed` notification.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a protocol step is queued or running")]
    Busy,

    #[error("receive wakeup carries no message")]
    MissingMessage,

    #[error("transmitter not initialized")]
    NotInitialized,

    #[error("invalid message: {0}")]
    Message(#[from] MessageError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("dispatch failure: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("secure channel failure: {0}")]
    SecureChannel(#[from] SecureChannelError),
}
