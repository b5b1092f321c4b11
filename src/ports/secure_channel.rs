//! Secure-channel boundary port.
//!
//! The transport that loads a trusted application and marshals opaque command
//! buffers into it lives outside this crate. The session only needs three
//! operations from it: start the application, shut it down, and exchange one
//! request / response pair. Implementations are not required to be reentrant;
//! the session guarantees at most one outstanding call.
use crate::core::wire::{CommandId, WireError};
use crate::domain::message::MessageError;
use thiserror::Error;

/// Errors surfaced by secure-channel operations and by validation of their
/// responses.
///
/// Every variant is fatal for the HDCP session that observed it: the trusted
/// application state is unknown afterwards and must be torn down.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecureChannelError {
    /// Transport-level failure (the transport's own return code).
    #[error("transport failure for {command}: rc {rc}")]
    Transport { command: CommandId, rc: i32 },
    /// Starting or stopping the trusted application failed.
    #[error("trusted application {app} could not be {action}: rc {rc}")]
    App {
        app: String,
        action: &'static str,
        rc: i32,
    },
    /// Command issued while no trusted application is loaded.
    #[error("trusted application not loaded")]
    AppNotLoaded,
    /// Command that needs a transmitter context issued without one.
    #[error("no transmitter context for {0}")]
    NoContext(CommandId),
    /// Non-zero status word in the response.
    #[error("{command} failed with status {status:#x}")]
    Status { command: CommandId, status: u32 },
    /// Response echoed a different command ID.
    #[error("command id mismatch: expected {expected}, got {actual:#x}")]
    CommandMismatch { expected: CommandId, actual: u32 },
    /// Response carried no message where one was required.
    #[error("{0} returned an empty message")]
    EmptyMessage(CommandId),
    /// Response message length exceeded the message field.
    #[error("{command} returned message length {len} beyond limit {max}")]
    MessageTooLarge {
        command: CommandId,
        len: usize,
        max: usize,
    },
    /// Topology response listed more receivers than the layout holds.
    #[error("topology lists {count} receivers, limit {max}")]
    TopologyOverflow { count: u32, max: usize },
    /// Shared buffer cannot hold the aligned request and response.
    #[error("shared buffer too small: need {required} bytes, have {capacity}")]
    BufferTooSmall { required: usize, capacity: usize },
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Message(#[from] MessageError),
}

/// Opaque RPC channel into the trusted execution environment.
pub trait SecureChannel: Send {
    /// Start the trusted application `app_name` with a shared buffer of
    /// `buffer_size` bytes.
    ///
    /// # Errors
    /// * `SecureChannelError::App` if the application cannot be started.
    fn start_app(&mut self, app_name: &str, buffer_size: usize) -> Result<(), SecureChannelError>;

    /// Release the trusted application started by [`SecureChannel::start_app`].
    ///
    /// # Errors
    /// * `SecureChannelError::App` if shutdown fails.
    fn shutdown_app(&mut self) -> Result<(), SecureChannelError>;

    /// Exchange one aligned request buffer for a response of at most
    /// `response_capacity` bytes.
    ///
    /// # Errors
    /// * `SecureChannelError::Transport` on transport failure.
    /// * `SecureChannelError::AppNotLoaded` if no application is running.
    fn send_command(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_capacity: usize,
    ) -> Result<Vec<u8>, SecureChannelError>;
}

impl<T: SecureChannel + ?Sized> SecureChannel for Box<T> {
    fn start_app(&mut self, app_name: &str, buffer_size: usize) -> Result<(), SecureChannelError> {
        (**self).start_app(app_name, buffer_size)
    }
    fn shutdown_app(&mut self) -> Result<(), SecureChannelError> {
        (**self).shutdown_app()
    }
    fn send_command(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_capacity: usize,
    ) -> Result<Vec<u8>, SecureChannelError> {
        (**self).send_command(command, request, response_capacity)
    }
}
