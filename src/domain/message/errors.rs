use thiserror::Error;

/// Validation failures for HDCP message buffers and identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// Message buffer was empty (no message ID byte).
    #[error("message is empty")]
    Empty,
    /// Message exceeded the buffer bound shared with the trusted application.
    #[error("message too large: {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
    /// First byte is not an HDCP 2.2 message ID known to the catalog.
    #[error("unknown HDCP message id {0}")]
    UnknownId(u8),
}
