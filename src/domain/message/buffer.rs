use core::fmt;

use zeroize::Zeroizing;

use super::errors::MessageError;
use super::message_id::{MessageId, message_name};
use super::params::{MAX_RX_MESSAGE_SIZE, MAX_TX_MESSAGE_SIZE};

/// Owned HDCP message bytes, wiped on drop and on replacement.
///
/// Invariants:
/// - Never empty: the first byte is always present and is the message ID.
/// - Never longer than the bound it was constructed with (`MAX_TX_MESSAGE_SIZE`
///   for transmitter output, `MAX_RX_MESSAGE_SIZE` for sink input).
///
/// `Debug` prints only the message name and length.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageBuf(Zeroizing<Vec<u8>>);

impl MessageBuf {
    /// Copy `bytes` into a new buffer bounded by `max`.
    ///
    /// # Errors
    /// * `MessageError::Empty` if `bytes` is empty.
    /// * `MessageError::TooLarge` if `bytes.len() > max`.
    pub fn bounded(bytes: &[u8], max: usize) -> Result<Self, MessageError> {
        if bytes.is_empty() {
            return Err(MessageError::Empty);
        }
        if bytes.len() > max {
            return Err(MessageError::TooLarge {
                len: bytes.len(),
                max,
            });
        }
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    /// Buffer for a message produced by the transmitter (bound 129 bytes).
    ///
    /// # Errors
    /// See [`MessageBuf::bounded`].
    pub fn outbound(bytes: &[u8]) -> Result<Self, MessageError> {
        Self::bounded(bytes, MAX_TX_MESSAGE_SIZE)
    }

    /// Buffer for a message received from the sink (bound 534 bytes).
    ///
    /// # Errors
    /// See [`MessageBuf::bounded`].
    pub fn inbound(bytes: &[u8]) -> Result<Self, MessageError> {
        Self::bounded(bytes, MAX_RX_MESSAGE_SIZE)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw message ID byte.
    #[must_use]
    pub fn id_byte(&self) -> u8 {
        self.0[0]
    }

    /// Catalogued message ID, if known.
    #[must_use]
    pub fn message_id(&self) -> Option<MessageId> {
        MessageId::try_from(self.id_byte()).ok()
    }

    /// Whether this buffer is `id` with its exact mandated size.
    #[must_use]
    pub fn is(&self, id: MessageId) -> bool {
        id.matches(&self.0)
    }

    /// Diagnostic name of the carried message.
    #[must_use]
    pub fn name(&self) -> &'static str {
        message_name(self.id_byte())
    }
}

impl AsRef<[u8]> for MessageBuf {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for MessageBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageBuf({}, {} bytes)", self.name(), self.len())
    }
}
