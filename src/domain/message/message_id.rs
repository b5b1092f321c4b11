use core::fmt;

use super::errors::MessageError;
use super::params::{LC_INIT_MESSAGE_SIZE, SKE_SEND_EKS_MESSAGE_SIZE};

/// HDCP 2.2 authentication protocol message identifiers.
///
/// The discriminant is the value of the first byte of every HDCP 2.2
/// authentication message. IDs 6, 13 and 14 are not used by a transmitter
/// talking to an HDMI sink and are therefore absent.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    AkeInit = 2,
    AkeSendCert = 3,
    AkeNoStoredKm = 4,
    AkeStoredKm = 5,
    AkeSendHPrime = 7,
    AkeSendPairingInfo = 8,
    LcInit = 9,
    LcSendLPrime = 10,
    SkeSendEks = 11,
    RepeaterAuthSendReceiverIdList = 12,
    RepeaterAuthSendAck = 15,
    RepeaterAuthStreamManage = 16,
    RepeaterAuthStreamReady = 17,
}

impl MessageId {
    /// All catalogued IDs in protocol order.
    pub const ALL: [MessageId; 13] = [
        MessageId::AkeInit,
        MessageId::AkeSendCert,
        MessageId::AkeNoStoredKm,
        MessageId::AkeStoredKm,
        MessageId::AkeSendHPrime,
        MessageId::AkeSendPairingInfo,
        MessageId::LcInit,
        MessageId::LcSendLPrime,
        MessageId::SkeSendEks,
        MessageId::RepeaterAuthSendReceiverIdList,
        MessageId::RepeaterAuthSendAck,
        MessageId::RepeaterAuthStreamManage,
        MessageId::RepeaterAuthStreamReady,
    ];

    /// Raw on-wire value.
    #[must_use]
    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Diagnostic name as used by the HDCP 2.2 specification.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MessageId::AkeInit => "AKE_INIT",
            MessageId::AkeSendCert => "AKE_SEND_CERT",
            MessageId::AkeNoStoredKm => "AKE_NO_STORED_KM",
            MessageId::AkeStoredKm => "AKE_STORED_KM",
            MessageId::AkeSendHPrime => "AKE_SEND_H_PRIME",
            MessageId::AkeSendPairingInfo => "AKE_SEND_PAIRING_INFO",
            MessageId::LcInit => "LC_INIT",
            MessageId::LcSendLPrime => "LC_SEND_L_PRIME",
            MessageId::SkeSendEks => "SKE_SEND_EKS",
            MessageId::RepeaterAuthSendReceiverIdList => "REPEATER_AUTH_SEND_RECEIVERID_LIST",
            MessageId::RepeaterAuthSendAck => "REPEATER_AUTH_SEND_ACK",
            MessageId::RepeaterAuthStreamManage => "REPEATER_AUTH_STREAM_MANAGE",
            MessageId::RepeaterAuthStreamReady => "REPEATER_AUTH_STREAM_READY",
        }
    }

    /// Mandated total length (ID byte included) for messages the session
    /// branches on by size. `None` for variable or unchecked messages.
    #[must_use]
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            MessageId::LcInit => Some(LC_INIT_MESSAGE_SIZE),
            MessageId::SkeSendEks => Some(SKE_SEND_EKS_MESSAGE_SIZE),
            _ => None,
        }
    }

    /// Whether `bytes` is this message with its exact mandated size.
    ///
    /// Messages without a fixed size only need a matching ID byte.
    #[must_use]
    pub fn matches(self, bytes: &[u8]) -> bool {
        match bytes.first() {
            Some(&b) if b == self.raw() => self.fixed_size().map_or(true, |n| bytes.len() == n),
            _ => false,
        }
    }
}

impl TryFrom<u8> for MessageId {
    type Error = MessageError;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        MessageId::ALL
            .iter()
            .copied()
            .find(|id| id.raw() == v)
            .ok_or(MessageError::UnknownId(v))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Diagnostic name for a raw message ID byte, `"UNKNOWN"` when uncatalogued.
#[must_use]
pub fn message_name(raw: u8) -> &'static str {
    MessageId::try_from(raw).map_or("UNKNOWN", MessageId::name)
}
