//! Downstream topology as reported by the trusted application.
use crate::domain::message::{MAX_TOPOLOGY_ELEMS, RCVR_ID_SIZE};

/// One receiver (or repeater) behind the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverInfo {
    pub receiver_id: [u8; RCVR_ID_SIZE],
    /// Element type code assigned by the trusted application.
    pub elem_type: u32,
    pub hdcp_version: u32,
}

/// Receivers reported by `HDCP_TXMTR_GET_TOPOLOGY_INFO`, at most
/// [`MAX_TOPOLOGY_ELEMS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    receivers: Vec<ReceiverInfo>,
}

impl Topology {
    /// Returns `None` if more than [`MAX_TOPOLOGY_ELEMS`] receivers are given.
    #[must_use]
    pub fn new(receivers: Vec<ReceiverInfo>) -> Option<Self> {
        (receivers.len() <= MAX_TOPOLOGY_ELEMS).then_some(Self { receivers })
    }

    #[must_use]
    pub fn receivers(&self) -> &[ReceiverInfo] {
        &self.receivers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}
