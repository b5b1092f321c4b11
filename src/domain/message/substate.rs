/// Transmitter sub-state reported by the trusted application in the `flag`
/// field of a processed-message response.
///
/// Only `WaitingForReceiverIdList` influences the session (repeater
/// detection); the remaining values are carried for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxmtrSubstate {
    Init,
    WaitingForReceiverIdList,
    ProcessedReceiverIdList,
    WaitingForStreamReadyMessage,
    RepeaterAuthComplete,
    /// Value not defined by the trusted application interface.
    Other(u32),
}

impl From<u32> for TxmtrSubstate {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Init,
            1 => Self::WaitingForReceiverIdList,
            2 => Self::ProcessedReceiverIdList,
            3 => Self::WaitingForStreamReadyMessage,
            4 => Self::RepeaterAuthComplete,
            other => Self::Other(other),
        }
    }
}

impl From<TxmtrSubstate> for u32 {
    fn from(s: TxmtrSubstate) -> Self {
        match s {
            TxmtrSubstate::Init => 0,
            TxmtrSubstate::WaitingForReceiverIdList => 1,
            TxmtrSubstate::ProcessedReceiverIdList => 2,
            TxmtrSubstate::WaitingForStreamReadyMessage => 3,
            TxmtrSubstate::RepeaterAuthComplete => 4,
            TxmtrSubstate::Other(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_decode() {
        assert_eq!(TxmtrSubstate::from(1), TxmtrSubstate::WaitingForReceiverIdList);
        assert_eq!(TxmtrSubstate::from(4), TxmtrSubstate::RepeaterAuthComplete);
    }

    #[test]
    fn unknown_values_are_preserved() {
        let s = TxmtrSubstate::from(42);
        assert_eq!(s, TxmtrSubstate::Other(42));
        assert_eq!(u32::from(s), 42);
    }
}
