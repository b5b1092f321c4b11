use core::fmt;

const HDCP_TXMTR_SERVICE_ID: u32 = 0x0000_1000;

const fn txmtr_cmd(x: u32) -> u32 {
    HDCP_TXMTR_SERVICE_ID | x
}

/// Command identifier carried in the first word of every request and echoed
/// in every HDCP 2.2 response.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub u32);

impl CommandId {
    pub const TXMTR_INIT: Self = Self(txmtr_cmd(1));
    pub const TXMTR_DEINIT: Self = Self(txmtr_cmd(2));
    pub const TXMTR_PROCESS_RECEIVED_MESSAGE: Self = Self(txmtr_cmd(3));
    pub const TXMTR_SEND_MESSAGE_TIMEOUT: Self = Self(txmtr_cmd(4));
    pub const TXMTR_SET_HW_KEY: Self = Self(txmtr_cmd(5));
    pub const TXMTR_QUERY_STREAM_TYPE: Self = Self(txmtr_cmd(6));
    pub const TXMTR_GET_KSXORLC128_AND_RIV: Self = Self(txmtr_cmd(7));
    pub const TXMTR_PROVISION_KEY: Self = Self(txmtr_cmd(8));
    pub const TXMTR_GET_TOPOLOGY_INFO: Self = Self(txmtr_cmd(9));
    pub const TXMTR_UPDATE_SRM: Self = Self(txmtr_cmd(10));
    /// Library init; this is what actually loads the HDCP 2.2 application.
    pub const LIB_INIT: Self = Self(txmtr_cmd(11));
    pub const LIB_DEINIT: Self = Self(txmtr_cmd(12));

    // HDCP 1.x application
    pub const HDCP1_SET_KEY: Self = Self(202);
    pub const HDCP1_SET_ENC: Self = Self(205);

    /// Symbolic name for logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TXMTR_INIT => "HDCP_TXMTR_INIT",
            Self::TXMTR_DEINIT => "HDCP_TXMTR_DEINIT",
            Self::TXMTR_PROCESS_RECEIVED_MESSAGE => "HDCP_TXMTR_PROCESS_RECEIVED_MESSAGE",
            Self::TXMTR_SEND_MESSAGE_TIMEOUT => "HDCP_TXMTR_SEND_MESSAGE_TIMEOUT",
            Self::TXMTR_SET_HW_KEY => "HDCP_TXMTR_SET_HW_KEY",
            Self::TXMTR_QUERY_STREAM_TYPE => "HDCP_TXMTR_QUERY_STREAM_TYPE",
            Self::TXMTR_GET_KSXORLC128_AND_RIV => "HDCP_TXMTR_GET_KSXORLC128_AND_RIV",
            Self::TXMTR_PROVISION_KEY => "HDCP_TXMTR_PROVISION_KEY",
            Self::TXMTR_GET_TOPOLOGY_INFO => "HDCP_TXMTR_GET_TOPOLOGY_INFO",
            Self::TXMTR_UPDATE_SRM => "HDCP_TXMTR_UPDATE_SRM",
            Self::LIB_INIT => "HDCP_LIB_INIT",
            Self::LIB_DEINIT => "HDCP_LIB_DEINIT",
            Self::HDCP1_SET_KEY => "HDCP1_SET_KEY",
            Self::HDCP1_SET_ENC => "HDCP1_SET_ENC",
            _ => "UNKNOWN",
        }
    }
}

impl From<CommandId> for u32 {
    fn from(value: CommandId) -> Self {
        value.0
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandId({}, {:#x})", self.name(), self.0)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txmtr_ids_are_wire_exact() {
        assert_eq!(CommandId::TXMTR_INIT.0, 0x1001);
        assert_eq!(CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE.0, 0x1003);
        assert_eq!(CommandId::TXMTR_UPDATE_SRM.0, 0x100a);
        assert_eq!(CommandId::LIB_INIT.0, 0x100b);
        assert_eq!(CommandId::LIB_DEINIT.0, 0x100c);
    }

    #[test]
    fn unknown_id_named_unknown() {
        assert_eq!(CommandId(0xdead).name(), "UNKNOWN");
        assert_eq!(CommandId::HDCP1_SET_ENC.to_string(), "HDCP1_SET_ENC");
    }
}
