use core::mem::size_of;

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use super::command_id::CommandId;
use crate::domain::message::{
    HDCP1_AKSV_SIZE, MAX_RX_MESSAGE_SIZE, MAX_TOPOLOGY_ELEMS, MAX_TX_MESSAGE_SIZE, RCVR_ID_SIZE,
};

/// A trait implemented by request types. Describes the associated command ID
/// and response type.
pub trait Request: IntoBytes + FromBytes + Immutable + KnownLayout {
    const ID: CommandId;
    type Resp: Response;
}

pub trait Response: IntoBytes + FromBytes + Immutable + KnownLayout
where
    Self: Sized,
{
    /// The minimum size (in bytes) of this response. Transports returning
    /// fewer bytes are rejected; longer responses are alignment padding.
    const MIN_SIZE: usize = size_of::<Self>();
}

/// HDCP 2.2 responses lead with a status word and the echoed command ID.
pub trait TxmtrResponse: Response {
    fn status(&self) -> u32;
    fn command_id(&self) -> u32;
}

/// Responses that carry a transmitter message for the sink.
pub trait MessageResponse: TxmtrResponse {
    fn timeout(&self) -> u32;
    fn msglen(&self) -> u32;
    fn message(&self) -> &[u8; MAX_TX_MESSAGE_SIZE];
}

macro_rules! txmtr_response {
    ($ty:ty) => {
        impl Response for $ty {}
        impl TxmtrResponse for $ty {
            fn status(&self) -> u32 {
                self.status
            }
            fn command_id(&self) -> u32 {
                self.commandid
            }
        }
    };
    ($ty:ty, message: $field:ident) => {
        txmtr_response!($ty);
        impl MessageResponse for $ty {
            fn timeout(&self) -> u32 {
                self.timeout
            }
            fn msglen(&self) -> u32 {
                self.msglen
            }
            fn message(&self) -> &[u8; MAX_TX_MESSAGE_SIZE] {
                &self.$field
            }
        }
    };
}

// ---- init (HDCP_LIB_INIT / HDCP_TXMTR_INIT) ----

/// `hdcp_init_req`: `0: commandid`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct InitReq {
    pub commandid: u32,
}

/// Request loading the HDCP 2.2 library inside the trusted application.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct LibInitReq(pub InitReq);

impl Default for LibInitReq {
    fn default() -> Self {
        Self(InitReq {
            commandid: CommandId::LIB_INIT.0,
        })
    }
}

impl Request for LibInitReq {
    const ID: CommandId = CommandId::LIB_INIT;
    type Resp = InitRsp;
}

/// Request creating a transmitter context and its first message (`AKE_Init`).
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct TxmtrInitReq(pub InitReq);

impl Default for TxmtrInitReq {
    fn default() -> Self {
        Self(InitReq {
            commandid: CommandId::TXMTR_INIT.0,
        })
    }
}

impl Request for TxmtrInitReq {
    const ID: CommandId = CommandId::TXMTR_INIT;
    type Resp = InitRsp;
}

/// `hdcp_init_rsp`: `0: status, 4: commandid, 8: ctxhandle, 12: timeout,
/// 16: msglen, 20: message[129]`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct InitRsp {
    pub status: u32,
    pub commandid: u32,
    pub ctxhandle: u32,
    pub timeout: u32,
    pub msglen: u32,
    pub message: [u8; MAX_TX_MESSAGE_SIZE],
}
txmtr_response!(InitRsp, message: message);

// ---- deinit (HDCP_LIB_DEINIT / HDCP_TXMTR_DEINIT) ----

/// `hdcp_deinit_req`: `0: commandid, 4: ctxhandle`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct DeinitReq {
    pub commandid: u32,
    pub ctxhandle: u32,
}

#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct LibDeinitReq(pub DeinitReq);

impl Default for LibDeinitReq {
    fn default() -> Self {
        Self(DeinitReq {
            commandid: CommandId::LIB_DEINIT.0,
            ctxhandle: 0,
        })
    }
}

impl Request for LibDeinitReq {
    const ID: CommandId = CommandId::LIB_DEINIT;
    type Resp = DeinitRsp;
}

#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct TxmtrDeinitReq(pub DeinitReq);

impl TxmtrDeinitReq {
    #[must_use]
    pub fn new(ctxhandle: u32) -> Self {
        Self(DeinitReq {
            commandid: CommandId::TXMTR_DEINIT.0,
            ctxhandle,
        })
    }
}

impl Request for TxmtrDeinitReq {
    const ID: CommandId = CommandId::TXMTR_DEINIT;
    type Resp = DeinitRsp;
}

/// `hdcp_deinit_rsp`: `0: status, 4: commandid`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct DeinitRsp {
    pub status: u32,
    pub commandid: u32,
}
txmtr_response!(DeinitRsp);

// ---- HDCP_TXMTR_PROCESS_RECEIVED_MESSAGE ----

/// `hdcp_rcvd_msg_req`: `0: commandid, 4: ctxhandle, 8: msglen, 12: msg[534]`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct RcvdMsgReq {
    pub commandid: u32,
    pub ctxhandle: u32,
    pub msglen: u32,
    pub msg: [u8; MAX_RX_MESSAGE_SIZE],
}

impl RcvdMsgReq {
    /// Build a request for `msg`.
    ///
    /// Caller guarantees `msg.len() <= MAX_RX_MESSAGE_SIZE` (enforced by
    /// `MessageBuf::inbound`).
    #[must_use]
    pub fn new(ctxhandle: u32, msg: &[u8]) -> Self {
        let mut req = Self::new_zeroed();
        req.commandid = CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE.0;
        req.ctxhandle = ctxhandle;
        let n = msg.len().min(MAX_RX_MESSAGE_SIZE);
        req.msg[..n].copy_from_slice(&msg[..n]);
        req.msglen = n as u32;
        req
    }
}

impl Request for RcvdMsgReq {
    const ID: CommandId = CommandId::TXMTR_PROCESS_RECEIVED_MESSAGE;
    type Resp = RcvdMsgRsp;
}

/// `hdcp_rcvd_msg_rsp`: `0: status, 4: commandid, 8: state, 12: timeout,
/// 16: flag, 20: msglen, 24: msg[129]`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct RcvdMsgRsp {
    pub status: u32,
    pub commandid: u32,
    pub state: u32,
    pub timeout: u32,
    pub flag: u32,
    pub msglen: u32,
    pub msg: [u8; MAX_TX_MESSAGE_SIZE],
}
txmtr_response!(RcvdMsgRsp, message: msg);

// ---- context-only requests ----

macro_rules! ctx_request {
    ($(#[$doc:meta])* $name:ident, $id:expr, $resp:ty) => {
        $(#[$doc])*
        #[repr(C, packed)]
        #[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
        pub struct $name {
            pub commandid: u32,
            pub ctxhandle: u32,
        }

        impl $name {
            #[must_use]
            pub fn new(ctxhandle: u32) -> Self {
                Self {
                    commandid: $id.0,
                    ctxhandle,
                }
            }
        }

        impl Request for $name {
            const ID: CommandId = $id;
            type Resp = $resp;
        }
    };
}

ctx_request!(
    /// `hdcp_set_hw_key_req`: `0: commandid, 4: ctxhandle`.
    SetHwKeyReq,
    CommandId::TXMTR_SET_HW_KEY,
    SetHwKeyRsp
);
ctx_request!(
    /// `hdcp_send_timeout_req`: `0: commandid, 4: ctxhandle`.
    SendTimeoutReq,
    CommandId::TXMTR_SEND_MESSAGE_TIMEOUT,
    SendTimeoutRsp
);
ctx_request!(
    /// `hdcp_query_stream_type_req`: `0: commandid, 4: ctxhandle`.
    QueryStreamTypeReq,
    CommandId::TXMTR_QUERY_STREAM_TYPE,
    QueryStreamTypeRsp
);
ctx_request!(
    /// `hdcp_get_topology_req`: `0: commandid, 4: ctxhandle`.
    GetTopologyReq,
    CommandId::TXMTR_GET_TOPOLOGY_INFO,
    GetTopologyRsp
);

/// `hdcp_set_hw_key_rsp`: `0: status, 4: commandid`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct SetHwKeyRsp {
    pub status: u32,
    pub commandid: u32,
}
txmtr_response!(SetHwKeyRsp);

/// `hdcp_send_timeout_rsp`: `0: status, 4: commandid, 8: timeout,
/// 12: msglen, 16: message[129]`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct SendTimeoutRsp {
    pub status: u32,
    pub commandid: u32,
    pub timeout: u32,
    pub msglen: u32,
    pub message: [u8; MAX_TX_MESSAGE_SIZE],
}
txmtr_response!(SendTimeoutRsp, message: message);

/// `hdcp_query_stream_type_rsp`: `0: status, 4: commandid, 8: timeout,
/// 12: msglen, 16: msg[129]`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct QueryStreamTypeRsp {
    pub status: u32,
    pub commandid: u32,
    pub timeout: u32,
    pub msglen: u32,
    pub msg: [u8; MAX_TX_MESSAGE_SIZE],
}
txmtr_response!(QueryStreamTypeRsp, message: msg);

// ---- HDCP_TXMTR_UPDATE_SRM ----

/// `hdcp_update_srm_req`: `0: commandid, 4: ctxhandle, 8: srmoffset,
/// 12: srmlength`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct UpdateSrmReq {
    pub commandid: u32,
    pub ctxhandle: u32,
    pub srmoffset: u32,
    pub srmlength: u32,
}

impl UpdateSrmReq {
    #[must_use]
    pub fn new(ctxhandle: u32, srmoffset: u32, srmlength: u32) -> Self {
        Self {
            commandid: CommandId::TXMTR_UPDATE_SRM.0,
            ctxhandle,
            srmoffset,
            srmlength,
        }
    }
}

impl Request for UpdateSrmReq {
    const ID: CommandId = CommandId::TXMTR_UPDATE_SRM;
    type Resp = UpdateSrmRsp;
}

/// `hdcp_update_srm_rsp`: `0: status, 4: commandid`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct UpdateSrmRsp {
    pub status: u32,
    pub commandid: u32,
}
txmtr_response!(UpdateSrmRsp);

// ---- HDCP_TXMTR_GET_TOPOLOGY_INFO ----

/// `receiver_info`: naturally aligned on the secure side:
/// `0: rcvr_id[5], 5: pad[3], 8: elem_type, 12: hdcp_version`.
#[repr(C)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct ReceiverInfoRaw {
    pub rcvr_id: [u8; RCVR_ID_SIZE],
    pub _pad: [u8; 3],
    pub elem_type: u32,
    pub hdcp_version: u32,
}

/// `topology_info`: `0: num_rcvrs, 4: rcvinfo[32]`.
#[repr(C)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct TopologyInfoRaw {
    pub num_rcvrs: u32,
    pub rcvinfo: [ReceiverInfoRaw; MAX_TOPOLOGY_ELEMS],
}

/// `hdcp_get_topology_rsp`: `0: status, 4: commandid, 8: topologyinfo`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct GetTopologyRsp {
    pub status: u32,
    pub commandid: u32,
    pub topologyinfo: TopologyInfoRaw,
}
txmtr_response!(GetTopologyRsp);

// ---- HDCP 1.x application ----

/// `hdcp1_key_set_req`: `0: commandid`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct Hdcp1KeySetReq {
    pub commandid: u32,
}

impl Default for Hdcp1KeySetReq {
    fn default() -> Self {
        Self {
            commandid: CommandId::HDCP1_SET_KEY.0,
        }
    }
}

impl Request for Hdcp1KeySetReq {
    const ID: CommandId = CommandId::HDCP1_SET_KEY;
    type Resp = Hdcp1KeySetRsp;
}

/// `hdcp1_key_set_rsp`: `0: commandid, 4: ret, 8: ksv[8]`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct Hdcp1KeySetRsp {
    pub commandid: u32,
    pub ret: u32,
    pub ksv: [u8; HDCP1_AKSV_SIZE],
}
impl Response for Hdcp1KeySetRsp {}

/// `hdcp1_set_enc_req`: `0: commandid, 4: enable`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct Hdcp1SetEncReq {
    pub commandid: u32,
    pub enable: u32,
}

impl Hdcp1SetEncReq {
    #[must_use]
    pub fn new(enable: bool) -> Self {
        Self {
            commandid: CommandId::HDCP1_SET_ENC.0,
            enable: u32::from(enable),
        }
    }
}

impl Request for Hdcp1SetEncReq {
    const ID: CommandId = CommandId::HDCP1_SET_ENC;
    type Resp = Hdcp1SetEncRsp;
}

/// `hdcp1_set_enc_rsp`: `0: commandid, 4: ret`.
#[repr(C, packed)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq, Clone, Copy)]
pub struct Hdcp1SetEncRsp {
    pub commandid: u32,
    pub ret: u32,
}
impl Response for Hdcp1SetEncRsp {}

const _: () = assert!(size_of::<InitRsp>() == 20 + MAX_TX_MESSAGE_SIZE);
const _: () = assert!(size_of::<RcvdMsgReq>() == 12 + MAX_RX_MESSAGE_SIZE);
const _: () = assert!(size_of::<RcvdMsgRsp>() == 24 + MAX_TX_MESSAGE_SIZE);
const _: () = assert!(size_of::<SendTimeoutRsp>() == 16 + MAX_TX_MESSAGE_SIZE);
const _: () = assert!(size_of::<ReceiverInfoRaw>() == 16);
const _: () = assert!(size_of::<TopologyInfoRaw>() == 4 + 16 * MAX_TOPOLOGY_ELEMS);
const _: () = assert!(size_of::<GetTopologyRsp>() == 8 + 4 + 16 * MAX_TOPOLOGY_ELEMS);
const _: () = assert!(size_of::<Hdcp1KeySetRsp>() == 16);
