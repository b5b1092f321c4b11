/// ---- Wire size constants (HDCP 2.2 transmitter parameter set) ----
/// Buffer bounds are shared with the trusted application and must not change
/// without a matching change on the secure side.
pub const MAX_TX_MESSAGE_SIZE: usize = 129;
pub const MAX_RX_MESSAGE_SIZE: usize = 534;
pub const MAX_TOPOLOGY_ELEMS: usize = 32;
pub const RCVR_ID_SIZE: usize = 5;
pub const MAX_RCVR_IDS_ALLOWED_IN_LIST: usize = 31;
pub const MAX_RCVR_ID_LIST_SIZE: usize = RCVR_ID_SIZE * MAX_RCVR_IDS_ALLOWED_IN_LIST;
pub const HDCP1_AKSV_SIZE: usize = 8;

pub(crate) const MESSAGE_ID_SIZE: usize = 1;
pub(crate) const BITS_64_IN_BYTES: usize = 8;
pub(crate) const BITS_128_IN_BYTES: usize = 16;

/// `LC_Init`: message ID + 64-bit `r_n`.
pub const LC_INIT_MESSAGE_SIZE: usize = MESSAGE_ID_SIZE + BITS_64_IN_BYTES;
/// `SKE_Send_Eks`: message ID + 128-bit `Edkey(ks)` + 64-bit `r_iv`.
pub const SKE_SEND_EKS_MESSAGE_SIZE: usize =
    MESSAGE_ID_SIZE + BITS_128_IN_BYTES + BITS_64_IN_BYTES;

const _: () = assert!(LC_INIT_MESSAGE_SIZE == 9);
const _: () = assert!(SKE_SEND_EKS_MESSAGE_SIZE == 25);
