pub mod hdcp1;
pub mod secure_channel;

pub use hdcp1::{Hdcp1Error, Hdcp1Keys};
pub use secure_channel::{ProcessedMessage, TimeoutReply, TxMessage, TxmtrChannel};
