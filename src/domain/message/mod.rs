/*
HDCP 2.2 authentication message catalog.

Every HDCP 2.2 protocol message starts with a one byte message ID assigned by
the HDCP 2.2 interface specification. The session manager never decodes the
message bodies (the trusted application owns all cryptographic content); it
only needs:

* the ID → name mapping for diagnostics,
* the exact sizes of the few fixed-length messages it branches on
  (`LC_Init`, `SKE_Send_Eks`),
* the transmitter sub-states reported by the trusted application alongside a
  processed message,
* bounded, zeroizing byte buffers to carry messages between the sink and the
  secure channel.
*/

pub mod buffer;
pub mod errors;
pub mod message_id;
pub mod params;
pub mod substate;

pub use buffer::MessageBuf;
pub use errors::MessageError;
pub use message_id::{MessageId, message_name};
pub use params::*;
pub use substate::TxmtrSubstate;
