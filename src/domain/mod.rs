pub mod message;
pub mod topology;

pub use message::*;
pub use topology::{ReceiverInfo, Topology};
