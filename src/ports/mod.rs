pub mod client;
pub mod secure_channel;

pub use client::*;
pub use secure_channel::*;
