//! HDCP 2.2 transmitter session.
//!
//! [`HdcpLibrary`] is the entry point: `register` creates a session with its
//! worker, `wakeup` feeds HDMI events into it, and the session answers with
//! [`ClientNotification`](crate::ports::client::ClientNotification)s.
//!
//! Every event maps to one protocol step (start, message sent, message
//! received, timeout, stream query, teardown). Steps run strictly one at a
//! time, either on the caller (tethered) or on the worker (threaded); failures
//! inside a step never reach the caller and end in teardown instead.
pub mod bridge;
pub mod config;
pub mod errors;
pub mod library;
#[cfg(test)]
mod session_tests;
pub mod session_machine;
pub mod session_types;

pub use bridge::{NotificationBridge, Outbox};
pub use config::*;
pub use errors::*;
pub use library::HdcpLibrary;
pub use session_machine::SessionSnapshot;
pub use session_types::*;
