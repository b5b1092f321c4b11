//! Crate root for `hdcp-session`.
//!
//! An HDCP 2.2 transmitter session manager: it authenticates an HDMI
//! transmitter to a receiver or repeater topology by driving a trusted
//! application through an opaque secure channel, and tells the HDMI layer
//! what to send, when to receive and when the link is secure.
//!
//! High-level tree:
//! * `domain` – HDCP 2.2 message catalog, zeroizing message buffers, topology.
//! * `core::wire` – byte-exact secure-channel request / response layouts.
//! * `core::dispatch` – single-worker queue and the topology wait gate.
//! * `ports` – `SecureChannel` and `ClientNotifier` collaborator traits.
//! * `adapters` – validated HDCP 2.2 commands, HDCP 1.x key commands.
//! * `application::session` – the session state machine (`HdcpLibrary`).
//! * `test_support` – scripted fakes of both collaborators.
pub mod adapters;
pub mod application;
pub mod core;
pub mod domain;
pub mod ports;
#[doc(hidden)]
pub mod test_support;

pub use application::session::{
    HdcpLibrary, SessionConfig, SessionError, WakeupCommand, WakeupData,
};
pub use crate::core::dispatch::ExecutionMode;
pub use ports::client::{ClientNotification, ClientNotifier, NotificationCode, NotifyError};
pub use ports::secure_channel::{SecureChannel, SecureChannelError};
