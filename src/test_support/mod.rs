//! Fakes for the two collaborator ports, shared by unit and integration tests.
//!
//! `ScriptedChannel` stands in for the trusted application: it answers each
//! command with the next queued [`Reply`] (or an echoing success when the
//! script is exhausted) and records every request. `RecordingClient` records
//! every notification the session delivers.
pub mod recording_client;
pub mod scripted_channel;

pub use recording_client::RecordingClient;
pub use scripted_channel::{Reply, ScriptedChannel, SentCommand};

/// Install `env_logger` once for the test binary.
#[cfg(test)]
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
