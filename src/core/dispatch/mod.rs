//! Work dispatch for protocol steps.
//!
//! A session owns exactly one [`WorkQueue`] (one dedicated worker thread,
//! strict FIFO) and one [`TopologyGate`]. In [`ExecutionMode::Tethered`] the
//! session runs steps on the caller and only uses the worker for the topology
//! wait; in [`ExecutionMode::Threaded`] every step goes through the queue.

pub mod errors;
pub mod gate;
pub mod queue;

pub use errors::DispatchError;
pub use gate::{GateTicket, TopologyGate};
pub use queue::{Job, WorkQueue, WorkerStatus};

use core::fmt;

use serde::{Deserialize, Serialize};

/// Where protocol steps execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Step completes on the caller before `wakeup` returns.
    Tethered,
    /// Step is queued on the session's worker thread.
    #[default]
    Threaded,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Tethered => f.write_str("tethered"),
            ExecutionMode::Threaded => f.write_str("threaded"),
        }
    }
}
