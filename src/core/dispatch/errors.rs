use thiserror::Error;

/// Failures of the dispatch layer itself (never of the work it runs).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("failed to spawn worker {name}: {reason}")]
    Spawn { name: String, reason: String },

    #[error("work queue closed")]
    Closed,

    #[error("worker {0} panicked")]
    WorkerPanicked(String),
}
