use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use log::{debug, error};

use super::errors::DispatchError;

/// Unit of work run on the worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Snapshot of worker activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStatus {
    /// Jobs queued or running.
    pub pending: usize,
    /// A job is running right now.
    pub executing: bool,
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    executing: AtomicBool,
}

/// Single-thread FIFO work queue.
///
/// Jobs run one at a time in submission order. A panicking job is logged and
/// the worker keeps serving the queue. `shutdown` drops the sender and joins
/// the worker (unless called from the worker itself, in which case the thread
/// finishes on its own once the queue drains).
pub struct WorkQueue {
    name: String,
    tx: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    worker: ThreadId,
    counters: Arc<Counters>,
}

impl WorkQueue {
    /// Spawn the worker thread named `name`.
    ///
    /// # Errors
    /// * `DispatchError::Spawn` if the OS refuses the thread.
    pub fn spawn(name: &str) -> Result<Self, DispatchError> {
        let (tx, rx) = mpsc::channel::<Job>();
        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);
        let thread_name = name.to_owned();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                for job in rx {
                    worker_counters.executing.store(true, Ordering::SeqCst);
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("{thread_name}: job panicked");
                    }
                    worker_counters.executing.store(false, Ordering::SeqCst);
                    worker_counters.pending.fetch_sub(1, Ordering::SeqCst);
                }
                debug!("{thread_name}: queue closed, worker exiting");
            })
            .map_err(|e| DispatchError::Spawn {
                name: name.to_owned(),
                reason: e.to_string(),
            })?;
        let worker = handle.thread().id();
        Ok(Self {
            name: name.to_owned(),
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            worker,
            counters,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `job` behind everything already submitted.
    ///
    /// # Errors
    /// * `DispatchError::Closed` after `shutdown` or if the worker is gone.
    pub fn enqueue(&self, job: Job) -> Result<(), DispatchError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = tx.as_ref() else {
            return Err(DispatchError::Closed);
        };
        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        tx.send(job).map_err(|_| {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            DispatchError::Closed
        })
    }

    /// Jobs queued or running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            pending: self.pending(),
            executing: self.counters.executing.load(Ordering::SeqCst),
        }
    }

    /// True when called from this queue's worker thread.
    #[must_use]
    pub fn on_worker(&self) -> bool {
        thread::current().id() == self.worker
    }

    /// Close the queue and wait for queued jobs to finish.
    ///
    /// Idempotent.
    ///
    /// # Errors
    /// * `DispatchError::WorkerPanicked` if the worker thread itself died.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(h) if !self.on_worker() => h
                .join()
                .map_err(|_| DispatchError::WorkerPanicked(self.name.clone())),
            _ => Ok(()),
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("{}: {e}", self.name);
        }
    }
}
