use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::ports::client::{ClientNotification, ClientNotifier, NotificationCode, NotifyError};

#[derive(Debug, Default)]
struct Log {
    seen: Vec<ClientNotification>,
    reject: bool,
}

/// Records every notification; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    inner: Arc<(Mutex<Log>, Condvar)>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every later notification with an error (still recorded).
    pub fn reject_all(&self) {
        self.lock().reject = true;
    }

    pub fn notifications(&self) -> Vec<ClientNotification> {
        self.lock().seen.clone()
    }

    pub fn codes(&self) -> Vec<NotificationCode> {
        self.lock().seen.iter().map(ClientNotification::code).collect()
    }

    pub fn count(&self, code: NotificationCode) -> usize {
        self.lock().seen.iter().filter(|n| n.code() == code).count()
    }

    pub fn clear(&self) {
        self.lock().seen.clear();
    }

    /// Wait until at least `n` notifications were recorded.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let (lock, cv) = &*self.inner;
        let log = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (log, _) = cv
            .wait_timeout_while(log, timeout, |l| l.seen.len() < n)
            .unwrap_or_else(PoisonError::into_inner);
        log.seen.len() >= n
    }

    /// Wait until a notification with `code` was recorded.
    pub fn wait_for_code(&self, code: NotificationCode, timeout: Duration) -> bool {
        let (lock, cv) = &*self.inner;
        let log = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (log, _) = cv
            .wait_timeout_while(log, timeout, |l| !l.seen.iter().any(|n| n.code() == code))
            .unwrap_or_else(PoisonError::into_inner);
        log.seen.iter().any(|n| n.code() == code)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Log> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClientNotifier for RecordingClient {
    fn notify(&self, notification: &ClientNotification) -> Result<(), NotifyError> {
        let (lock, cv) = &*self.inner;
        let mut log = lock.lock().unwrap_or_else(PoisonError::into_inner);
        log.seen.push(notification.clone());
        cv.notify_all();
        if log.reject {
            Err(NotifyError::Rejected(notification.code().to_string()))
        } else {
            Ok(())
        }
    }
}
