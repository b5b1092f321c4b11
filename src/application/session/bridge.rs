//! Delivery of client notifications.
//!
//! Steps never call the client directly. They collect notifications in an
//! [`Outbox`] and the session hands it to [`NotificationBridge::deliver`] once
//! every session lock is released, so a tethered client may call `wakeup`
//! again from inside its callback.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, warn};

use crate::ports::client::{ClientNotification, ClientNotifier};

/// Notifications produced by one step, in delivery order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outbox(Vec<ClientNotification>);

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: ClientNotification) {
        self.0.push(notification);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientNotification> {
        self.0.iter()
    }
}

impl IntoIterator for Outbox {
    type Item = ClientNotification;
    type IntoIter = std::vec::IntoIter<ClientNotification>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Wraps the client callback; a failing client never fails the session.
#[derive(Clone)]
pub struct NotificationBridge {
    client: Arc<dyn ClientNotifier>,
}

impl NotificationBridge {
    pub fn new(client: Arc<dyn ClientNotifier>) -> Self {
        Self { client }
    }

    /// Deliver one notification, logging a refusal.
    pub fn notify(&self, notification: &ClientNotification) {
        match self.client.notify(notification) {
            Ok(()) => debug!("{} delivered", notification.code()),
            Err(e) => error!("error sending {} to client: {e}", notification.code()),
        }
    }

    /// Deliver `outbox` in order.
    ///
    /// Forward notifications are dropped once `active` is false; a stop that
    /// raced the step wins. `StatusFailed` is always delivered.
    pub fn deliver(&self, outbox: Outbox, active: &AtomicBool) {
        for notification in outbox {
            if notification.is_forward() && !active.load(Ordering::SeqCst) {
                warn!("session stopped, dropping {}", notification.code());
                continue;
            }
            self.notify(&notification);
        }
    }
}
