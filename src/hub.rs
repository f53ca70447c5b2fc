//! Subscription hub
//!
//! Decouples the push transport from its consumers. Listeners register a
//! callback and get back a [`Subscription`] handle; dispatch happens in
//! registration order, synchronously on the task that received the frame.
//! A listener removed during dispatch receives no further events, and a
//! panicking listener never prevents delivery to the rest.

use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::types::NotificationRecord;

type NotificationCallback = Arc<dyn Fn(&NotificationRecord) + Send + Sync>;
type CountCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Which event channel a subscription belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Notification,
    UnreadCount,
}

/// Fan-out registry for push events
///
/// Listener ids are monotonic, so dispatching in ascending id order is
/// dispatching in registration order.
#[derive(Default)]
pub struct SubscriptionHub {
    notification_listeners: DashMap<u64, NotificationCallback>,
    count_listeners: DashMap<u64, CountCallback>,
    next_id: AtomicU64,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked once per inbound notification
    pub fn subscribe_notifications(
        self: &Arc<Self>,
        callback: impl Fn(&NotificationRecord) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.notification_listeners.insert(id, Arc::new(callback));
        debug!(listener_id = id, "notification listener registered");
        Subscription {
            id,
            channel: Channel::Notification,
            hub: Arc::downgrade(self),
        }
    }

    /// Register a callback invoked once per unread-count change
    pub fn subscribe_unread_count(
        self: &Arc<Self>,
        callback: impl Fn(u64) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.count_listeners.insert(id, Arc::new(callback));
        debug!(listener_id = id, "unread-count listener registered");
        Subscription {
            id,
            channel: Channel::UnreadCount,
            hub: Arc::downgrade(self),
        }
    }

    /// Deliver a notification to every registered listener
    pub fn publish_notification(&self, record: &NotificationRecord) {
        let mut ids: Vec<u64> = self
            .notification_listeners
            .iter()
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();

        for id in ids {
            // Re-check presence so an unsubscribe during this dispatch
            // suppresses delivery; the guard is dropped before the call so
            // a listener may unsubscribe itself.
            let callback = self
                .notification_listeners
                .get(&id)
                .map(|entry| Arc::clone(entry.value()));
            let Some(callback) = callback else { continue };

            if catch_unwind(AssertUnwindSafe(|| callback(record))).is_err() {
                warn!(listener_id = id, "notification listener panicked");
            }
        }
    }

    /// Deliver an unread-count change to every registered listener
    pub fn publish_unread_count(&self, count: u64) {
        let mut ids: Vec<u64> = self
            .count_listeners
            .iter()
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();

        for id in ids {
            let callback = self
                .count_listeners
                .get(&id)
                .map(|entry| Arc::clone(entry.value()));
            let Some(callback) = callback else { continue };

            if catch_unwind(AssertUnwindSafe(|| callback(count))).is_err() {
                warn!(listener_id = id, "unread-count listener panicked");
            }
        }
    }

    /// Number of registered notification listeners
    pub fn notification_listener_count(&self) -> usize {
        self.notification_listeners.len()
    }

    /// Number of registered unread-count listeners
    pub fn count_listener_count(&self) -> usize {
        self.count_listeners.len()
    }

    fn remove(&self, channel: Channel, id: u64) {
        let removed = match channel {
            Channel::Notification => self.notification_listeners.remove(&id).is_some(),
            Channel::UnreadCount => self.count_listeners.remove(&id).is_some(),
        };
        if removed {
            debug!(listener_id = id, "listener removed");
        }
    }
}

/// Handle for one registration
///
/// `unsubscribe` is idempotent. Dropping the handle does NOT remove the
/// registration; the listener stays live for the session unless explicitly
/// unsubscribed.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    channel: Channel,
    hub: Weak<SubscriptionHub>,
}

impl Subscription {
    /// Remove exactly this registration; calling again is a no-op
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.channel, self.id);
        }
    }
}
