//! Event bus implementation.
//!
//! Provides the EventBus struct that fans every published event out to the
//! full subscriber list.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::events::DeviceEvent;

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Type alias for event handler functions
type EventHandler = Box<dyn Fn(&DeviceEvent) + Send + Sync>;

/// Event bus for device event distribution
///
/// Every event is delivered identically to every registered handler, on the
/// publishing thread. Handlers should return quickly to avoid stalling the
/// device session.
#[derive(Default)]
pub struct EventBus {
    /// Registered handlers
    handlers: Arc<RwLock<HashMap<SubscriptionId, EventHandler>>>,
}

impl EventBus {
    /// Create a new, empty event bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of handlers the event was delivered to.
    pub fn publish(&self, event: &DeviceEvent) -> usize {
        let handlers = self.handlers.read();
        for handler in handlers.values() {
            handler(event);
        }
        handlers.len()
    }

    /// Subscribe to all device events
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, Box::new(handler));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Get the number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::ConsoleMode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn console_event(message: &str) -> DeviceEvent {
        DeviceEvent::ConsoleDisplay {
            mode: ConsoleMode::Response,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();

        let id = bus.subscribe(|_| {});
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);

        // Double unsubscribe should return false
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_event_delivery() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let _id = bus.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        let delivered = bus.publish(&console_event("ok"));
        assert_eq!(delivered, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_uniform_broadcast() {
        let bus = EventBus::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        bus.subscribe(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = second.clone();
        bus.subscribe(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&console_event("-> RESET <-"));
        bus.publish(&console_event("ALARM:1"));

        // Every subscriber sees every event; there is no filtering.
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }
}
