//! Domain events and the in-process event bus
//!
//! Every state change in a tracking link's lifecycle is announced as a
//! [`DeliveryEvent`] on the [`EventBus`]. Interested parties (the outbound
//! notification publisher, tests) subscribe to the bus; emitters never wait
//! on subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle events for delivered training content
///
/// Field values mirror what the notification feed carries downstream:
/// `tracking_link_id` is the public link token (not the row id), and
/// numeric ids are the internal recipient/content row ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DeliveryEvent {
    /// Recipient opened their launch link for the first time (or again)
    ContentViewed {
        recipient_id: i64,
        content_id: i64,
        /// Public tracking-link token
        tracking_link_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recipient interacted with an annotated element inside the content
    Interaction {
        recipient_id: i64,
        content_id: i64,
        tracking_link_id: String,
        /// Topic tag attached to the element that fired
        topic: String,
        /// Whether the interaction counts as a success for that topic
        success: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recipient finished the content and reported a score
    ContentCompleted {
        recipient_id: i64,
        content_id: i64,
        tracking_link_id: String,
        /// Final score, 0-100
        score: i64,
        /// Raw interaction list as reported by the tracking runtime
        interactions: serde_json::Value,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DeliveryEvent {
    /// Wire name of the event, as carried in the `event_type` attribute
    pub fn event_type(&self) -> &'static str {
        match self {
            DeliveryEvent::ContentViewed { .. } => "content_viewed",
            DeliveryEvent::Interaction { .. } => "interaction",
            DeliveryEvent::ContentCompleted { .. } => "content_completed",
        }
    }

    /// Human-readable subject line for the published notification
    pub fn subject(&self) -> &'static str {
        match self {
            DeliveryEvent::ContentViewed { .. } => "Content Viewed",
            DeliveryEvent::Interaction { .. } => "Content Interaction",
            DeliveryEvent::ContentCompleted { .. } => "Content Completed",
        }
    }

    /// Public tracking-link token the event refers to
    pub fn tracking_link_id(&self) -> &str {
        match self {
            DeliveryEvent::ContentViewed { tracking_link_id, .. }
            | DeliveryEvent::Interaction { tracking_link_id, .. }
            | DeliveryEvent::ContentCompleted { tracking_link_id, .. } => tracking_link_id,
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`, so publishing never blocks and slow
/// subscribers lag rather than stall producers. Clone freely; all clones
/// share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DeliveryEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Events beyond the capacity displace the oldest buffered ones; lagging
    /// subscribers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` when at least one subscriber exists,
    /// `Err` when nobody is listening.
    pub fn emit(
        &self,
        event: DeliveryEvent,
    ) -> Result<usize, broadcast::error::SendError<DeliveryEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// Lifecycle recording must not fail because the publisher bridge is
    /// not running, so callers on the request path use this form.
    pub fn emit_lossy(&self, event: DeliveryEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
