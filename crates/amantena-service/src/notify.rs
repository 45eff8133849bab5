//! Broadcast event bus.
//!
//! Services publish domain events after their transaction commits; a
//! socket gateway (outside this repository) and tests subscribe. Delivery
//! is fire-and-forget: publishing never blocks and never fails the
//! operation that produced the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A sale was recorded.
pub const TOPIC_SALE_CREATED: &str = "sale-created";

/// A product's stock or fields changed.
pub const TOPIC_PRODUCT_UPDATED: &str = "product-updated";

/// A product crossed its reorder threshold.
pub const TOPIC_LOW_STOCK_ALERT: &str = "low-stock-alert";

/// A domain event with a JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// Fan-out bus over a tokio broadcast channel.
///
/// Cloneable; every clone publishes into the same channel. Slow
/// subscribers that fall more than the channel capacity behind lose the
/// oldest events (broadcast semantics), which is acceptable for
/// advisory notifications.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus { sender }
    }

    /// Publishes an event. Fire-and-forget: with no subscribers the event
    /// is dropped and logged at debug.
    pub fn publish(&self, topic: &str, payload: serde_json::Value) {
        let event = Event {
            topic: topic.to_string(),
            payload,
            at: Utc::now(),
        };

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(topic = %topic, receivers = %receivers, "Event published");
            }
            Err(_) => {
                debug!(topic = %topic, "Event dropped (no subscribers)");
            }
        }
    }

    /// Subscribes to all events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(TOPIC_SALE_CREATED, json!({"saleId": "s-1"}));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, TOPIC_SALE_CREATED);
        assert_eq!(event.payload["saleId"], "s-1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::default();
        // Must not panic or block
        bus.publish(TOPIC_LOW_STOCK_ALERT, json!({}));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
