//! Catalog events for the notification layer.
//!
//! Publishing never blocks the caller and never reports delivery. Handlers run
//! on the consumer side of the channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events emitted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    UserCreated {
        user_id: Uuid,
        username: String,
        email: String,
        occurred_at: DateTime<Utc>,
    },
    PurchaseCompleted {
        purchase_id: Uuid,
        user_id: Uuid,
        prompt_id: Uuid,
        transaction_id: String,
        price_paid_cents: i64,
        tickets_spent: i32,
        occurred_at: DateTime<Utc>,
    },
}

impl CatalogEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CatalogEvent::UserCreated { .. } => "user_created",
            CatalogEvent::PurchaseCompleted { .. } => "purchase_completed",
        }
    }
}

/// Result of handing an event to a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Queued,
    /// Queue full or closed; the event was discarded.
    Dropped,
}

/// Fire-and-forget sink for catalog events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: CatalogEvent) -> PublishOutcome;
}

/// Publisher that only logs. Used when no consumer is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher;

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: CatalogEvent) -> PublishOutcome {
        tracing::info!(event = %event.name(), payload = ?event, "Catalog event");
        PublishOutcome::Queued
    }
}

/// Publisher backed by a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::Sender<CatalogEvent>,
}

impl ChannelEventPublisher {
    /// Creates the publisher and the receiver a dispatcher task should drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CatalogEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl EventPublisher for ChannelEventPublisher {
    fn publish(&self, event: CatalogEvent) -> PublishOutcome {
        let name = event.name();
        match self.sender.try_send(event) {
            Ok(()) => PublishOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(event = %name, "Event queue full, dropping event");
                PublishOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(event = %name, "Event queue closed, dropping event");
                PublishOutcome::Dropped
            }
        }
    }
}

/// Consumer of catalog events (welcome mail, receipts).
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &CatalogEvent) -> Result<(), String>;
}

/// Handler for development and testing. Logs what would be sent.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventHandler {
    pub simulate_failure: bool,
}

impl LoggingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle(&self, event: &CatalogEvent) -> Result<(), String> {
        if self.simulate_failure {
            return Err("Simulated failure".to_string());
        }

        match event {
            CatalogEvent::UserCreated { user_id, email, .. } => {
                tracing::info!(user_id = %user_id, email = %email, "Would send welcome email");
            }
            CatalogEvent::PurchaseCompleted {
                user_id,
                transaction_id,
                price_paid_cents,
                ..
            } => {
                tracing::info!(
                    user_id = %user_id,
                    transaction_id = %transaction_id,
                    price_paid_cents = price_paid_cents,
                    "Would send purchase receipt"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_created() -> CatalogEvent {
        CatalogEvent::UserCreated {
            user_id: Uuid::nil(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(user_created()).unwrap();
        assert_eq!(json["type"], "user_created");
        assert_eq!(json["username"], "alice");
    }

    #[tokio::test]
    async fn test_channel_publisher_delivers() {
        let (publisher, mut rx) = ChannelEventPublisher::channel(4);
        assert_eq!(publisher.publish(user_created()), PublishOutcome::Queued);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.name(), "user_created");
    }

    #[test]
    fn test_channel_publisher_drops_when_full() {
        let (publisher, _rx) = ChannelEventPublisher::channel(1);
        assert_eq!(publisher.publish(user_created()), PublishOutcome::Queued);
        assert_eq!(publisher.publish(user_created()), PublishOutcome::Dropped);
    }

    #[test]
    fn test_channel_publisher_drops_when_closed() {
        let (publisher, rx) = ChannelEventPublisher::channel(1);
        drop(rx);
        assert_eq!(publisher.publish(user_created()), PublishOutcome::Dropped);
    }

    #[tokio::test]
    async fn test_logging_handler() {
        assert!(LoggingEventHandler::new().handle(&user_created()).await.is_ok());
        assert!(LoggingEventHandler::failing()
            .handle(&user_created())
            .await
            .is_err());
    }
}
