// ============================================================================
// Notifications - topic fan-out to live sessions
// ============================================================================
//
// - Topic            - buyer:<id> / seller:<id>
// - NotificationBus  - actor owning the subscription table
// - SessionStream    - one connected client, as an SSE byte stream
// - Notifier         - what the workflow depends on (publish only)
//
// Delivery is best effort: nothing is persisted or replayed.
//
// ============================================================================

mod bus;
mod session;
mod topic;

use actix::Addr;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::order::OrderNotification;
use crate::metrics::Metrics;

use bus::{Delivery, Publish, Subscribe};
#[cfg(test)]
use bus::SubscriberCount;

pub use bus::NotificationBus;
use session::HEARTBEAT_INTERVAL;
pub use session::SessionStream;
pub use topic::Topic;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Notification bus unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode notification: {0}")]
    Encode(String),
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver to every live session on `topic`. Returns how many got it;
    /// zero is not an error.
    async fn publish(&self, topic: &Topic, notification: &OrderNotification) -> Result<usize, BusError>;
}

/// Cloneable front for the bus actor.
#[derive(Clone)]
pub struct BusHandle {
    addr: Addr<NotificationBus>,
    metrics: Arc<Metrics>,
}

impl BusHandle {
    pub fn new(addr: Addr<NotificationBus>, metrics: Arc<Metrics>) -> Self {
        Self { addr, metrics }
    }

    /// Open a session subscribed to `topics`.
    pub async fn open_session(&self, topics: Vec<Topic>) -> Result<SessionStream, BusError> {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        // Build the stream first so an early failure still disconnects.
        let stream = SessionStream::new(session_id, rx, self.addr.clone(), HEARTBEAT_INTERVAL);
        for topic in topics {
            self.addr
                .send(Subscribe { session_id, topic, outbox: tx.clone() })
                .await
                .map_err(|e| BusError::Unavailable(e.to_string()))?;
        }

        tracing::info!(session_id = %session_id, "Session opened");
        Ok(stream)
    }

    #[cfg(test)]
    pub async fn subscriber_count(&self, topic: Topic) -> Result<usize, BusError> {
        self.addr
            .send(SubscriberCount { topic })
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl Notifier for BusHandle {
    async fn publish(&self, topic: &Topic, notification: &OrderNotification) -> Result<usize, BusError> {
        let event = notification.event_name();
        let payload = notification
            .payload()
            .map_err(|e| BusError::Encode(e.to_string()))?;

        let report = self
            .addr
            .send(Publish {
                topic: topic.clone(),
                delivery: Delivery { event, payload },
            })
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;

        self.metrics.record_notification(event, report.dropped);
        Ok(report.delivered)
    }
}
