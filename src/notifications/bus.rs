use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::Topic;

// ============================================================================
// Notification Bus Actor
// ============================================================================
//
// Owns the subscription table: which live session listens on which topic.
// Every mutation goes through the mailbox, so subscribe, publish and
// disconnect never race each other.
//
// A session is an unbounded outbox. Publishing to a topic with no live
// session is a silent no-op; a session whose receiver is gone is pruned the
// first time a publish finds it closed.
//
// ============================================================================

pub type SessionId = Uuid;

/// One event queued for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub event: &'static str,
    pub payload: serde_json::Value,
}

impl Delivery {
    /// Server-sent events wire format.
    pub fn to_sse_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.payload)
    }
}

struct SessionEntry {
    outbox: mpsc::UnboundedSender<Delivery>,
    topics: HashSet<Topic>,
}

#[derive(Default)]
pub struct NotificationBus {
    sessions: HashMap<SessionId, SessionEntry>,
    topics: HashMap<Topic, HashSet<SessionId>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn remove_session(&mut self, session_id: SessionId) {
        let Some(entry) = self.sessions.remove(&session_id) else {
            return;
        };
        for topic in entry.topics {
            if let Some(members) = self.topics.get_mut(&topic) {
                members.remove(&session_id);
                if members.is_empty() {
                    self.topics.remove(&topic);
                }
            }
        }
    }
}

impl Actor for NotificationBus {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("NotificationBus started");
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Add `topic` to a session, registering the session on first use.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub session_id: SessionId,
    pub topic: Topic,
    pub outbox: mpsc::UnboundedSender<Delivery>,
}

/// Drop a session and all of its subscriptions.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: SessionId,
}

#[derive(Message)]
#[rtype(result = "PublishReport")]
pub struct Publish {
    pub topic: Topic,
    pub delivery: Delivery,
}

#[derive(MessageResponse, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Sessions found closed and pruned during this publish.
    pub dropped: usize,
}

#[cfg(test)]
#[derive(Message)]
#[rtype(result = "usize")]
pub struct SubscriberCount {
    pub topic: Topic,
}

// ============================================================================
// Handlers
// ============================================================================

impl Handler<Subscribe> for NotificationBus {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _: &mut Self::Context) {
        let entry = self
            .sessions
            .entry(msg.session_id)
            .or_insert_with(|| SessionEntry {
                outbox: msg.outbox,
                topics: HashSet::new(),
            });
        entry.topics.insert(msg.topic.clone());

        tracing::debug!(session_id = %msg.session_id, topic = %msg.topic, "Session subscribed");
        self.topics.entry(msg.topic).or_default().insert(msg.session_id);
    }
}

impl Handler<Disconnect> for NotificationBus {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Self::Context) {
        tracing::debug!(session_id = %msg.session_id, "Session disconnected");
        self.remove_session(msg.session_id);
    }
}

impl Handler<Publish> for NotificationBus {
    type Result = PublishReport;

    fn handle(&mut self, msg: Publish, _: &mut Self::Context) -> PublishReport {
        let Some(members) = self.topics.get(&msg.topic) else {
            tracing::debug!(topic = %msg.topic, event = msg.delivery.event, "No live session for topic");
            return PublishReport::default();
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for session_id in members {
            match self.sessions.get(session_id) {
                Some(entry) if entry.outbox.send(msg.delivery.clone()).is_ok() => delivered += 1,
                _ => closed.push(*session_id),
            }
        }

        for session_id in &closed {
            self.remove_session(*session_id);
        }

        tracing::debug!(
            topic = %msg.topic,
            event = msg.delivery.event,
            delivered,
            pruned = closed.len(),
            "Published notification"
        );
        PublishReport { delivered, dropped: closed.len() }
    }
}

#[cfg(test)]
impl Handler<SubscriberCount> for NotificationBus {
    type Result = usize;

    fn handle(&mut self, msg: SubscriberCount, _: &mut Self::Context) -> usize {
        self.topics.get(&msg.topic).map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delivery() -> Delivery {
        Delivery { event: "newOrder", payload: json!({ "id": "o1" }) }
    }

    #[test]
    fn test_sse_frame_format() {
        assert_eq!(delivery().to_sse_frame(), "event: newOrder\ndata: {\"id\":\"o1\"}\n\n");
    }

    #[actix::test]
    async fn test_publish_reaches_every_session_on_topic() {
        let bus = NotificationBus::new().start();
        let topic = Topic::Seller("s1".into());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        bus.send(Subscribe { session_id: Uuid::new_v4(), topic: topic.clone(), outbox: tx1 }).await.unwrap();
        bus.send(Subscribe { session_id: Uuid::new_v4(), topic: topic.clone(), outbox: tx2 }).await.unwrap();

        let report = bus.send(Publish { topic, delivery: delivery() }).await.unwrap();

        assert_eq!(report, PublishReport { delivered: 2, dropped: 0 });
        assert_eq!(rx1.recv().await.unwrap(), delivery());
        assert_eq!(rx2.recv().await.unwrap(), delivery());
    }

    #[actix::test]
    async fn test_publish_order_preserved_per_topic() {
        let bus = NotificationBus::new().start();
        let topic = Topic::Buyer("b1".into());
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.send(Subscribe { session_id: Uuid::new_v4(), topic: topic.clone(), outbox: tx }).await.unwrap();

        for seq in 0..20 {
            bus.do_send(Publish {
                topic: topic.clone(),
                delivery: Delivery { event: "orderResponse", payload: json!({ "seq": seq }) },
            });
        }

        for seq in 0..20 {
            let delivery = rx.recv().await.unwrap();
            assert_eq!(delivery.payload["seq"], seq);
        }
        assert!(rx.try_recv().is_err());
    }

    #[actix::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = NotificationBus::new().start();
        let report = bus
            .send(Publish { topic: Topic::Buyer("nobody".into()), delivery: delivery() })
            .await
            .unwrap();
        assert_eq!(report, PublishReport::default());
    }

    #[actix::test]
    async fn test_topics_are_isolated() {
        let bus = NotificationBus::new().start();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.send(Subscribe { session_id: Uuid::new_v4(), topic: Topic::Seller("s1".into()), outbox: tx })
            .await
            .unwrap();

        let report = bus
            .send(Publish { topic: Topic::Seller("s2".into()), delivery: delivery() })
            .await
            .unwrap();

        assert_eq!(report.delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[actix::test]
    async fn test_closed_session_is_pruned_on_publish() {
        let bus = NotificationBus::new().start();
        let topic = Topic::Buyer("b1".into());
        let (tx, rx) = mpsc::unbounded_channel();
        bus.send(Subscribe { session_id: Uuid::new_v4(), topic: topic.clone(), outbox: tx }).await.unwrap();
        drop(rx);

        let report = bus.send(Publish { topic: topic.clone(), delivery: delivery() }).await.unwrap();

        assert_eq!(report, PublishReport { delivered: 0, dropped: 1 });
        assert_eq!(bus.send(SubscriberCount { topic }).await.unwrap(), 0);
    }

    #[actix::test]
    async fn test_disconnect_removes_all_subscriptions() {
        let bus = NotificationBus::new().start();
        let session_id = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        for topic in [Topic::Buyer("b1".into()), Topic::Seller("s1".into())] {
            bus.send(Subscribe { session_id, topic, outbox: tx.clone() }).await.unwrap();
        }
        assert_eq!(bus.send(SubscriberCount { topic: Topic::Seller("s1".into()) }).await.unwrap(), 1);

        bus.send(Disconnect { session_id }).await.unwrap();

        assert_eq!(bus.send(SubscriberCount { topic: Topic::Buyer("b1".into()) }).await.unwrap(), 0);
        assert_eq!(bus.send(SubscriberCount { topic: Topic::Seller("s1".into()) }).await.unwrap(), 0);
    }
}
