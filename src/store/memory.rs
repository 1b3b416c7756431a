use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderDraft, OrderError, OrderStatus};

struct StoredOrder {
    // insertion sequence, tie-breaker for equal timestamps
    seq: u64,
    order: Order,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    orders: HashMap<Uuid, StoredOrder>,
}

/// Process-local order store. `transition` reads and writes under the same
/// write guard, so two callers can never both observe `pending`.
#[derive(Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<Inner>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut entries: Vec<&StoredOrder>) -> Vec<Order> {
        entries.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        entries.into_iter().map(|e| e.order.clone()).collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        draft.validate()?;
        let order = Order::from_draft(draft, Utc::now());

        let mut inner = self.inner.write().await;
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.orders.insert(order.id, StoredOrder { seq, order: order.clone() });

        tracing::debug!(order_id = %order.id, buyer_id = %order.buyer_id, "Stored order in memory");
        Ok(order)
    }

    async fn get(&self, order_id: Uuid) -> Result<Order, StoreError> {
        self.inner
            .read()
            .await
            .orders
            .get(&order_id)
            .map(|e| e.order.clone())
            .ok_or(StoreError::NotFound(order_id))
    }

    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().await;
        let entries = inner
            .orders
            .values()
            .filter(|e| e.order.buyer_id == buyer_id)
            .collect();
        Ok(Self::newest_first(entries))
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().await;
        Ok(Self::newest_first(inner.orders.values().collect()))
    }

    async fn transition(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        seller_id: Option<&str>,
    ) -> Result<Order, StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::NotFound(order_id))?;

        // Work on a copy so a rejected transition leaves the record untouched
        let mut updated = entry.order.clone();
        match updated.transition(expected, next, seller_id, Utc::now()) {
            Ok(()) => {
                entry.order = updated.clone();
                Ok(updated)
            }
            Err(OrderError::StatusMismatch { current, .. }) => {
                Err(StoreError::Conflict { order_id, current })
            }
            Err(other) => Err(StoreError::Validation(other)),
        }
    }
}
