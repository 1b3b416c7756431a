// ============================================================================
// Order Store - Persistence Layer
// ============================================================================
//
// Single source of truth for order state. The only concurrency primitive the
// rest of the system relies on is `transition`: a conditional update that
// swaps `status` only when it still equals the caller's expectation.
//
// Implementations:
// - ScyllaOrderStore   - lightweight transactions (UPDATE ... IF status = ?)
// - InMemoryOrderStore - compare-and-set under one write lock (tests, dev)
//
// ============================================================================

mod memory;
mod scylla;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderDraft, OrderError, OrderStatus};

pub use memory::InMemoryOrderStore;
pub use scylla::ScyllaOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] OrderError),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {order_id} is {current}")]
    Conflict { order_id: Uuid, current: OrderStatus },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Assign identity and timestamps, persist as `pending`.
    async fn create(&self, draft: OrderDraft) -> Result<Order, StoreError>;

    async fn get(&self, order_id: Uuid) -> Result<Order, StoreError>;

    /// Newest first.
    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Atomically move `order_id` from `expected` to `next`. When `seller_id`
    /// is given it is recorded together with `responded_at = now`.
    ///
    /// Fails with `Conflict` when the stored status is not `expected`.
    async fn transition(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        seller_id: Option<&str>,
    ) -> Result<Order, StoreError>;
}
