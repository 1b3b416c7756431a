// ============================================================================
// Order Workflow - dispatch state machine
// ============================================================================
//
// placeOrder:     buyer -> geo match -> persist pending -> fan out newOrder
// respondToOrder: seller -> pending => accepted|rejected (compare-and-set)
//                 -> orderResponse to the buyer
//
// Holds no state of its own. The only concurrency guard is the store's
// conditional transition; nothing here locks.
//
// ============================================================================

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthError, Principal, PrincipalType};
use crate::domain::order::{
    Order, OrderError, OrderNotification, OrderResponse, OrderStatus, PlaceOrder, RespondToOrder,
};
use crate::domain::seller::NearbySeller;
use crate::geo::{GeoError, GeoIndex};
use crate::metrics::Metrics;
use crate::notifications::{Notifier, Topic};
use crate::store::{OrderStore, StoreError};


#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Lookup of an order that does not exist.
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    /// A response aimed at an order that does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order {order_id} is already {current_status}")]
    AlreadyResolved {
        order_id: Uuid,
        current_status: OrderStatus,
    },

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<OrderError> for WorkflowError {
    fn from(err: OrderError) -> Self {
        WorkflowError::InvalidInput(err.to_string())
    }
}

impl From<AuthError> for WorkflowError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized(message) => WorkflowError::Unauthorized(message),
            AuthError::Forbidden(message) => WorkflowError::Forbidden(message),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => e.into(),
            StoreError::NotFound(id) => WorkflowError::OrderNotFound(id),
            other => WorkflowError::Store(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub matched_seller_count: usize,
}

pub struct OrderWorkflow {
    store: Arc<dyn OrderStore>,
    geo: Arc<dyn GeoIndex>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,
    match_radius_meters: f64,
}

impl OrderWorkflow {
    pub fn new(
        store: Arc<dyn OrderStore>,
        geo: Arc<dyn GeoIndex>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<Metrics>,
        match_radius_meters: f64,
    ) -> Self {
        Self {
            store,
            geo,
            notifier,
            metrics,
            match_radius_meters,
        }
    }

    /// Persist a new pending order and tell every nearby accepting seller.
    ///
    /// Zero matches is a success: the order is placed, just unmatched.
    pub async fn place_order(
        &self,
        principal: &Principal,
        command: PlaceOrder,
    ) -> Result<PlacedOrder, WorkflowError> {
        principal.require(PrincipalType::Buyer)?;

        let draft = command.into_draft(&principal.principal_id)?;
        let sellers = self
            .geo
            .find_nearby(draft.location.point, self.match_radius_meters)
            .await?;

        let order = self.store.create(draft).await?;
        self.fan_out_new_order(&order, &sellers);
        self.metrics.record_order_placed(sellers.len());

        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            matched_sellers = sellers.len(),
            "✅ Order placed"
        );

        Ok(PlacedOrder {
            order,
            matched_seller_count: sellers.len(),
        })
    }

    /// One task per seller, so an unreachable seller never holds up the rest.
    fn fan_out_new_order(&self, order: &Order, sellers: &[NearbySeller]) {
        let notification = Arc::new(OrderNotification::NewOrder(order.clone()));

        for nearby in sellers {
            let notifier = self.notifier.clone();
            let notification = notification.clone();
            let topic = Topic::Seller(nearby.seller.id.clone());
            let order_id = order.id;

            tokio::spawn(async move {
                match notifier.publish(&topic, &notification).await {
                    Ok(delivered) => {
                        tracing::debug!(order_id = %order_id, topic = %topic, delivered, "newOrder sent");
                    }
                    Err(e) => {
                        tracing::warn!(order_id = %order_id, topic = %topic, error = %e, "Failed to notify seller, skipping");
                    }
                }
            });
        }
    }

    /// Resolve a pending order on behalf of a seller. Exactly one response
    /// per order wins; everyone after gets `AlreadyResolved`.
    pub async fn respond_to_order(
        &self,
        principal: &Principal,
        order_id: Uuid,
        request: &RespondToOrder,
    ) -> Result<Order, WorkflowError> {
        principal.require(PrincipalType::Seller)?;

        let action = request.action()?;
        let next = action.target_status();
        let seller_id = principal.principal_id.as_str();

        let order = match self
            .store
            .transition(order_id, OrderStatus::Pending, next, Some(seller_id))
            .await
        {
            Ok(order) => order,
            Err(StoreError::Conflict { current, .. }) => {
                self.metrics.record_response("already_resolved");
                tracing::info!(
                    order_id = %order_id,
                    seller_id = %seller_id,
                    current_status = %current,
                    "Order already resolved, response ignored"
                );
                return Err(WorkflowError::AlreadyResolved {
                    order_id,
                    current_status: current,
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.metrics.record_response(next.as_str());
        tracing::info!(order_id = %order_id, seller_id = %seller_id, status = %next, "✅ Seller response recorded");

        let response = OrderNotification::OrderResponse(OrderResponse {
            order_id,
            status: next,
            seller_id: seller_id.to_string(),
            timestamp: order.responded_at.unwrap_or(order.updated_at),
        });
        let topic = Topic::Buyer(order.buyer_id.clone());

        // The transition is already durable; the buyer can still read it back.
        match self.notifier.publish(&topic, &response).await {
            Ok(delivered) => {
                tracing::debug!(order_id = %order_id, topic = %topic, delivered, "orderResponse sent");
            }
            Err(e) => {
                tracing::error!(order_id = %order_id, topic = %topic, error = %e, "Failed to notify buyer");
            }
        }

        Ok(order)
    }

    /// Any authenticated caller may read an order by id.
    pub async fn get_order(&self, _principal: &Principal, order_id: Uuid) -> Result<Order, WorkflowError> {
        self.store.get(order_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => WorkflowError::NotFound(id),
            other => other.into(),
        })
    }

    /// A buyer's own orders, newest first.
    pub async fn list_orders_for_buyer(
        &self,
        principal: &Principal,
        buyer_id: &str,
    ) -> Result<Vec<Order>, WorkflowError> {
        principal.require(PrincipalType::Buyer)?;
        if principal.principal_id != buyer_id {
            return Err(WorkflowError::Forbidden(
                "buyers can only list their own orders".to_string(),
            ));
        }
        Ok(self.store.list_by_buyer(buyer_id).await?)
    }

    /// Every order, newest first. Sellers only.
    pub async fn list_all_orders(&self, principal: &Principal) -> Result<Vec<Order>, WorkflowError> {
        principal.require(PrincipalType::Seller)?;
        Ok(self.store.list_all().await?)
    }
}
