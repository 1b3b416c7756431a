use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Order;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Notifications - Events pushed to connected sessions
// ============================================================================

/// Union of everything the dispatch workflow pushes to sessions.
#[derive(Debug, Clone)]
pub enum OrderNotification {
    /// Sent to every matched seller when an order is placed
    NewOrder(Order),
    /// Sent to the buyer once a seller's response wins
    OrderResponse(OrderResponse),
}

impl OrderNotification {
    /// Event name as seen by clients.
    pub fn event_name(&self) -> &'static str {
        match self {
            OrderNotification::NewOrder(_) => "newOrder",
            OrderNotification::OrderResponse(_) => "orderResponse",
        }
    }

    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            OrderNotification::NewOrder(order) => serde_json::to_value(order),
            OrderNotification::OrderResponse(response) => serde_json::to_value(response),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub seller_id: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::model::fixtures::draft;

    #[test]
    fn test_event_names() {
        let order = Order::from_draft(draft("b1"), Utc::now());
        assert_eq!(OrderNotification::NewOrder(order.clone()).event_name(), "newOrder");

        let response = OrderNotification::OrderResponse(OrderResponse {
            order_id: order.id,
            status: OrderStatus::Accepted,
            seller_id: "s1".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(response.event_name(), "orderResponse");
    }

    #[test]
    fn test_order_response_payload_shape() {
        let order_id = Uuid::new_v4();
        let payload = OrderNotification::OrderResponse(OrderResponse {
            order_id,
            status: OrderStatus::Rejected,
            seller_id: "s9".to_string(),
            timestamp: Utc::now(),
        })
        .payload()
        .unwrap();

        assert_eq!(payload["orderId"], order_id.to_string());
        assert_eq!(payload["status"], "rejected");
        assert_eq!(payload["sellerId"], "s9");
        assert!(payload["timestamp"].is_string());
    }
}
