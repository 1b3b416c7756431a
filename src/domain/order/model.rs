use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::value_objects::{OrderItem, OrderLocation, OrderStatus};

// ============================================================================
// Order Record
// ============================================================================

/// Everything the buyer supplies when placing an order, already resolved
/// into domain types.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub buyer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub location: OrderLocation,
    pub prescription_image: Option<String>,
}

impl OrderDraft {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        for item in &self.items {
            item.validate()?;
        }
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(OrderError::InvalidTotalAmount(self.total_amount));
        }
        if !self.location.point.is_valid() {
            return Err(OrderError::InvalidCoordinates {
                longitude: self.location.point.longitude,
                latitude: self.location.point.latitude,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub location: OrderLocation,
    pub prescription_image: Option<String>,
    pub status: OrderStatus,
    pub seller_id: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// When a seller's response is recorded: never earlier than creation, even
/// if the clock stepped back.
pub fn response_timestamp(created_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(created_at)
}

impl Order {
    /// Build a fresh pending order from a validated draft.
    pub fn from_draft(draft: OrderDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            buyer_id: draft.buyer_id,
            items: draft.items,
            total_amount: draft.total_amount,
            location: draft.location,
            prescription_image: draft.prescription_image,
            status: OrderStatus::Pending,
            seller_id: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `seller_id` and `responded_at` are either both absent or both set.
    pub fn response_fields_consistent(&self) -> bool {
        self.seller_id.is_some() == self.responded_at.is_some()
    }

    /// Compare-and-set on `status`. Stores call this while holding whatever
    /// makes the read and write a single atomic step.
    pub fn transition(
        &mut self,
        expected: OrderStatus,
        next: OrderStatus,
        seller_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.status != expected {
            return Err(OrderError::StatusMismatch {
                expected,
                current: self.status,
            });
        }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        if let Some(seller_id) = seller_id {
            if self.seller_id.is_some() {
                return Err(OrderError::SellerAlreadyAssigned);
            }
            self.seller_id = Some(seller_id.to_string());
            self.responded_at = Some(response_timestamp(self.created_at, now));
        }
        self.status = next;
        self.updated_at = now.max(self.updated_at);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::draft;
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_draft_validation_rules() {
        assert!(draft("b1").validate().is_ok());

        let mut empty = draft("b1");
        empty.items.clear();
        assert_eq!(empty.validate(), Err(OrderError::EmptyItems));

        let mut negative_total = draft("b1");
        negative_total.total_amount = -0.01;
        assert!(matches!(
            negative_total.validate(),
            Err(OrderError::InvalidTotalAmount(_))
        ));

        let mut bad_item = draft("b1");
        bad_item.items[1].quantity = 0;
        assert_eq!(bad_item.validate(), Err(OrderError::InvalidQuantity(0)));

        let mut off_globe = draft("b1");
        off_globe.location.point.latitude = 120.0;
        assert!(matches!(
            off_globe.validate(),
            Err(OrderError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_new_order_is_pending_without_seller() {
        let now = Utc::now();
        let order = Order::from_draft(draft("b1"), now);

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.seller_id.is_none());
        assert!(order.responded_at.is_none());
        assert_eq!(order.created_at, now);
        assert!(order.response_fields_consistent());
    }

    #[test]
    fn test_transition_sets_seller_and_response_time_together() {
        let created = Utc::now();
        let mut order = Order::from_draft(draft("b1"), created);

        order
            .transition(OrderStatus::Pending, OrderStatus::Accepted, Some("s1"), created + Duration::seconds(5))
            .unwrap();

        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.seller_id.as_deref(), Some("s1"));
        assert_eq!(order.responded_at, Some(created + Duration::seconds(5)));
        assert!(order.response_fields_consistent());
    }

    #[test]
    fn test_transition_rejects_stale_expectation() {
        let mut order = Order::from_draft(draft("b1"), Utc::now());
        order
            .transition(OrderStatus::Pending, OrderStatus::Rejected, Some("s1"), Utc::now())
            .unwrap();

        let err = order
            .transition(OrderStatus::Pending, OrderStatus::Accepted, Some("s2"), Utc::now())
            .unwrap_err();

        assert_eq!(
            err,
            OrderError::StatusMismatch {
                expected: OrderStatus::Pending,
                current: OrderStatus::Rejected
            }
        );
        assert_eq!(order.seller_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_transition_refuses_skipping_states() {
        let mut order = Order::from_draft(draft("b1"), Utc::now());
        let err = order
            .transition(OrderStatus::Pending, OrderStatus::Shipped, None, Utc::now())
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidStatusTransition { .. }));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_response_time_never_precedes_creation() {
        let created = Utc::now();
        let mut order = Order::from_draft(draft("b1"), created);

        order
            .transition(OrderStatus::Pending, OrderStatus::Accepted, Some("s1"), created - Duration::minutes(1))
            .unwrap();

        assert_eq!(order.responded_at, Some(created));
    }

    #[test]
    fn test_response_timestamp_clamps_to_creation() {
        let created = Utc::now();

        assert_eq!(response_timestamp(created, created - Duration::seconds(30)), created);
        assert_eq!(response_timestamp(created, created), created);
        assert_eq!(
            response_timestamp(created, created + Duration::seconds(30)),
            created + Duration::seconds(30)
        );
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let order = Order::from_draft(draft("b1"), Utc::now());
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["buyerId"], "b1");
        assert_eq!(json["status"], "pending");
        assert!(json["sellerId"].is_null());
        assert_eq!(json["location"]["longitude"], 77.59);
    }
}
