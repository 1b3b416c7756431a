use serde::Deserialize;
use std::str::FromStr;

use super::errors::OrderError;
use super::model::OrderDraft;
use super::value_objects::{LocationInput, OrderItem, OrderStatus};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// A buyer's request to place an order. The buyer identity comes from the
/// authenticated principal, never from the payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub location: LocationInput,
    #[serde(default)]
    pub prescription_image: Option<String>,
}

impl PlaceOrder {
    /// Resolve the location and check every field, producing a draft the
    /// store will accept.
    pub fn into_draft(self, buyer_id: &str) -> Result<OrderDraft, OrderError> {
        let draft = OrderDraft {
            buyer_id: buyer_id.to_string(),
            items: self.items,
            total_amount: self.total_amount,
            location: self.location.resolve()?,
            prescription_image: self.prescription_image,
        };
        draft.validate()?;
        Ok(draft)
    }
}

/// A seller's answer to a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    Accept,
    Reject,
}

impl ResponseAction {
    pub fn target_status(&self) -> OrderStatus {
        match self {
            ResponseAction::Accept => OrderStatus::Accepted,
            ResponseAction::Reject => OrderStatus::Rejected,
        }
    }
}

impl FromStr for ResponseAction {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(ResponseAction::Accept),
            "reject" => Ok(ResponseAction::Reject),
            other => Err(OrderError::InvalidAction(other.to_string())),
        }
    }
}

/// A seller's response as sent over the wire. Older clients send the target
/// status instead of the action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RespondToOrder {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RespondToOrder {
    pub fn action(&self) -> Result<ResponseAction, OrderError> {
        match (self.action.as_deref(), self.status.as_deref()) {
            (Some(action), _) => action.parse(),
            (None, Some("accepted")) => Ok(ResponseAction::Accept),
            (None, Some("rejected")) => Ok(ResponseAction::Reject),
            (None, Some(other)) => Err(OrderError::InvalidAction(other.to_string())),
            (None, None) => Err(OrderError::InvalidAction(String::new())),
        }
    }
}
