use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Invalid unit price: {0}")]
    InvalidUnitPrice(f64),

    #[error("Invalid total amount: {0}")]
    InvalidTotalAmount(f64),

    #[error("Invalid coordinates: longitude={longitude}, latitude={latitude}")]
    InvalidCoordinates { longitude: f64, latitude: f64 },

    #[error("Invalid location format: {0}")]
    MalformedLocation(String),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Invalid action '{0}'. Expected 'accept' or 'reject'")]
    InvalidAction(String),

    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order is {current}, expected {expected}")]
    StatusMismatch {
        expected: OrderStatus,
        current: OrderStatus,
    },

    #[error("Order already has a responding seller")]
    SellerAlreadyAssigned,
}
