// ============================================================================
// Order Domain - Business Logic for Orders
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderItem, OrderStatus, GeoPoint, locations)
// - Order record and draft (with validation and compare-and-set transition)
// - Commands (PlaceOrder, ResponseAction)
// - Notifications (newOrder, orderResponse)
// - Errors (OrderError enum)
//
// Persistence and delivery live elsewhere; nothing here does I/O.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod model;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use model::*;
