use serde::{Deserialize, Serialize};

use super::order::GeoPoint;

// ============================================================================
// Seller - read-only projection used for dispatch
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: String,
    pub pharmacy_name: Option<String>,
    pub location: GeoPoint,
    pub accepting_orders: bool,
}

/// A seller returned by a radius search, with its distance to the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySeller {
    pub seller: Seller,
    pub distance_meters: f64,
}
