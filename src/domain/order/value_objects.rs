use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// One line of an order. Immutable once the order is created.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog reference, absent for free-text items
    #[serde(default, alias = "medicineId")]
    pub medicine_ref: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(alias = "price")]
    pub unit_price: f64,
    pub quantity: i32,
}

impl OrderItem {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity < 1 {
            return Err(OrderError::InvalidQuantity(self.quantity));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(OrderError::InvalidUnitPrice(self.unit_price));
        }
        Ok(())
    }
}

/// Lifecycle states. The full set is reserved so stored records stay
/// readable once the later transitions are driven elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Forward edges of the state machine. Nothing moves backwards and
    /// nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Accepted, Confirmed)
                | (Accepted, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

/// A point on the globe, longitude first as in GeoJSON.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, OrderError> {
        let point = Self { longitude, latitude };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(OrderError::InvalidCoordinates { longitude, latitude })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// Delivery location as stored on the order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderLocation {
    #[serde(flatten)]
    pub point: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Location as clients send it: either a GeoJSON-style coordinate pair or an
/// explicit longitude/latitude object.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum LocationInput {
    Coordinates {
        coordinates: Vec<f64>,
        #[serde(default)]
        address: Option<String>,
    },
    LonLat {
        longitude: f64,
        latitude: f64,
        #[serde(default)]
        address: Option<String>,
    },
}

impl LocationInput {
    pub fn resolve(self) -> Result<OrderLocation, OrderError> {
        match self {
            LocationInput::Coordinates { coordinates, address } => match coordinates.as_slice() {
                [longitude, latitude] => Ok(OrderLocation {
                    point: GeoPoint::new(*longitude, *latitude)?,
                    address,
                }),
                other => Err(OrderError::MalformedLocation(format!(
                    "expected [longitude, latitude], got {} values",
                    other.len()
                ))),
            },
            LocationInput::LonLat { longitude, latitude, address } => Ok(OrderLocation {
                point: GeoPoint::new(longitude, latitude)?,
                address,
            }),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
