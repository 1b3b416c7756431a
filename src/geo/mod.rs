// ============================================================================
// Geo Index - radius search over sellers
// ============================================================================
//
// Given a point and a radius, return the sellers currently accepting orders,
// nearest first. An empty result is a normal answer.
//
// Implementations:
// - PgGeoIndex       - PostgreSQL cube + earthdistance
// - InMemoryGeoIndex - haversine scan (tests, dev)
//
// ============================================================================

pub(crate) mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::order::GeoPoint;
use crate::domain::seller::NearbySeller;

pub use memory::InMemoryGeoIndex;
pub use postgres::PgGeoIndex;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Invalid geometry: longitude={longitude}, latitude={latitude}")]
    InvalidGeometry { longitude: f64, latitude: f64 },

    #[error("Invalid search radius: {0}")]
    InvalidRadius(f64),

    #[error("Geo backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait GeoIndex: Send + Sync + 'static {
    async fn find_nearby(
        &self,
        point: GeoPoint,
        max_distance_meters: f64,
    ) -> Result<Vec<NearbySeller>, GeoError>;
}

/// Shared argument checks for every implementation.
pub fn validate_query(point: &GeoPoint, max_distance_meters: f64) -> Result<(), GeoError> {
    if !point.is_valid() {
        return Err(GeoError::InvalidGeometry {
            longitude: point.longitude,
            latitude: point.latitude,
        });
    }
    if !max_distance_meters.is_finite() || max_distance_meters <= 0.0 {
        return Err(GeoError::InvalidRadius(max_distance_meters));
    }
    Ok(())
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}
