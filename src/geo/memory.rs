use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{haversine_meters, validate_query, GeoError, GeoIndex};
use crate::domain::order::GeoPoint;
use crate::domain::seller::{NearbySeller, Seller};

/// Seller registry scanned with haversine distances.
#[derive(Default)]
pub struct InMemoryGeoIndex {
    sellers: RwLock<HashMap<String, Seller>>,
}

impl InMemoryGeoIndex {
    pub fn with_sellers(sellers: impl IntoIterator<Item = Seller>) -> Self {
        Self {
            sellers: RwLock::new(sellers.into_iter().map(|s| (s.id.clone(), s)).collect()),
        }
    }
}

#[async_trait]
impl GeoIndex for InMemoryGeoIndex {
    async fn find_nearby(
        &self,
        point: GeoPoint,
        max_distance_meters: f64,
    ) -> Result<Vec<NearbySeller>, GeoError> {
        validate_query(&point, max_distance_meters)?;

        let sellers = self.sellers.read().await;
        let mut matches: Vec<NearbySeller> = sellers
            .values()
            .filter(|s| s.accepting_orders)
            .map(|s| NearbySeller {
                distance_meters: haversine_meters(&point, &s.location),
                seller: s.clone(),
            })
            .filter(|m| m.distance_meters <= max_distance_meters)
            .collect();

        matches.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        Ok(matches)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::geo::EARTH_RADIUS_METERS;

    /// A seller `meters` due north of `origin`.
    pub fn seller_north_of(origin: GeoPoint, id: &str, meters: f64, accepting: bool) -> Seller {
        let d_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
        Seller {
            id: id.to_string(),
            pharmacy_name: Some(format!("Pharmacy {id}")),
            location: GeoPoint {
                longitude: origin.longitude,
                latitude: origin.latitude + d_lat,
            },
            accepting_orders: accepting,
        }
    }
}
