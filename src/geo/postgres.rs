use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::{validate_query, GeoError, GeoIndex};
use crate::domain::order::GeoPoint;
use crate::domain::seller::{NearbySeller, Seller};

// earth_box is a bounding cube so the gist index does the coarse cut,
// earth_distance then trims the corners.
const FIND_NEARBY: &str = r#"
    SELECT id, pharmacy_name, longitude, latitude, is_accepting_orders,
           earth_distance(ll_to_earth($1, $2), ll_to_earth(latitude, longitude)) AS distance_meters
    FROM sellers
    WHERE is_accepting_orders
      AND earth_box(ll_to_earth($1, $2), $3) @> ll_to_earth(latitude, longitude)
      AND earth_distance(ll_to_earth($1, $2), ll_to_earth(latitude, longitude)) <= $3
    ORDER BY distance_meters ASC
"#;

/// Seller radius search backed by PostgreSQL `cube` + `earthdistance`.
#[derive(Clone)]
pub struct PgGeoIndex {
    pool: PgPool,
}

impl PgGeoIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, GeoError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| GeoError::Backend(e.to_string()))?;

        tracing::info!("✅ Connected to PostgreSQL geo index");
        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> Result<(), GeoError> {
        let statements = [
            "CREATE EXTENSION IF NOT EXISTS cube",
            "CREATE EXTENSION IF NOT EXISTS earthdistance",
            r#"CREATE TABLE IF NOT EXISTS sellers (
                id TEXT PRIMARY KEY,
                pharmacy_name TEXT,
                longitude DOUBLE PRECISION NOT NULL,
                latitude DOUBLE PRECISION NOT NULL,
                is_accepting_orders BOOLEAN NOT NULL DEFAULT TRUE
            )"#,
            "CREATE INDEX IF NOT EXISTS sellers_location_idx ON sellers USING gist (ll_to_earth(latitude, longitude))",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| GeoError::Backend(e.to_string()))?;
        }

        tracing::info!("✅ Seller geo schema ready");
        Ok(())
    }

    pub async fn upsert(&self, seller: &Seller) -> Result<(), GeoError> {
        sqlx::query(
            r#"INSERT INTO sellers (id, pharmacy_name, longitude, latitude, is_accepting_orders)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE SET
                   pharmacy_name = EXCLUDED.pharmacy_name,
                   longitude = EXCLUDED.longitude,
                   latitude = EXCLUDED.latitude,
                   is_accepting_orders = EXCLUDED.is_accepting_orders"#,
        )
        .bind(&seller.id)
        .bind(&seller.pharmacy_name)
        .bind(seller.location.longitude)
        .bind(seller.location.latitude)
        .bind(seller.accepting_orders)
        .execute(&self.pool)
        .await
        .map_err(|e| GeoError::Backend(e.to_string()))?;
        Ok(())
    }
}

fn nearby_from_row(row: &PgRow) -> Result<NearbySeller, sqlx::Error> {
    Ok(NearbySeller {
        seller: Seller {
            id: row.try_get("id")?,
            pharmacy_name: row.try_get("pharmacy_name")?,
            location: GeoPoint {
                longitude: row.try_get("longitude")?,
                latitude: row.try_get("latitude")?,
            },
            accepting_orders: row.try_get("is_accepting_orders")?,
        },
        distance_meters: row.try_get("distance_meters")?,
    })
}

#[async_trait]
impl GeoIndex for PgGeoIndex {
    async fn find_nearby(
        &self,
        point: GeoPoint,
        max_distance_meters: f64,
    ) -> Result<Vec<NearbySeller>, GeoError> {
        validate_query(&point, max_distance_meters)?;

        let rows = sqlx::query(FIND_NEARBY)
            .bind(point.latitude)
            .bind(point.longitude)
            .bind(max_distance_meters)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GeoError::Backend(e.to_string()))?;

        let sellers = rows
            .iter()
            .map(nearby_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GeoError::Backend(e.to_string()))?;

        tracing::debug!(
            longitude = point.longitude,
            latitude = point.latitude,
            radius_m = max_distance_meters,
            matched = sellers.len(),
            "Geo query complete"
        );
        Ok(sellers)
    }
}
