use anyhow::{bail, Context};
use std::str::FromStr;

// ============================================================================
// Configuration - environment driven
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// ScyllaDB orders + PostgreSQL sellers
    Scylla,
    /// Everything in process
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_host: String,
    pub http_port: u16,
    pub metrics_port: u16,
    /// Seller matching radius for new orders
    pub match_radius_meters: f64,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub scylla_nodes: Vec<String>,
    pub scylla_keyspace: String,
    pub database_url: String,
    /// JSON array of sellers loaded into the geo index at startup
    pub seed_sellers_path: Option<String>,
    /// development | production
    pub environment: String,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "development" => {
                tracing::warn!("⚠️  JWT_SECRET not set, using an insecure development key");
                "dev-jwt-secret-not-for-production".to_string()
            }
            None => bail!("JWT_SECRET must be set in {environment} environment"),
        };

        let storage_backend = match var("STORAGE_BACKEND").as_deref() {
            None | Some("scylla") => StorageBackend::Scylla,
            Some("memory") => StorageBackend::Memory,
            Some(other) => bail!("STORAGE_BACKEND must be 'scylla' or 'memory', got '{other}'"),
        };

        let match_radius_meters: f64 = parse_or("MATCH_RADIUS_METERS", var("MATCH_RADIUS_METERS"), 100_000.0);
        if !match_radius_meters.is_finite() || match_radius_meters <= 0.0 {
            bail!("MATCH_RADIUS_METERS must be a positive number of meters, got {match_radius_meters}");
        }

        let scylla_nodes: Vec<String> = var("SCYLLA_NODES")
            .unwrap_or_else(|| "127.0.0.1:9042".to_string())
            .split(',')
            .map(|node| node.trim().to_string())
            .filter(|node| !node.is_empty())
            .collect();
        if scylla_nodes.is_empty() {
            bail!("SCYLLA_NODES must name at least one node");
        }

        Ok(Self {
            http_host: var("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: parse_or("HTTP_PORT", var("HTTP_PORT"), 3000),
            metrics_port: parse_or("METRICS_PORT", var("METRICS_PORT"), 9090),
            match_radius_meters,
            jwt_secret,
            storage_backend,
            scylla_nodes,
            scylla_keyspace: var("SCYLLA_KEYSPACE").unwrap_or_else(|| "dispatch_ks".to_string()),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/dispatch".to_string()),
            seed_sellers_path: var("SEED_SELLERS_PATH"),
            environment,
        })
    }

    pub fn http_bind(&self) -> (String, u16) {
        (self.http_host.clone(), self.http_port)
    }
}

/// Parse a numeric setting, falling back to `default` with a warning.
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, default = %default, "Invalid numeric setting, using default");
            default
        }),
    }
}

/// Read the seed file named by `SEED_SELLERS_PATH`.
pub fn load_seed_sellers(path: &str) -> anyhow::Result<Vec<crate::domain::seller::Seller>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading seller seed file {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing seller seed file {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.http_bind(), ("0.0.0.0".to_string(), 3000));
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.match_radius_meters, 100_000.0);
        assert_eq!(config.storage_backend, StorageBackend::Scylla);
        assert_eq!(config.scylla_nodes, vec!["127.0.0.1:9042".to_string()]);
        assert_eq!(config.scylla_keyspace, "dispatch_ks");
        assert_eq!(config.environment, "development");
        assert!(config.seed_sellers_path.is_none());
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[("HTTP_PORT", "not-a-port"), ("MATCH_RADIUS_METERS", "far")]).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.match_radius_meters, 100_000.0);
    }

    #[test]
    fn test_non_positive_radius_is_rejected() {
        assert!(config_from(&[("MATCH_RADIUS_METERS", "0")]).is_err());
        assert!(config_from(&[("MATCH_RADIUS_METERS", "-250")]).is_err());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        assert!(config_from(&[("ENVIRONMENT", "production")]).is_err());

        let config = config_from(&[("ENVIRONMENT", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn test_backend_and_node_list() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("SCYLLA_NODES", "10.0.0.1:9042, 10.0.0.2:9042"),
        ])
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.scylla_nodes.len(), 2);

        assert!(config_from(&[("STORAGE_BACKEND", "redis")]).is_err());
    }
}
