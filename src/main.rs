use actix::prelude::*;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context as _;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod geo;
mod metrics;
mod notifications;
mod store;
mod workflow;

use auth::JwtVerifier;
use config::{AppConfig, StorageBackend};
use geo::{GeoIndex, InMemoryGeoIndex, PgGeoIndex};
use notifications::{BusHandle, NotificationBus};
use store::{InMemoryOrderStore, OrderStore, ScyllaOrderStore};
use workflow::OrderWorkflow;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pharmacy_dispatch=debug")),
        )
        .init();

    tracing::info!("🚀 Starting pharmacy order dispatch");

    let config = AppConfig::from_env()?;
    tracing::info!(
        environment = %config.environment,
        backend = ?config.storage_backend,
        match_radius_m = config.match_radius_meters,
        "Configuration loaded"
    );

    // === 1. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    let metrics_registry = metrics.registry().clone();
    let metrics_host = config.http_host.clone();
    let metrics_port = config.metrics_port;
    actix::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_host, metrics_port).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 2. Storage collaborators ===
    let (store, geo) = match config.storage_backend {
        StorageBackend::Scylla => connect_backends(&config).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, nothing survives a restart");
            let sellers = match &config.seed_sellers_path {
                Some(path) => config::load_seed_sellers(path)?,
                None => Vec::new(),
            };
            let store: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
            let geo: Arc<dyn GeoIndex> = Arc::new(InMemoryGeoIndex::with_sellers(sellers));
            (store, geo)
        }
    };

    // === 3. Notification bus ===
    let bus = BusHandle::new(NotificationBus::new().start(), metrics.clone());

    // === 4. Workflow ===
    let workflow = web::Data::new(OrderWorkflow::new(
        store,
        geo,
        Arc::new(bus.clone()),
        metrics.clone(),
        config.match_radius_meters,
    ));
    let bus = web::Data::new(bus);
    let verifier = web::Data::new(JwtVerifier::new(config.jwt_secret.as_bytes()));

    // === 5. HTTP ===
    let bind = config.http_bind();
    tracing::info!("🌐 Listening on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(workflow.clone())
            .app_data(bus.clone())
            .app_data(verifier.clone())
            .configure(api::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    tracing::info!("👋 Shut down cleanly");
    Ok(())
}

async fn connect_backends(config: &AppConfig) -> anyhow::Result<(Arc<dyn OrderStore>, Arc<dyn GeoIndex>)> {
    tracing::info!(nodes = ?config.scylla_nodes, "Connecting to ScyllaDB...");
    let session: Session = SessionBuilder::new()
        .known_nodes(&config.scylla_nodes)
        .build()
        .await
        .context("connecting to ScyllaDB")?;
    ScyllaOrderStore::ensure_schema(&session, &config.scylla_keyspace).await?;
    let store: Arc<dyn OrderStore> = Arc::new(ScyllaOrderStore::new(Arc::new(session)));

    let geo = PgGeoIndex::connect(&config.database_url).await?;
    geo.ensure_schema().await?;
    if let Some(path) = &config.seed_sellers_path {
        let sellers = config::load_seed_sellers(path)?;
        for seller in &sellers {
            geo.upsert(seller).await?;
        }
        tracing::info!(count = sellers.len(), "Seeded sellers");
    }
    let geo: Arc<dyn GeoIndex> = Arc::new(geo);

    Ok((store, geo))
}
