//! Fundamentals Service
//!
//! Ingests company fundamentals from Alpha Vantage, caches them in Redis,
//! persists them in PostgreSQL and classifies each company.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  FUNDAMENTALS SERVICE                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────────┐  ┌──────────────────┐ │
//! │  │  API      │  │  Ingestion       │  │  Classification  │ │
//! │  │  (Axum)   │─▶│  (fan-out fetch) │─▶│  (rules + model) │ │
//! │  └───────────┘  └────────┬─────────┘  └────────┬─────────┘ │
//! │            ┌─────────────┼─────────────┐       │           │
//! │            ▼             ▼             ▼       ▼           │
//! │     ┌───────────┐ ┌────────────┐ ┌─────────────────┐       │
//! │     │   Redis   │ │Alpha Vantage│ │   PostgreSQL   │       │
//! │     └───────────┘ └────────────┘ └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cache;
mod classify;
mod config;
mod db;
mod error;
mod handlers;
mod ingest;
mod models;
mod store;
mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::RedisCache;
use crate::classify::{ClassificationService, PartitionState};
use crate::ingest::{IngestService, IngestSettings};
use crate::store::{DurableStore, PgStore};
use crate::upstream::AlphaVantageClient;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fundamentals_service=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Fundamentals service starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));
    tracing::info!("Cache: {}:{}", config.redis_host, config.redis_port);
    if config.api_alpha.is_empty() {
        tracing::warn!("API_ALPHA is not set; upstream requests will be rejected");
    }

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .context("Failed to run migrations")?;

    let store: Arc<dyn DurableStore> = Arc::new(PgStore::new(pool));
    let cache = RedisCache::connect(&config.redis_url()).await
        .context("Failed to connect to Redis")?;
    let fetcher = AlphaVantageClient::new(&config.alpha_base_url, &config.api_alpha, config.upstream_timeout_seconds)
        .context("Failed to create HTTP client")?;

    let partitioner = load_partitioner(&config);
    let classifier = Arc::new(ClassificationService::new(store.clone(), partitioner));

    let ingest = IngestService::new(
        Arc::new(cache),
        store.clone(),
        Arc::new(fetcher),
        classifier.clone(),
        IngestSettings {
            cache_ttl_seconds: config.cache_ttl_seconds,
            retention: config.retention(),
            max_batch_size: config.max_batch_size,
        },
    );

    store::spawn_retention_sweeper(store.clone(), Duration::from_secs(config.purge_interval_seconds));

    // Build application state
    let state = AppState {
        config: config.clone(),
        store,
        classifier,
        ingest,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Load the partition model. A load failure is kept and reported by every classification call.
fn load_partitioner(config: &config::Config) -> PartitionState {
    let state = PartitionState::from_path(config.model_path.as_deref());
    match &state {
        PartitionState::Disabled => tracing::info!("MODEL_PATH not set; cluster assignment disabled"),
        PartitionState::Loaded(model) => {
            tracing::info!("Partition model loaded ({} clusters)", model.partition_count());
        }
        PartitionState::Unavailable(e) => tracing::warn!("Partition model unavailable: {}", e),
    }
    state
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub store: Arc<dyn DurableStore>,
    pub classifier: Arc<ClassificationService>,
    pub ingest: IngestService,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/fetch", get(handlers::fetch::fetch))
        .route("/update-company", post(handlers::companies::update_company))
        .route("/api/v1/companies/reclassify", post(handlers::companies::reclassify))
        .route("/api/v1/companies/:ticker", get(handlers::companies::get))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
