// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! sharegate service
//!
//! Accepts user-submitted markup, sanitizes it and serves it back, with a
//! cache-aside layer in front of the document store and fixed-window rate
//! limits on publishing and viewing.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and an optional
//! `.env` file):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `ALLOWED_ORIGINS`: Comma-separated CORS origins
//! - `PUBLISH_LIMIT` / `PUBLISH_WINDOW_MS`: Publish policy (default: 10 per hour)
//! - `VIEW_LIMIT` / `VIEW_WINDOW_MS`: View policy, `VIEW_LIMIT=0` disables it
//! - `SANITIZER_MODE`: `strict` (default) or `permissive`
//! - `SANITIZER_ALLOW_LIST`: Comma-separated trusted origins
//! - `STORE_BACKEND`: `memory` (default), `rest` or `disabled`
//! - `STORE_REST_URL` / `STORE_REST_TOKEN` / `STORE_TIMEOUT_MS`: REST store
//! - `CACHE_SINGLE_FLIGHT`: Deduplicate concurrent recomputation (default: true)
//! - `TRUST_FORWARDED_HEADERS`: Honour `X-Forwarded-For` / `X-Real-IP`
//! - `METRICS_ENABLED`: Serve `/metrics` (default: true)

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sharegate::{
    config::{Config, RatePolicy, StoreBackend},
    handlers::{router, AppState},
    metrics::Metrics,
    pipeline::Publisher,
    repository::InMemoryRepository,
    store::{build_store, MemoryStore, StoreClient},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        store = ?config.store.backend,
        sanitizer_mode = %config.sanitizer.mode,
        publish_limit = config.rate_limit.publish.limit,
        publish_window_ms = config.rate_limit.publish.window_ms,
        view_limit = ?config.rate_limit.view.map(|p| p.limit),
        single_flight = config.cache.single_flight,
        "Starting sharegate"
    );

    let store: Arc<dyn StoreClient> = match config.store.backend {
        StoreBackend::Memory => {
            let memory = MemoryStore::new();

            // Spawn purge task
            let purge_store = memory.clone();
            let purge_interval = config.store.purge_interval();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(purge_interval);
                loop {
                    interval.tick().await;
                    let removed = purge_store.purge_expired().await;
                    debug!(removed, "Store purge pass");
                }
            });

            Arc::new(memory)
        }
        _ => build_store(&config.store)?,
    };

    let metrics = Arc::new(Metrics::new()?);
    let publisher = Publisher::new(
        &config,
        store,
        Arc::new(InMemoryRepository::new()),
        metrics,
    );

    let state = Arc::new(AppState {
        publisher,
        config: config.clone(),
    });
    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_list(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let mut config = Config::default();

    if let Ok(bind_addr) = std::env::var("BIND_ADDR") {
        config.bind_addr = bind_addr;
    }
    if let Some(origins) = env_list("ALLOWED_ORIGINS") {
        config.allowed_origins = origins;
    }

    let publish = config.rate_limit.publish;
    config.rate_limit.publish = RatePolicy::new(
        env_parse("PUBLISH_LIMIT").unwrap_or(publish.limit),
        env_parse("PUBLISH_WINDOW_MS").unwrap_or(publish.window_ms),
    );

    let view = config
        .rate_limit
        .view
        .unwrap_or_else(|| RatePolicy::new(120, 60_000));
    let view_limit = env_parse("VIEW_LIMIT").unwrap_or(view.limit);
    config.rate_limit.view = (view_limit > 0).then(|| {
        RatePolicy::new(
            view_limit,
            env_parse("VIEW_WINDOW_MS").unwrap_or(view.window_ms),
        )
    });

    if let Some(mode) = env_parse("SANITIZER_MODE") {
        config.sanitizer.mode = mode;
    }
    if let Some(allow_list) = env_list("SANITIZER_ALLOW_LIST") {
        config.sanitizer.allow_list = allow_list;
    }

    if let Some(backend) = env_parse("STORE_BACKEND") {
        config.store.backend = backend;
    }
    config.store.rest_url = std::env::var("STORE_REST_URL").ok();
    config.store.rest_token = std::env::var("STORE_REST_TOKEN").ok();
    config.store.timeout_ms = env_parse("STORE_TIMEOUT_MS").unwrap_or(config.store.timeout_ms);

    config.cache.single_flight =
        env_parse("CACHE_SINGLE_FLIGHT").unwrap_or(config.cache.single_flight);
    config.identity.trust_forwarded_headers =
        env_parse("TRUST_FORWARDED_HEADERS").unwrap_or(config.identity.trust_forwarded_headers);
    config.metrics.enabled = env_parse("METRICS_ENABLED").unwrap_or(config.metrics.enabled);

    config
}
