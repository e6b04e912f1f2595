// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod snapshot;

use std::sync::Arc;

use axum::Router;
use tracing::info;

pub use crate::api::router;
pub use crate::config::Settings;
pub use crate::pipeline::{MarketPipeline, SnapshotView};
pub use crate::snapshot::{MarketSnapshot, Provenance};

/// Full in-process app: settings from the documented lookup order, a fresh
/// cache, the production sources and the `/metrics` route.
pub async fn app() -> anyhow::Result<Router> {
    let settings = Settings::load_default()?;
    app_with_settings(settings)
}

/// Same as [`app`] with explicit settings (tests point these at local
/// servers).
pub fn app_with_settings(settings: Settings) -> anyhow::Result<Router> {
    let cache = Arc::new(cache::SnapshotCache::new());
    let pipeline = MarketPipeline::from_settings(&settings, cache)?;
    let metrics = metrics::Metrics::init(&settings.ttl)?;

    info!(
        webhook = %settings.webhook.url,
        fallback = %settings.webhook.fallback_path.display(),
        market_data = %settings.market_data.base_url,
        "pipeline configured"
    );

    let state = api::AppState::new(pipeline, settings);
    Ok(router(state).merge(metrics.router()))
}
