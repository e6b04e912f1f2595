use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::config::TtlSettings;
use crate::snapshot::source_ids;

// A process holds one global recorder; every app() build shares it.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the
    /// per-source cache TTLs as static gauges.
    pub fn init(ttl: &TtlSettings) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();

        for (source, secs) in [
            (source_ids::NARRATIVE_WEBHOOK, ttl.narrative_secs),
            (source_ids::MARKET_PULSE, ttl.pulse_secs),
            (source_ids::PRICE_HISTORY, ttl.history_secs),
            (source_ids::SILVER_FUTURES, ttl.intraday_secs),
        ] {
            // absolute TTL, no sliding refresh
            gauge!("snapshot_cache_ttl_secs", "source" => source).set(secs as f64);
        }

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
