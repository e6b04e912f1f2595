//! # Market Pipeline
//! Composes fetch → cache → fallback per source and exposes the single
//! call surface the presentation side needs: [`MarketPipeline::get_snapshot`].
//!
//! Callers never see cache internals or raw HTTP responses, only a
//! [`SnapshotView`] carrying payload, provenance and the live error (if any).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::SnapshotCache;
use crate::config::Settings;
use crate::error::FetchError;
use crate::fallback::{ErrorView, FallbackPolicy, FallbackResolver, Resolution};
use crate::fetch::webhook::WebhookFetcher;
use crate::fetch::yahoo::YahooChartFetcher;
use crate::fetch::{QuerySpec, SourceFetcher};
use crate::snapshot::{source_ids, MarketSnapshot, Provenance};

const USER_AGENT: &str = concat!("agforecast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("unknown source: {0}")]
    UnknownSource(String),
}

/// Everything the pipeline needs to serve one source.
#[derive(Clone)]
pub struct SourceSpec {
    pub ttl: Duration,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub query: QuerySpec,
    pub fallback: FallbackResolver,
}

/// Outward view of one source. `payload == None` is the explicit no-data
/// state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotView {
    pub source_id: String,
    pub payload: Option<Map<String, Value>>,
    pub provenance: Option<Provenance>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub error: Option<ErrorView>,
}

impl SnapshotView {
    pub fn from_resolution(source_id: &str, r: Resolution) -> Self {
        match r {
            Resolution::Ready { snapshot, error } => Self {
                source_id: snapshot.source_id,
                payload: Some(snapshot.payload),
                provenance: Some(snapshot.provenance),
                fetched_at: Some(snapshot.fetched_at),
                error: error.as_ref().map(ErrorView::from),
            },
            Resolution::NoData { error, .. } => Self {
                source_id: source_id.to_string(),
                payload: None,
                provenance: None,
                fetched_at: None,
                error: Some(ErrorView::from(&error)),
            },
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.payload.is_none()
    }

    /// `live|cached|fallback_file|default|none`.
    pub fn provenance_label(&self) -> &'static str {
        self.provenance.map(|p| p.as_str()).unwrap_or("none")
    }
}

#[derive(Clone)]
pub struct MarketPipeline {
    cache: Arc<SnapshotCache>,
    sources: HashMap<String, SourceSpec>,
}

impl MarketPipeline {
    /// Empty pipeline over an injected cache.
    pub fn new(cache: Arc<SnapshotCache>) -> Self {
        Self {
            cache,
            sources: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>, spec: SourceSpec) -> Self {
        self.sources.insert(source_id.into(), spec);
        self
    }

    /// The four production sources, wired from settings.
    pub fn from_settings(settings: &Settings, cache: Arc<SnapshotCache>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building HTTP client")?;

        let webhook = Arc::new(
            WebhookFetcher::new(&settings.webhook.url, client.clone())
                .with_timeout(settings.webhook.timeout_secs),
        );
        let md = &settings.market_data;
        let yahoo = Arc::new(
            YahooChartFetcher::new(&md.base_url, client).with_timeout(md.timeout_secs),
        );
        let ttl = &settings.ttl;

        let mut pulse_default = Map::new();
        pulse_default.insert("instruments".into(), Value::Array(Vec::new()));

        Ok(Self::new(cache)
            .with_source(
                source_ids::NARRATIVE_WEBHOOK,
                SourceSpec {
                    ttl: ttl.narrative(),
                    fetcher: webhook,
                    query: QuerySpec::none(),
                    fallback: FallbackResolver::file(&settings.webhook.fallback_path),
                },
            )
            .with_source(
                source_ids::MARKET_PULSE,
                SourceSpec {
                    ttl: ttl.pulse(),
                    fetcher: yahoo.clone(),
                    query: QuerySpec::instruments(md.pulse_layout().symbols(), "2d", "1d"),
                    fallback: FallbackResolver::new(FallbackPolicy::Static(pulse_default)),
                },
            )
            .with_source(
                source_ids::PRICE_HISTORY,
                SourceSpec {
                    ttl: ttl.history(),
                    fetcher: yahoo.clone(),
                    query: QuerySpec::instruments([md.silver_symbol.clone()], "1mo", "1d"),
                    fallback: FallbackResolver::none(),
                },
            )
            .with_source(
                source_ids::SILVER_FUTURES,
                SourceSpec {
                    ttl: ttl.intraday(),
                    fetcher: yahoo,
                    query: QuerySpec::instruments([md.silver_symbol.clone()], "7d", "30m"),
                    fallback: FallbackResolver::none(),
                },
            ))
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn knows(&self, source_id: &str) -> bool {
        self.sources.contains_key(source_id)
    }

    fn spec(&self, source_id: &str) -> Result<&SourceSpec, PipelineError> {
        self.sources
            .get(source_id)
            .ok_or_else(|| PipelineError::UnknownSource(source_id.to_string()))
    }

    /// Cache-first read with fallback. Never fails for a known source.
    pub async fn get_snapshot(&self, source_id: &str) -> Result<SnapshotView, PipelineError> {
        let r = self.resolve(source_id).await?;
        Ok(SnapshotView::from_resolution(source_id, r))
    }

    pub async fn resolve(&self, source_id: &str) -> Result<Resolution, PipelineError> {
        let spec = self.spec(source_id)?;
        let fetched = self
            .cache
            .get_or_fetch(source_id, spec.ttl, || fetch_snapshot(source_id, spec))
            .await;
        let r = spec.fallback.resolve(source_id, fetched);
        log_resolution(source_id, &r);
        Ok(r)
    }

    /// Bypasses a fresh entry. When the forced fetch fails, a still-fresh
    /// entry is served (tagged `Cached`, error attached) before the
    /// fallback is consulted.
    pub async fn refresh(&self, source_id: &str) -> Result<SnapshotView, PipelineError> {
        let spec = self.spec(source_id)?;
        let r = match self
            .cache
            .refresh(source_id, spec.ttl, || fetch_snapshot(source_id, spec))
            .await
        {
            Ok(snapshot) => Resolution::Ready {
                snapshot,
                error: None,
            },
            Err(e) => match self.cache.lookup_at(source_id, Utc::now()) {
                Some(snapshot) => {
                    tracing::warn!(
                        target: "pipeline",
                        source = source_id,
                        error = %e,
                        "refresh failed; keeping fresh cache entry"
                    );
                    Resolution::Ready {
                        snapshot,
                        error: Some(e),
                    }
                }
                None => spec.fallback.resolve(source_id, Err(e)),
            },
        };
        log_resolution(source_id, &r);
        Ok(SnapshotView::from_resolution(source_id, r))
    }
}

async fn fetch_snapshot(source_id: &str, spec: &SourceSpec) -> Result<MarketSnapshot, FetchError> {
    let raw = spec.fetcher.fetch(&spec.query).await?;
    let payload = raw.into_payload()?;
    tracing::debug!(
        target: "pipeline",
        source = source_id,
        fetcher = spec.fetcher.name(),
        "fetched live payload"
    );
    Ok(MarketSnapshot::new(source_id, payload, Provenance::Live))
}

fn log_resolution(source_id: &str, r: &Resolution) {
    match r.provenance() {
        Some(p) => tracing::info!(target: "pipeline", source = source_id, provenance = p.as_str(), "snapshot resolved"),
        None => tracing::warn!(
            target: "pipeline",
            source = source_id,
            error = ?r.error(),
            "no data available"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RawPayload;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results, repeating the last one.
    struct Scripted {
        results: Mutex<Vec<Result<RawPayload, FetchError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(results: Vec<Result<RawPayload, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SourceFetcher for Scripted {
        async fn fetch(&self, _q: &QuerySpec) -> Result<RawPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut r = self.results.lock().unwrap();
            if r.len() > 1 {
                r.remove(0)
            } else {
                r[0].clone()
            }
        }
        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn doc(signal: &str) -> Result<RawPayload, FetchError> {
        Ok(RawPayload::Document(json!([{ "trading_signal": { "signal": signal } }])))
    }

    fn down() -> Result<RawPayload, FetchError> {
        Err(FetchError::Unreachable("connection refused".into()))
    }

    fn pipeline(fetcher: Arc<Scripted>, fallback: FallbackResolver) -> MarketPipeline {
        MarketPipeline::new(Arc::new(SnapshotCache::new())).with_source(
            "narrative_webhook",
            SourceSpec {
                ttl: Duration::from_secs(600),
                fetcher,
                query: QuerySpec::none(),
                fallback,
            },
        )
    }

    #[tokio::test]
    async fn live_then_cached() {
        let f = Scripted::new(vec![doc("buy")]);
        let p = pipeline(f.clone(), FallbackResolver::none());

        let a = p.get_snapshot("narrative_webhook").await.unwrap();
        let b = p.get_snapshot("narrative_webhook").await.unwrap();
        assert_eq!(a.provenance, Some(Provenance::Live));
        assert_eq!(b.provenance, Some(Provenance::Cached));
        assert_eq!(a.payload, b.payload);
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        // list-wrapped document was unwrapped
        assert_eq!(a.payload.unwrap()["trading_signal"]["signal"], json!("buy"));
    }

    #[tokio::test]
    async fn unknown_source_is_an_error() {
        let p = pipeline(Scripted::new(vec![doc("buy")]), FallbackResolver::none());
        assert_eq!(
            p.get_snapshot("gold").await.unwrap_err(),
            PipelineError::UnknownSource("gold".into())
        );
    }

    #[tokio::test]
    async fn failure_without_fallback_is_no_data() {
        let p = pipeline(Scripted::new(vec![down()]), FallbackResolver::none());
        let v = p.get_snapshot("narrative_webhook").await.unwrap();
        assert!(v.is_no_data());
        assert_eq!(v.provenance_label(), "none");
        let err = v.error.unwrap();
        assert_eq!(err.kind, crate::error::FetchErrorKind::Unreachable);
    }

    #[tokio::test]
    async fn failed_refresh_serves_fresh_entry_as_cached() {
        let f = Scripted::new(vec![doc("hold"), down()]);
        let p = pipeline(f.clone(), FallbackResolver::none());

        p.get_snapshot("narrative_webhook").await.unwrap();
        let v = p.refresh("narrative_webhook").await.unwrap();
        assert_eq!(v.provenance, Some(Provenance::Cached));
        assert!(v.error.is_some());
        assert_eq!(
            v.payload.unwrap()["trading_signal"]["signal"],
            json!("hold")
        );
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_refresh_is_live() {
        let f = Scripted::new(vec![doc("hold"), doc("sell")]);
        let p = pipeline(f, FallbackResolver::none());
        p.get_snapshot("narrative_webhook").await.unwrap();
        let v = p.refresh("narrative_webhook").await.unwrap();
        assert_eq!(v.provenance, Some(Provenance::Live));
        assert!(v.error.is_none());
        assert_eq!(v.payload.unwrap()["trading_signal"]["signal"], json!("sell"));
    }

    #[tokio::test]
    async fn failed_refresh_with_empty_cache_uses_fallback_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, r#"{"trading_signal":{"signal":"neutral"}}"#).unwrap();

        let p = pipeline(Scripted::new(vec![down()]), FallbackResolver::file(&path));
        let v = p.refresh("narrative_webhook").await.unwrap();
        assert_eq!(v.provenance, Some(Provenance::FallbackFile));
        assert_eq!(v.provenance_label(), "fallback_file");
    }

    #[test]
    fn production_sources_are_wired() {
        let p = MarketPipeline::from_settings(&Settings::default(), Arc::new(SnapshotCache::new()))
            .unwrap();
        for id in source_ids::ALL {
            assert!(p.knows(id), "{id} missing");
        }
        let pulse = p.spec(source_ids::MARKET_PULSE).unwrap();
        assert_eq!(pulse.query.symbols, vec!["SI=F", "INR=X", "SLV", "SIVR", "SIL"]);
        assert_eq!(pulse.ttl, Duration::from_secs(300));
        assert!(matches!(pulse.fallback.policy(), FallbackPolicy::Static(_)));
        let hist = p.spec(source_ids::PRICE_HISTORY).unwrap();
        assert_eq!((hist.query.range.as_str(), hist.query.interval.as_str()), ("1mo", "1d"));
        let intraday = p.spec(source_ids::SILVER_FUTURES).unwrap();
        assert_eq!(intraday.query.interval, "30m");
    }
}
