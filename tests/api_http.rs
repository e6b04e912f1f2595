// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with
// in-memory fetchers standing in for the remote sources.
//
// Covered:
// - GET /health
// - POST /login (accepted, rejected)
// - GET /dashboard (signal card, radar, buckets, emerging, provenance)
// - GET /snapshot/{source_id} cache HIT on second read

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};

use agforecast::api::{self, AppState};
use agforecast::cache::SnapshotCache;
use agforecast::error::FetchError;
use agforecast::fallback::FallbackResolver;
use agforecast::fetch::{QuerySpec, RawPayload, SourceFetcher};
use agforecast::pipeline::{MarketPipeline, SourceSpec};
use agforecast::snapshot::source_ids;
use agforecast::Settings;

use common::{provenance_header, send};

struct FixedDocument(Value);

#[async_trait]
impl SourceFetcher for FixedDocument {
    async fn fetch(&self, _q: &QuerySpec) -> Result<RawPayload, FetchError> {
        Ok(RawPayload::Document(self.0.clone()))
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct Down;

#[async_trait]
impl SourceFetcher for Down {
    async fn fetch(&self, _q: &QuerySpec) -> Result<RawPayload, FetchError> {
        Err(FetchError::Unreachable("offline".into()))
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

fn report() -> Value {
    json!({
        "market_state": { "macro_regime": "Risk-off", "silver_trend": "sideways", "volatility_level": "high" },
        "market_summary": { "current_market_story": "Range trading", "forward_outlook": "Wait" },
        "trading_signal": { "signal": "strong_buy", "confidence": 0.82, "reasoning": ["Inventories falling"] },
        "macro_pressure_index": { "inflation_pressure": 0.6, "demand_growth": 0.3 },
        "dominant_narratives": [
            { "narrative_name": "Solar", "narrative_type": "bull", "confidence_score": 0.9,
              "momentum_score": 0.7, "price_impact_direction": "Bullish" },
            { "narrative_name": "Dollar", "narrative_type": "bear", "confidence_score": 0.5,
              "momentum_score": 0.2, "price_impact_direction": "bearish" },
            { "narrative_name": "Mixed bag", "narrative_type": "neutral", "confidence_score": 0.4,
              "momentum_score": 0.4, "price_impact_direction": "bullish near-term, bearish later" },
            { "narrative_name": "Jewellery", "narrative_type": "neutral", "confidence_score": 0.3,
              "momentum_score": 0.3, "price_impact_direction": "flat" }
        ],
        "emerging_narratives": [
            { "theme": "Mine strikes", "confidence_score": 0.4, "risk_level": "medium",
              "monitoring_priority": "high", "why_it_matters": "Supply", "early_signals": ["Union talks"] }
        ]
    })
}

fn spec(fetcher: Arc<dyn SourceFetcher>) -> SourceSpec {
    SourceSpec {
        ttl: Duration::from_secs(60),
        fetcher,
        query: QuerySpec::none(),
        fallback: FallbackResolver::none(),
    }
}

/// Build the router the binary uses, over in-memory sources.
fn test_router() -> axum::Router {
    let pipeline = MarketPipeline::new(Arc::new(SnapshotCache::new()))
        .with_source(
            source_ids::NARRATIVE_WEBHOOK,
            spec(Arc::new(FixedDocument(json!([report()])))),
        )
        .with_source(source_ids::MARKET_PULSE, spec(Arc::new(Down)))
        .with_source(source_ids::PRICE_HISTORY, spec(Arc::new(Down)))
        .with_source(source_ids::SILVER_FUTURES, spec(Arc::new(Down)));
    api::router(AppState::new(pipeline, Settings::default()))
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();
    let req = axum::http::Request::get("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), common::BODY_LIMIT)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn login_accepts_gmail_and_rejects_others() {
    let app = test_router();

    let (status, _, body) = send(
        &app,
        "POST",
        "/login",
        Some(json!({ "name": "meera", "email": "meera@gmail.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "user_name": "meera", "initial": "M" }));

    let (status, _, body) = send(
        &app,
        "POST",
        "/login",
        Some(json!({ "name": "meera", "email": "meera@outlook.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Please enter a valid Gmail address."));
}

#[tokio::test]
async fn dashboard_shapes_the_webhook_report() {
    let app = test_router();
    let (status, _, body) = send(&app, "GET", "/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);

    let n = &body["narrative"];
    assert_eq!(n["provenance"], json!("live"));
    assert_eq!(n["degraded"], json!(false));
    let r = &n["data"];
    assert_eq!(r["signal"]["label"], json!("STRONG BUY"));
    assert_eq!(r["signal"]["confidence_label"], json!("82%"));
    assert_eq!(r["signal"]["high_confidence"], json!(true));
    assert_eq!(r["signal"]["tone"], json!("buy"));
    assert_eq!(
        r["radar"],
        json!([["Inflation Pressure", 60.0], ["Demand Growth", 30.0]])
    );
    assert_eq!(r["market_state"]["silver_trend"], json!("Sideways"));

    // "bull" is checked first: the mixed record lands in bullish only
    assert_eq!(r["buckets"]["bullish"].as_array().unwrap().len(), 2);
    assert_eq!(r["buckets"]["bearish"].as_array().unwrap().len(), 1);
    assert_eq!(r["buckets"]["neutral"].as_array().unwrap().len(), 1);

    assert_eq!(r["emerging"][0]["rank"], json!(1));
    assert_eq!(r["emerging"][0]["priority"], json!("high"));
    assert_eq!(r["emerging"][0]["risk_level"], json!("MEDIUM"));
    assert_eq!(r["missing_fields"], json!([]));

    // market sources are down with no fallback configured here
    assert_eq!(body["history"]["data"], Value::Null);
    assert_eq!(body["history"]["error"]["kind"], json!("unreachable"));
}

#[tokio::test]
async fn second_snapshot_read_is_a_cache_hit() {
    let app = test_router();
    let (_, h1, _) = send(&app, "GET", "/snapshot/narrative_webhook", None).await;
    let (_, h2, _) = send(&app, "GET", "/snapshot/narrative_webhook", None).await;
    assert_eq!(provenance_header(&h1), "live");
    assert_eq!(provenance_header(&h2), "cached");
}

#[tokio::test]
async fn dashboard_without_required_source_is_500() {
    let pipeline = MarketPipeline::new(Arc::new(SnapshotCache::new()));
    let app = api::router(AppState::new(pipeline, Settings::default()));
    let (status, _, body) = send(&app, "GET", "/dashboard/demo", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("unknown source: silver_futures"));
}
