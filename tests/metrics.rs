// tests/metrics.rs
mod common;

use http::{Request, StatusCode};

use common::{dead_url, send, settings};

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let tmp = tempfile::tempdir().unwrap();
    let s = settings(&dead_url().await, &dead_url().await, &tmp.path().join("none.json"));
    let app = agforecast::app_with_settings(s).expect("app() should build Router in tests");

    // one miss + fetch error + degraded pulse, then a no-data history read
    send(&app, "GET", "/snapshot/market_pulse", None).await;
    send(&app, "GET", "/snapshot/silver_history", None).await;

    let req = Request::get("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = axum::body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "snapshot_cache_misses_total",
        "snapshot_fetch_errors_total",
        "snapshot_degraded_total",
        "snapshot_no_data_total",
        "snapshot_cache_ttl_secs",
    ] {
        assert!(text.contains(needle), "missing metric {needle} in:\n{text}");
    }
}
