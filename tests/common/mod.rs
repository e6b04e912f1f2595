// tests/common/mod.rs
// Shared helpers: throwaway local HTTP servers and settings pointing at them.
#![allow(dead_code)]

use std::path::Path;

use axum::{
    body::{self, Body},
    Router,
};
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use agforecast::Settings;

pub const BODY_LIMIT: usize = 1024 * 1024;

/// Serve `router` on 127.0.0.1:0 in the background; returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on (bound, then released).
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

/// Settings with every remote pointed at the given bases and a fallback
/// file path that may or may not exist.
pub fn settings(webhook_base: &str, market_base: &str, fallback: &Path) -> Settings {
    let mut s = Settings::default();
    s.webhook.url = format!("{webhook_base}/webhook/narrative");
    s.webhook.timeout_secs = 5;
    s.webhook.fallback_path = fallback.to_path_buf();
    s.market_data.base_url = market_base.to_string();
    s.market_data.timeout_secs = 5;
    s
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, HeaderMap, Json) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v).expect("serialize body"))
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("build request"))
        .await
        .expect("router response");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, headers, json)
}

pub fn provenance_header(headers: &HeaderMap) -> String {
    headers
        .get("X-Snapshot-Provenance")
        .expect("X-Snapshot-Provenance header must be present")
        .to_str()
        .expect("ascii header")
        .to_string()
}

/// Yahoo v8 chart body with consecutive daily timestamps.
pub fn chart_body(closes: &[Option<f64>]) -> Json {
    let ts: Vec<i64> = (0..closes.len() as i64)
        .map(|i| 1_700_000_000 + i * 86_400)
        .collect();
    serde_json::json!({
        "chart": {
            "result": [{
                "timestamp": ts,
                "indicators": { "quote": [{ "close": closes }] }
            }],
            "error": null
        }
    })
}

pub fn chart_not_found() -> Json {
    serde_json::json!({
        "chart": {
            "result": null,
            "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
        }
    })
}
