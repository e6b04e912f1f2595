// src/fetch/mod.rs
//! Source fetchers: one remote round per call, no local mutation.
//!
//! Two kinds of remote sources exist: the narrative webhook (one JSON
//! document) and the market-data provider (close-price tables per symbol).
//! Both implement [`SourceFetcher`] so the pipeline treats them uniformly.

pub mod webhook;
pub mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FetchError;

/// What to ask a source for. Webhook sources ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    pub symbols: Vec<String>,
    /// Lookback window, e.g. "2d", "1mo".
    pub range: String,
    /// Sampling interval, e.g. "1d", "30m".
    pub interval: String,
}

impl QuerySpec {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn instruments<S: Into<String>>(
        symbols: impl IntoIterator<Item = S>,
        range: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            range: range.into(),
            interval: interval.into(),
        }
    }
}

/// One row of a time-indexed close-price table. `close` is `None` when the
/// provider reported a gap (holiday, halted session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: DateTime<Utc>,
    pub close: Option<f64>,
}

/// Result of one instrument inside a batch query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSeries {
    pub symbol: String,
    #[serde(default)]
    pub rows: Vec<Candle>,
    /// Set when this instrument failed; the rest of the batch is unaffected.
    #[serde(default)]
    pub error: Option<String>,
}

/// Batch result in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteTable {
    #[serde(default)]
    pub instruments: Vec<InstrumentSeries>,
}

impl QuoteTable {
    /// Reads a table back out of a snapshot payload. Never fails: a payload
    /// of the wrong shape yields an empty table.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(payload.clone())).unwrap_or_default()
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentSeries> {
        self.instruments.iter().find(|s| s.symbol == symbol)
    }

    /// Rows for `symbol`; empty when the symbol is absent or failed.
    pub fn rows(&self, symbol: &str) -> &[Candle] {
        self.get(symbol).map(|s| s.rows.as_slice()).unwrap_or(&[])
    }
}

/// Raw result of a fetch, before it becomes a snapshot payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Document(Value),
    Quotes(QuoteTable),
}

impl RawPayload {
    /// Converts into the mapping stored in a `MarketSnapshot`.
    pub fn into_payload(self) -> Result<Map<String, Value>, FetchError> {
        match self {
            RawPayload::Document(v) => unwrap_document(v),
            RawPayload::Quotes(table) => match serde_json::to_value(table)? {
                Value::Object(m) => Ok(m),
                _ => Err(FetchError::ParseError("quote table is not an object".into())),
            },
        }
    }
}

/// Accepts a single object or a sequence whose first element is the object.
/// Only the first record of a multi-record sequence is ever used.
pub fn unwrap_document(v: Value) -> Result<Map<String, Value>, FetchError> {
    let v = match v {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NoData("document is an empty sequence".into()))?,
        other => other,
    };
    match v {
        Value::Object(m) if m.is_empty() => {
            Err(FetchError::NoData("document is an empty object".into()))
        }
        Value::Object(m) => Ok(m),
        other => Err(FetchError::ParseError(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, query: &QuerySpec) -> Result<RawPayload, FetchError>;
    fn name(&self) -> &'static str;
}
