//! Market-data provider backed by Yahoo's v8 chart API.
//!
//! A batch query walks its symbols one after another on the calling task;
//! there is no parallel fan-out. A failing symbol is recorded in its own
//! `InstrumentSeries::error` and the batch carries on. Only when every
//! symbol fails does the whole fetch fail.

use async_trait::async_trait;
use chrono::DateTime;
use metrics::counter;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Candle, InstrumentSeries, QuerySpec, QuoteTable, RawPayload, SourceFetcher};
use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    result: Option<Vec<ChartData>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Clone)]
pub struct YahooChartFetcher {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl YahooChartFetcher {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            symbol
        )
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        let resp = self
            .client
            .get(self.chart_url(symbol))
            .query(&[("range", range), ("interval", interval)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // unknown symbols come back as 404 with a chart error body
            if let Ok(chart) = serde_json::from_str::<ChartResponse>(&body) {
                if chart.chart.error.is_some() {
                    return parse_chart(symbol, chart);
                }
            }
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Unreachable(format!("reading chart body: {e}")))?;
        let chart: ChartResponse = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::ParseError(format!("chart response for {symbol}: {e}")))?;
        parse_chart(symbol, chart)
    }
}

fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Candle>, FetchError> {
    let result = match resp.chart.result {
        Some(r) => r,
        None => {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => {
                    FetchError::NoData(format!("symbol not found: {symbol}"))
                }
                Some(err) => FetchError::ParseError(format!("{}: {}", err.code, err.description)),
                None => FetchError::NoData(format!("empty chart result for {symbol}")),
            })
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Err(FetchError::NoData(format!("empty chart result for {symbol}")));
    };
    let timestamps = data.timestamp.unwrap_or_default();
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.into_iter().enumerate() {
        let Some(ts) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        rows.push(Candle {
            ts,
            close: closes.get(i).copied().flatten(),
        });
    }

    if rows.is_empty() {
        return Err(FetchError::NoData(format!("no rows for {symbol}")));
    }
    Ok(rows)
}

#[async_trait]
impl SourceFetcher for YahooChartFetcher {
    async fn fetch(&self, query: &QuerySpec) -> Result<RawPayload, FetchError> {
        if query.symbols.is_empty() {
            return Err(FetchError::NoData("no symbols requested".into()));
        }

        let mut table = QuoteTable::default();
        let mut first_err: Option<FetchError> = None;

        for symbol in &query.symbols {
            match self
                .fetch_symbol(symbol, &query.range, &query.interval)
                .await
            {
                Ok(rows) => table.instruments.push(InstrumentSeries {
                    symbol: symbol.clone(),
                    rows,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(target: "fetch", %symbol, error = %e, "instrument fetch failed");
                    counter!("market_data_instrument_errors_total", "kind" => e.kind().as_str())
                        .increment(1);
                    table.instruments.push(InstrumentSeries {
                        symbol: symbol.clone(),
                        rows: Vec::new(),
                        error: Some(e.detail()),
                    });
                    first_err.get_or_insert(e);
                }
            }
        }

        let all_failed = table.instruments.iter().all(|s| s.error.is_some());
        match first_err {
            Some(e) if all_failed => Err(e),
            _ => Ok(RawPayload::Quotes(table)),
        }
    }

    fn name(&self) -> &'static str {
        "yahoo_chart"
    }
}
