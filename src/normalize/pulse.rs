//! Market pulse tiles and the intraday silver snapshot.

use serde::Serialize;

use super::series::{to_chart_series, PriceSeries};
use super::{classify_trend, compute_change, round2, Trend};
use crate::fetch::QuoteTable;

/// Which symbols play which role in a pulse batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseLayout {
    pub silver_symbol: String,
    pub fx_symbol: String,
    /// USD/INR shown when the FX instrument has no data.
    pub fx_default: f64,
    pub etf_symbols: Vec<String>,
}

impl Default for PulseLayout {
    fn default() -> Self {
        Self {
            silver_symbol: "SI=F".into(),
            fx_symbol: "INR=X".into(),
            fx_default: 83.0,
            etf_symbols: vec!["SLV".into(), "SIVR".into(), "SIL".into()],
        }
    }
}

impl PulseLayout {
    /// Batch order: silver, fx, then ETFs.
    pub fn symbols(&self) -> Vec<String> {
        let mut out = vec![self.silver_symbol.clone(), self.fx_symbol.clone()];
        out.extend(self.etf_symbols.iter().cloned());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentQuote {
    pub symbol: String,
    pub price: f64,
    pub change_pct: f64,
    pub trend: Trend,
}

impl InstrumentQuote {
    fn from_series(symbol: &str, series: &PriceSeries) -> Option<Self> {
        let price = series.last()?;
        let previous = series.previous().unwrap_or(price);
        let change_pct = compute_change(price, previous);
        Some(Self {
            symbol: symbol.to_string(),
            price: round2(price),
            change_pct,
            trend: classify_trend(change_pct),
        })
    }

    fn zero(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: 0.0,
            change_pct: 0.0,
            trend: Trend::Bullish,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPulse {
    pub silver: InstrumentQuote,
    pub usd_inr: f64,
    /// Only instruments that returned data, in layout order.
    pub etfs: Vec<InstrumentQuote>,
}

/// Total: missing instruments fall back to zero price / `fx_default`.
pub fn shape_pulse(table: &QuoteTable, layout: &PulseLayout) -> MarketPulse {
    let quote = |symbol: &str| {
        let series = to_chart_series(table.rows(symbol), symbol);
        InstrumentQuote::from_series(symbol, &series)
    };

    let silver = quote(layout.silver_symbol.as_str())
        .unwrap_or_else(|| InstrumentQuote::zero(&layout.silver_symbol));
    let usd_inr = to_chart_series(table.rows(&layout.fx_symbol), &layout.fx_symbol)
        .last()
        .map(round2)
        .unwrap_or(layout.fx_default);
    let etfs = layout
        .etf_symbols
        .iter()
        .filter_map(|s| quote(s.as_str()))
        .collect();

    MarketPulse {
        silver,
        usd_inr,
        etfs,
    }
}

/// Live silver tile with its recent history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SilverSnapshot {
    pub price: f64,
    pub change_pct: f64,
    pub trend: Trend,
    pub history: PriceSeries,
}

pub const INTRADAY_LABEL: &str = "Silver Price";

/// `None` when the symbol has no usable closes.
///
/// The tile shows the change from the displayed (rounded) price, unlike the
/// pulse which works from the raw close.
pub fn shape_intraday(table: &QuoteTable, symbol: &str) -> Option<SilverSnapshot> {
    let history = to_chart_series(table.rows(symbol), INTRADAY_LABEL);
    let price = round2(history.last()?);
    let previous = history.previous().unwrap_or(price);
    let change_pct = compute_change(price, previous);
    Some(SilverSnapshot {
        price,
        change_pct,
        trend: classify_trend(change_pct),
        history,
    })
}
