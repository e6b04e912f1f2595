// src/normalize/mod.rs
//! Shape normalizer: pure functions from raw payloads to display-ready
//! structures. No I/O, no panics, no errors: incomplete input yields
//! documented defaults.

pub mod narrative;
pub mod pulse;
pub mod report;
pub mod series;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use narrative::{bucket_narratives, NarrativeBuckets, NarrativeKind, NarrativeRecord};
pub use pulse::{shape_intraday, shape_pulse, InstrumentQuote, MarketPulse, PulseLayout};
pub use report::{shape_report, NarrativeReport, SignalView};
pub use series::{to_chart_series, PricePoint, PriceSeries};

/// Placeholder for absent text fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Direction of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Bullish => "Bullish",
            Trend::Bearish => "Bearish",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Bullish => "▲",
            Trend::Bearish => "▼",
        }
    }
}

/// Rounds half away from zero to 2 decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `(current - previous) / previous * 100`, 2 decimals. A zero (or
/// non-finite) previous value yields 0.
pub fn compute_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return 0.0;
    }
    round2((current - previous) / previous * 100.0)
}

/// Zero counts as bullish.
pub fn classify_trend(percent_change: f64) -> Trend {
    if percent_change >= 0.0 {
        Trend::Bullish
    } else {
        Trend::Bearish
    }
}

/// Title-cases like a word processor: a letter is upper-cased when the
/// previous character is not a letter, lower-cased otherwise.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(ch);
            prev_cased = false;
        }
    }
    out
}

/// `inflation_pressure` → `Inflation Pressure`.
pub fn label_from_key(key: &str) -> String {
    title_case(&key.replace(['_', '-'], " "))
}

/// Ordered `(label, percent)` pairs from a `{key: fraction}` map, in the
/// map's own key order. Non-numeric values count as 0.
pub fn radar_coordinates(macro_pressure: &Map<String, Value>) -> Vec<(String, f64)> {
    macro_pressure
        .iter()
        .map(|(k, v)| (label_from_key(k), round2(as_number(v).unwrap_or(0.0) * 100.0)))
        .collect()
}

/// `0.82` → `"82%"`.
pub fn percent_label(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

// ---- lenient field access -------------------------------------------------

pub(crate) fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|x| x.is_finite())
}

pub(crate) fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(as_text)
}

pub(crate) fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(as_number)
}

pub(crate) fn object<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

pub(crate) fn array<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn text_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    array(obj, key).iter().filter_map(as_text).collect()
}

pub(crate) fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
