//! Shaping of the narrative webhook document into the dashboard report.
//!
//! This is the single boundary where "maybe-present" JSON becomes typed,
//! defaulted structures. Absent top-level sections are recorded in
//! `missing_fields` and replaced by their defaults.

use serde::Serialize;
use serde_json::{Map, Value};

use super::narrative::{
    bucket_narratives, narrative_matrix, parse_emerging, EmergingNarrative, NarrativeBuckets,
    NarrativePoint, NarrativeRecord,
};
use super::{
    array, label_from_key, number, object, percent_label, radar_coordinates, text, text_list,
    title_case, NOT_AVAILABLE,
};

/// Top-level keys the report is built from.
pub const REPORT_SECTIONS: [&str; 6] = [
    "market_state",
    "market_summary",
    "trading_signal",
    "macro_pressure_index",
    "dominant_narratives",
    "emerging_narratives",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketState {
    pub macro_regime: String,
    pub silver_trend: String,
    pub volatility_level: String,
}

impl MarketState {
    fn from_raw(obj: &Map<String, Value>) -> Self {
        let or_na = |key: &str| text(obj, key).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            macro_regime: or_na("macro_regime"),
            silver_trend: title_case(&or_na("silver_trend")),
            volatility_level: title_case(&or_na("volatility_level")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub current_market_story: String,
    pub forward_outlook: String,
}

impl MarketSummary {
    fn from_raw(obj: &Map<String, Value>) -> Self {
        Self {
            current_market_story: text(obj, "current_market_story")
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            forward_outlook: text(obj, "forward_outlook")
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTone {
    Buy,
    Sell,
    Neutral,
}

impl SignalTone {
    /// "neutral" wins over "buy"; anything else reads as a sell.
    pub fn from_label(label: &str) -> Self {
        let l = label.to_lowercase();
        if l.contains("neutral") {
            SignalTone::Neutral
        } else if l.contains("buy") {
            SignalTone::Buy
        } else {
            SignalTone::Sell
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalView {
    /// `strong_buy` → `STRONG BUY`.
    pub label: String,
    pub confidence: f64,
    pub confidence_label: String,
    /// Strictly above the configured threshold.
    pub high_confidence: bool,
    pub tone: SignalTone,
    pub reasoning: Vec<String>,
}

impl SignalView {
    pub fn from_raw(obj: &Map<String, Value>, threshold: f64) -> Self {
        let label = text(obj, "signal")
            .unwrap_or_else(|| "NEUTRAL".to_string())
            .to_uppercase()
            .replace('_', " ");
        let confidence = number(obj, "confidence").unwrap_or(0.0);
        Self {
            tone: SignalTone::from_label(&label),
            label,
            confidence,
            confidence_label: percent_label(confidence),
            high_confidence: confidence > threshold,
            reasoning: text_list(obj, "reasoning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroMetric {
    pub key: String,
    pub label: String,
    pub percent: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeReport {
    pub market_state: MarketState,
    pub market_summary: MarketSummary,
    pub signal: SignalView,
    pub macro_metrics: Vec<MacroMetric>,
    pub radar: Vec<(String, f64)>,
    pub narratives: Vec<NarrativeRecord>,
    pub matrix: Vec<NarrativePoint>,
    pub buckets: NarrativeBuckets,
    pub emerging: Vec<EmergingNarrative>,
    /// Top-level sections absent from the document.
    pub missing_fields: Vec<String>,
}

/// Total over any object: never fails, never panics.
pub fn shape_report(doc: &Map<String, Value>, high_confidence_threshold: f64) -> NarrativeReport {
    let empty = Map::new();
    let section = |key: &str| object(doc, key).unwrap_or(&empty);

    let missing_fields: Vec<String> = REPORT_SECTIONS
        .iter()
        .filter(|k| !doc.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    if !missing_fields.is_empty() {
        tracing::debug!(target: "normalize", missing = ?missing_fields, "report sections defaulted");
    }

    let macro_map = section("macro_pressure_index");
    let macro_metrics = macro_map
        .iter()
        .map(|(k, v)| {
            let fraction = super::as_number(v).unwrap_or(0.0);
            MacroMetric {
                key: k.clone(),
                label: label_from_key(k),
                percent: super::round2(fraction * 100.0),
                display: percent_label(fraction),
            }
        })
        .collect();

    let narratives = NarrativeRecord::parse_list(array(doc, "dominant_narratives"));

    NarrativeReport {
        market_state: MarketState::from_raw(section("market_state")),
        market_summary: MarketSummary::from_raw(section("market_summary")),
        signal: SignalView::from_raw(section("trading_signal"), high_confidence_threshold),
        macro_metrics,
        radar: radar_coordinates(macro_map),
        matrix: narrative_matrix(&narratives),
        buckets: bucket_narratives(&narratives),
        narratives,
        emerging: parse_emerging(array(doc, "emerging_narratives")),
        missing_fields,
    }
}
