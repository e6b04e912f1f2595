//! Narrative records and their bull/bear/neutral split.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{clamp01, number, text, text_list, title_case, NOT_AVAILABLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeKind {
    Bullish,
    Bearish,
    Neutral,
}

/// Case-insensitive substring match, "bull" checked first: a direction
/// mentioning both lands in `Bullish`.
pub fn classify_direction(impact_direction: &str) -> NarrativeKind {
    let d = impact_direction.to_lowercase();
    if d.contains("bull") {
        NarrativeKind::Bullish
    } else if d.contains("bear") {
        NarrativeKind::Bearish
    } else {
        NarrativeKind::Neutral
    }
}

/// One non-empty evidence category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceGroup {
    pub category: String,
    pub label: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeRecord {
    pub name: String,
    /// Derived from `impact_direction`, never read from the payload.
    pub kind: NarrativeKind,
    /// The payload's own type tag, upper-cased for card titles.
    pub type_label: String,
    pub confidence_score: f64,
    pub momentum_score: f64,
    pub impact_direction: String,
    pub impact_label: String,
    pub time_horizon: String,
    pub key_drivers: Vec<String>,
    pub reasoning_summary: String,
    /// Ordered as in the payload; empty categories are dropped.
    pub supporting_data: Vec<EvidenceGroup>,
}

impl NarrativeRecord {
    pub fn from_raw(obj: &Map<String, Value>) -> Self {
        let impact_direction = text(obj, "price_impact_direction").unwrap_or_default();
        let supporting_data = obj
            .get("supporting_data")
            .and_then(Value::as_object)
            .map(evidence_groups)
            .unwrap_or_default();

        Self {
            name: text(obj, "narrative_name").unwrap_or_else(|| "Unnamed narrative".to_string()),
            kind: classify_direction(&impact_direction),
            type_label: text(obj, "narrative_type")
                .map(|t| t.to_uppercase())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            confidence_score: number(obj, "confidence_score").map(clamp01).unwrap_or(0.0),
            momentum_score: number(obj, "momentum_score").map(clamp01).unwrap_or(0.0),
            impact_label: title_case(&impact_direction),
            impact_direction,
            time_horizon: text(obj, "expected_time_horizon")
                .map(|h| title_case(&h))
                .unwrap_or_default(),
            key_drivers: text_list(obj, "key_drivers"),
            reasoning_summary: text(obj, "reasoning_summary").unwrap_or_default(),
            supporting_data,
        }
    }

    /// Parses every object element of `list`; non-objects are skipped.
    pub fn parse_list(list: &[Value]) -> Vec<Self> {
        list.iter()
            .filter_map(Value::as_object)
            .map(Self::from_raw)
            .collect()
    }
}

fn evidence_groups(data: &Map<String, Value>) -> Vec<EvidenceGroup> {
    data.iter()
        .filter_map(|(category, items)| {
            let items: Vec<String> = match items {
                Value::Array(list) => list.iter().filter_map(super::as_text).collect(),
                other => super::as_text(other).into_iter().collect(),
            };
            if items.is_empty() {
                return None;
            }
            Some(EvidenceGroup {
                category: category.clone(),
                label: title_case(category),
                items,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NarrativeBuckets {
    pub bullish: Vec<NarrativeRecord>,
    pub bearish: Vec<NarrativeRecord>,
    pub neutral: Vec<NarrativeRecord>,
}

impl NarrativeBuckets {
    pub fn total(&self) -> usize {
        self.bullish.len() + self.bearish.len() + self.neutral.len()
    }
}

/// Each record lands in exactly one bucket, input order kept per bucket.
pub fn bucket_narratives(records: &[NarrativeRecord]) -> NarrativeBuckets {
    let mut out = NarrativeBuckets::default();
    for r in records {
        match classify_direction(&r.impact_direction) {
            NarrativeKind::Bullish => out.bullish.push(r.clone()),
            NarrativeKind::Bearish => out.bearish.push(r.clone()),
            NarrativeKind::Neutral => out.neutral.push(r.clone()),
        }
    }
    out
}

/// Point on the confidence × momentum matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativePoint {
    pub name: String,
    pub type_label: String,
    pub confidence: f64,
    pub momentum: f64,
    pub key_drivers: Vec<String>,
}

pub fn narrative_matrix(records: &[NarrativeRecord]) -> Vec<NarrativePoint> {
    records
        .iter()
        .map(|r| NarrativePoint {
            name: r.name.clone(),
            type_label: r.type_label.clone(),
            confidence: r.confidence_score,
            momentum: r.momentum_score,
            key_drivers: r.key_drivers.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// `high` / `medium`, anything else is `Low`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Priority::High => "red",
            Priority::Medium => "orange",
            Priority::Low => "green",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergingNarrative {
    /// 1-based position in the payload.
    pub rank: usize,
    pub theme: String,
    pub confidence_score: f64,
    pub risk_level: String,
    pub priority: Priority,
    pub why_it_matters: String,
    pub early_signals: Vec<String>,
}

pub fn parse_emerging(list: &[Value]) -> Vec<EmergingNarrative> {
    list.iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(idx, e)| EmergingNarrative {
            rank: idx + 1,
            theme: text(e, "theme").unwrap_or_else(|| "Untitled theme".to_string()),
            confidence_score: number(e, "confidence_score").map(clamp01).unwrap_or(0.0),
            risk_level: text(e, "risk_level")
                .map(|r| r.to_uppercase())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            priority: Priority::from_label(
                &text(e, "monitoring_priority").unwrap_or_else(|| "medium".to_string()),
            ),
            why_it_matters: text(e, "why_it_matters").unwrap_or_default(),
            early_signals: text_list(e, "early_signals"),
        })
        .collect()
}
