//! # Market Snapshot
//! The canonical unit handed from the acquisition stages to the shapers.
//!
//! A snapshot's `payload` is always complete: fetchers either produce the
//! whole document or fail, so a partially populated payload never exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known source ids.
pub mod source_ids {
    /// Narrative workflow webhook (qualitative report).
    pub const NARRATIVE_WEBHOOK: &str = "narrative_webhook";
    /// Intraday silver futures quote + 7d/30m history.
    pub const SILVER_FUTURES: &str = "silver_futures";
    /// Batch of silver, USD/INR and ETF quotes.
    pub const MARKET_PULSE: &str = "market_pulse";
    /// One month of daily silver closes.
    pub const PRICE_HISTORY: &str = "silver_history";

    pub const ALL: [&str; 4] = [NARRATIVE_WEBHOOK, SILVER_FUTURES, MARKET_PULSE, PRICE_HISTORY];
}

/// Where a snapshot's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    Cached,
    FallbackFile,
    Default,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Cached => "cached",
            Provenance::FallbackFile => "fallback_file",
            Provenance::Default => "default",
        }
    }

    /// Anything but `Live` must be flagged to the user.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Provenance::Live)
    }

    /// Short status badge for the sidebar.
    pub fn badge(&self) -> &'static str {
        match self {
            Provenance::Live => "Source: Live Workflow",
            Provenance::Cached => "Source: Cached Snapshot",
            Provenance::FallbackFile => "Offline Mode",
            Provenance::Default => "Offline Mode (defaults)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub source_id: String,
    pub payload: Map<String, Value>,
    pub fetched_at: DateTime<Utc>,
    pub provenance: Provenance,
}

impl MarketSnapshot {
    /// New snapshot stamped with the current time.
    pub fn new(
        source_id: impl Into<String>,
        payload: Map<String, Value>,
        provenance: Provenance,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            payload,
            fetched_at: Utc::now(),
            provenance,
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Equal in everything but provenance.
    pub fn same_content(&self, other: &MarketSnapshot) -> bool {
        self.source_id == other.source_id
            && self.payload == other.payload
            && self.fetched_at == other.fetched_at
    }
}
