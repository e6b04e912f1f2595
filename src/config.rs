// src/config.rs
//! Named settings for every source, TTL and threshold the pipeline uses.
//!
//! Lookup order:
//! 1) $AGFORECAST_CONFIG_PATH (must exist)
//! 2) config/agforecast.toml
//! 3) built-in defaults
//!
//! Env overrides are applied on top of whichever of those won.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::normalize::PulseLayout;

pub const ENV_CONFIG_PATH: &str = "AGFORECAST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/agforecast.toml";
pub const ENV_WEBHOOK_URL: &str = "AGFORECAST_WEBHOOK_URL";
pub const ENV_FALLBACK_PATH: &str = "AGFORECAST_FALLBACK_PATH";
pub const ENV_MARKET_DATA_URL: &str = "AGFORECAST_MARKET_DATA_URL";

fn default_threshold() -> f64 {
    0.75
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub url: String,
    pub timeout_secs: u64,
    /// Persisted snapshot served when the webhook is down. Read-only.
    pub fallback_path: PathBuf,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:5678/webhook/narrative".into(),
            timeout_secs: 20,
            fallback_path: PathBuf::from("data/narrative_snapshot.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub silver_symbol: String,
    pub fx_symbol: String,
    pub fx_default: f64,
    pub etf_symbols: Vec<String>,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        let layout = PulseLayout::default();
        Self {
            base_url: crate::fetch::yahoo::DEFAULT_BASE_URL.into(),
            timeout_secs: 10,
            silver_symbol: layout.silver_symbol,
            fx_symbol: layout.fx_symbol,
            fx_default: layout.fx_default,
            etf_symbols: layout.etf_symbols,
        }
    }
}

impl MarketDataSettings {
    pub fn pulse_layout(&self) -> PulseLayout {
        PulseLayout {
            silver_symbol: self.silver_symbol.clone(),
            fx_symbol: self.fx_symbol.clone(),
            fx_default: self.fx_default,
            etf_symbols: self.etf_symbols.clone(),
        }
    }
}

/// One TTL per source, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlSettings {
    pub narrative_secs: u64,
    pub pulse_secs: u64,
    pub history_secs: u64,
    pub intraday_secs: u64,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            narrative_secs: 600,
            pulse_secs: 300,
            history_secs: 3600,
            intraday_secs: 300,
        }
    }
}

impl TtlSettings {
    pub fn narrative(&self) -> Duration {
        Duration::from_secs(self.narrative_secs)
    }
    pub fn pulse(&self) -> Duration {
        Duration::from_secs(self.pulse_secs)
    }
    pub fn history(&self) -> Duration {
        Duration::from_secs(self.history_secs)
    }
    pub fn intraday(&self) -> Duration {
        Duration::from_secs(self.intraday_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub email_suffix: String,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            email_suffix: "@gmail.com".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    /// Strict `>`: a confidence equal to the threshold is not "high".
    #[serde(default = "default_threshold")]
    pub high_confidence_threshold: f64,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            high_confidence_threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub webhook: WebhookSettings,
    pub market_data: MarketDataSettings,
    pub ttl: TtlSettings,
    pub login: LoginSettings,
    pub signal: SignalSettings,
}

impl Settings {
    /// Parse a TOML file. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let mut s: Settings = toml::from_str(&content)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        s.sanitize();
        Ok(s)
    }

    /// Resolve the file by the documented lookup order, then apply env
    /// overrides.
    pub fn load_default() -> Result<Self> {
        let mut s = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Settings::default()
            }
        };
        s.apply_env();
        s.sanitize();
        Ok(s)
    }

    fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_WEBHOOK_URL) {
            self.webhook.url = url;
        }
        if let Some(p) = non_empty_env(ENV_FALLBACK_PATH) {
            self.webhook.fallback_path = PathBuf::from(p);
        }
        if let Some(url) = non_empty_env(ENV_MARKET_DATA_URL) {
            self.market_data.base_url = url;
        }
    }

    /// Invalid values are replaced rather than rejected.
    fn sanitize(&mut self) {
        let t = self.signal.high_confidence_threshold;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            self.signal.high_confidence_threshold = default_threshold();
        }
        if !self.market_data.fx_default.is_finite() || self.market_data.fx_default <= 0.0 {
            self.market_data.fx_default = MarketDataSettings::default().fx_default;
        }
        self.market_data.etf_symbols.retain(|s| !s.trim().is_empty());
        // a zero timeout fails every request before it is sent
        self.webhook.timeout_secs = self.webhook.timeout_secs.max(1);
        self.market_data.timeout_secs = self.market_data.timeout_secs.max(1);
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
