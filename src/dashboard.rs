//! Render-pass assembly for both dashboards.
//!
//! One pass reads every snapshot it needs first, then shapes, so cache
//! reads and writes never interleave with normalization.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::demo::{self, ForecastBar, NarrativeAgent, SpreadPoint};
use crate::fallback::ErrorView;
use crate::fetch::QuoteTable;
use crate::normalize::pulse::SilverSnapshot;
use crate::normalize::{
    shape_intraday, shape_pulse, shape_report, to_chart_series, MarketPulse, NarrativeReport,
    PriceSeries, PulseLayout, NOT_AVAILABLE,
};
use crate::pipeline::{MarketPipeline, PipelineError, SnapshotView};
use crate::snapshot::{source_ids, Provenance};

pub const HISTORY_LABEL: &str = "Price (USD)";

const NARRATIVE_NO_DATA: &str =
    "No data received from the narrative workflow. Check the fallback snapshot file.";
const PULSE_NO_DATA: &str = "Market pulse unavailable.";
const HISTORY_NO_DATA: &str = "Price history unavailable.";
const INTRADAY_NO_DATA: &str = "Live silver market data unavailable.";

/// One dashboard section with the provenance of the snapshot behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section<T> {
    pub provenance: Option<Provenance>,
    /// Anything but live, including no data at all.
    pub degraded: bool,
    pub badge: Option<&'static str>,
    pub error: Option<ErrorView>,
    /// Set in the no-data state.
    pub notice: Option<String>,
    pub data: Option<T>,
}

impl<T> Section<T> {
    fn shape<F>(view: SnapshotView, no_data: &str, f: F) -> Self
    where
        F: FnOnce(&Map<String, Value>) -> Option<T>,
    {
        let data = view.payload.as_ref().and_then(f);
        Self {
            provenance: view.provenance,
            degraded: view.provenance.map_or(true, |p| p.is_degraded()),
            badge: view.provenance.map(|p| p.badge()),
            error: view.error,
            notice: data.is_none().then(|| no_data.to_string()),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeDashboard {
    pub narrative: Section<NarrativeReport>,
    pub pulse: Section<MarketPulse>,
    pub history: Section<PriceSeries>,
}

/// Webhook-backed dashboard.
pub async fn build_dashboard(
    pipeline: &MarketPipeline,
    layout: &PulseLayout,
    high_confidence_threshold: f64,
) -> Result<NarrativeDashboard, PipelineError> {
    let narrative = pipeline.get_snapshot(source_ids::NARRATIVE_WEBHOOK).await?;
    let pulse = pipeline.get_snapshot(source_ids::MARKET_PULSE).await?;
    let history = pipeline.get_snapshot(source_ids::PRICE_HISTORY).await?;

    Ok(NarrativeDashboard {
        narrative: Section::shape(narrative, NARRATIVE_NO_DATA, |p| {
            Some(shape_report(p, high_confidence_threshold))
        }),
        pulse: Section::shape(pulse, PULSE_NO_DATA, |p| {
            Some(shape_pulse(&QuoteTable::from_payload(p), layout))
        }),
        history: Section::shape(history, HISTORY_NO_DATA, |p| {
            let table = QuoteTable::from_payload(p);
            let series = to_chart_series(table.rows(&layout.silver_symbol), HISTORY_LABEL);
            (!series.is_empty()).then_some(series)
        }),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoKpis {
    pub narratives: usize,
    pub countries: usize,
    pub trend: String,
    pub volatility: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoDashboard {
    pub kpis: DemoKpis,
    pub market: Section<SilverSnapshot>,
    pub agents: Vec<NarrativeAgent>,
    pub categories: Vec<&'static str>,
    pub world: Vec<SpreadPoint>,
    pub india: Vec<SpreadPoint>,
    pub forecast: Vec<ForecastBar>,
}

/// Mock-data dashboard; only the intraday silver tile is live.
pub async fn build_demo(
    pipeline: &MarketPipeline,
    silver_symbol: &str,
) -> Result<DemoDashboard, PipelineError> {
    let intraday = pipeline.get_snapshot(source_ids::SILVER_FUTURES).await?;
    let market = Section::shape(intraday, INTRADAY_NO_DATA, |p| {
        shape_intraday(&QuoteTable::from_payload(p), silver_symbol)
    });

    let agents = demo::narrative_agents();
    let world = demo::geo_world();
    Ok(DemoDashboard {
        kpis: DemoKpis {
            narratives: agents.len(),
            countries: world.len(),
            trend: market
                .data
                .as_ref()
                .map(|m| format!("{} {}", m.trend.label(), m.trend.arrow()))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            volatility: "High",
        },
        market,
        categories: demo::categories(&agents),
        agents,
        world,
        india: demo::geo_india(),
        forecast: demo::forecast(),
    })
}
