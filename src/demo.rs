//! Hardcoded dataset behind the demo dashboard. Only the intraday silver
//! tile is live; everything here is static.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Growth {
    Fast,
    Slow,
    Organic,
}

impl Growth {
    /// Map fill color.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Growth::Fast => [255, 0, 0],
            Growth::Slow => [255, 165, 0],
            Growth::Organic => [0, 200, 0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeAgent {
    pub agent: &'static str,
    pub category: &'static str,
    pub coordination_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadPoint {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub growth: Growth,
    pub intensity: u32,
    pub color: [u8; 3],
    /// Marker radius in meters, scaled from intensity per map.
    pub radius_m: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBar {
    pub sentiment: &'static str,
    pub probability: u8,
}

const WORLD_RADIUS_SCALE: u32 = 12_000;
const INDIA_RADIUS_SCALE: u32 = 2_000;

pub fn narrative_agents() -> Vec<NarrativeAgent> {
    [
        ("SN-01", "Industrial Demand", 78),
        ("SN-02", "Tech & EV Trends", 66),
        ("SN-03", "Jewellery", 71),
    ]
    .into_iter()
    .map(|(agent, category, coordination_score)| NarrativeAgent {
        agent,
        category,
        coordination_score,
    })
    .collect()
}

/// Distinct categories in first-seen order.
pub fn categories(agents: &[NarrativeAgent]) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for a in agents {
        if !out.contains(&a.category) {
            out.push(a.category);
        }
    }
    out
}

fn spread(rows: &[(&'static str, f64, f64, Growth, u32)], scale: u32) -> Vec<SpreadPoint> {
    rows.iter()
        .map(|&(name, lat, lon, growth, intensity)| SpreadPoint {
            name,
            lat,
            lon,
            growth,
            intensity,
            color: growth.rgb(),
            radius_m: intensity * scale,
        })
        .collect()
}

pub fn geo_world() -> Vec<SpreadPoint> {
    spread(
        &[
            ("India", 20.6, 78.9, Growth::Fast, 90),
            ("USA", 37.1, -95.7, Growth::Fast, 80),
            ("China", 35.8, 104.1, Growth::Slow, 65),
            ("Germany", 51.1, 10.4, Growth::Organic, 45),
            ("UK", 55.3, -3.4, Growth::Slow, 55),
        ],
        WORLD_RADIUS_SCALE,
    )
}

pub fn geo_india() -> Vec<SpreadPoint> {
    spread(
        &[
            ("Mumbai", 19.07, 72.87, Growth::Fast, 85),
            ("Delhi", 28.61, 77.20, Growth::Fast, 75),
            ("Ahmedabad", 23.02, 72.57, Growth::Slow, 65),
            ("Chennai", 13.08, 80.27, Growth::Organic, 55),
        ],
        INDIA_RADIUS_SCALE,
    )
}

pub fn forecast() -> Vec<ForecastBar> {
    vec![
        ForecastBar {
            sentiment: "Bullish",
            probability: 72,
        },
        ForecastBar {
            sentiment: "Bearish",
            probability: 28,
        },
    ]
}
