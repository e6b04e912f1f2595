use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fetch::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub ts: DateTime<Utc>,
    pub close: f64,
}

/// Chart-ready close prices, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    /// Display name of the value column; magnitudes are untouched.
    pub label: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn last(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Close before the last one. With a single row this is the last close
    /// itself, so the change against it is zero.
    pub fn previous(&self) -> Option<f64> {
        match self.points.len() {
            0 => None,
            1 => self.last(),
            n => Some(self.points[n - 2].close),
        }
    }
}

/// Drops gaps, keeps chronological order (stable on equal timestamps).
pub fn to_chart_series(rows: &[Candle], label: &str) -> PriceSeries {
    let mut points: Vec<PricePoint> = rows
        .iter()
        .filter_map(|c| match c.close {
            Some(close) if close.is_finite() => Some(PricePoint { ts: c.ts, close }),
            _ => None,
        })
        .collect();
    points.sort_by_key(|p| p.ts);
    PriceSeries {
        label: label.to_string(),
        points,
    }
}
