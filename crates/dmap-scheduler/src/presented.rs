//! What the display reads.

use chrono::{DateTime, Utc};
use dmap_core::{DensityBand, Ring};
use serde::Serialize;

use crate::machine::SchedulerState;

/// One asset as drawn on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedAsset {
    pub symbol: String,
    pub display_symbol: String,
    #[serde(rename = "volume24h")]
    pub volume_24h: f64,
    pub price_change_24h_pct: f64,
    pub volatility_24h_pct: f64,
    pub score: f64,
    pub band: DensityBand,
    pub x: f64,
    pub y: f64,
    pub distance: f64,
    pub distance_percent: f64,
}

/// Output of the latest applied cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedSet {
    pub cycle: u64,
    pub state: SchedulerState,
    pub assets: Vec<PresentedAsset>,
    pub rings: Vec<Ring>,
    /// Tickers in the fetch the assets were derived from, before filtering.
    pub source_count: usize,
    /// Non-blocking error indicator from the last failed load.
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PresentedSet {
    pub fn symbols(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.symbol.as_str()).collect()
    }
}
