//! Main settings record.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::record::ConfigRecord;

/// Minimum refresh interval in seconds.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 5;
/// Maximum refresh interval in seconds (one day).
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 86_400;
pub const CHART_CANDLES_MIN: u32 = 50;
pub const CHART_CANDLES_MAX: u32 = 1000;
pub const MAX_ORDERS_MIN: u32 = 1;
pub const MAX_ORDERS_MAX: u32 = 100;
pub const MAX_DISTANCE_MIN: f64 = 1.0;
pub const MAX_DISTANCE_MAX: f64 = 10.0;
pub const CIRCLE_RANGE_MIN: f64 = 0.1;
pub const CIRCLE_RANGE_MAX: f64 = 10.0;

/// Whether the scheduler arms its own timer.
///
/// Older records stored the localised UI label; both forms are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataUpdateMode {
    #[default]
    #[serde(alias = "Automatic", alias = "Автоматически")]
    Automatic,
    #[serde(alias = "Manual", alias = "Вручную")]
    Manual,
}

/// Order types shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    #[serde(alias = "Все ордера")]
    All,
    #[serde(alias = "Лимитные")]
    Limit,
    #[serde(alias = "Рыночные")]
    Market,
}

/// Candle timeframe for the detail chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartTimeframe {
    #[serde(rename = "1m", alias = "1м")]
    M1,
    #[default]
    #[serde(rename = "5m", alias = "5м")]
    M5,
    #[serde(rename = "15m", alias = "15м")]
    M15,
    #[serde(rename = "1h", alias = "1ч")]
    H1,
    #[serde(rename = "4h", alias = "4ч")]
    H4,
    #[serde(rename = "1d", alias = "1д")]
    D1,
}

impl ChartTimeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }
}

impl fmt::Display for ChartTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide user settings.
///
/// Fields missing from a stored record take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub data_update: DataUpdateMode,
    /// Refresh interval in seconds, within 5..=86400.
    #[serde(deserialize_with = "de_rounded_u64")]
    pub data_update_interval: u64,
    pub order_type: OrderType,
    #[serde(deserialize_with = "de_rounded_u32")]
    pub chart_candles: u32,
    #[serde(deserialize_with = "de_rounded_u32")]
    pub max_orders: u32,
    /// Percent.
    pub max_distance: f64,
    pub show_small_circle: bool,
    /// Percent of the viewport.
    pub small_circle_range: f64,
    pub show_large_circle: bool,
    /// Percent of the viewport.
    pub large_circle_range: f64,
    pub chart_timeframe: ChartTimeframe,
    /// Upper-case, deduplicated symbols excluded from every cycle.
    pub blacklist: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_update: DataUpdateMode::Automatic,
            data_update_interval: MIN_UPDATE_INTERVAL_SECS,
            order_type: OrderType::All,
            chart_candles: 120,
            max_orders: 100,
            max_distance: 3.0,
            show_small_circle: true,
            small_circle_range: 1.0,
            show_large_circle: true,
            large_circle_range: 3.0,
            chart_timeframe: ChartTimeframe::M5,
            blacklist: BTreeSet::new(),
        }
    }
}

impl Settings {
    pub fn is_automatic(&self) -> bool {
        self.data_update == DataUpdateMode::Automatic
    }

    /// Refresh interval, clamped to the allowed range.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(
            self.data_update_interval
                .clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS),
        )
    }

    /// Small ring range when shown.
    pub fn small_circle(&self) -> Option<f64> {
        self.show_small_circle.then_some(self.small_circle_range)
    }

    /// Large ring range when shown.
    pub fn large_circle(&self) -> Option<f64> {
        self.show_large_circle.then_some(self.large_circle_range)
    }

    /// Copy with `symbol` added to the blacklist.
    #[must_use]
    pub fn with_blacklisted(&self, symbol: &str) -> Self {
        let mut next = self.clone();
        let symbol = normalize_symbol(symbol);
        if !symbol.is_empty() {
            next.blacklist.insert(symbol);
        }
        next
    }

    /// Copy with `symbol` removed from the blacklist.
    #[must_use]
    pub fn without_blacklisted(&self, symbol: &str) -> Self {
        let mut next = self.clone();
        next.blacklist.remove(&normalize_symbol(symbol));
        next
    }
}

/// Partial settings update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub data_update: Option<DataUpdateMode>,
    pub data_update_interval: Option<u64>,
    pub order_type: Option<OrderType>,
    pub chart_candles: Option<u32>,
    pub max_orders: Option<u32>,
    pub max_distance: Option<f64>,
    pub show_small_circle: Option<bool>,
    pub small_circle_range: Option<f64>,
    pub show_large_circle: Option<bool>,
    pub large_circle_range: Option<f64>,
    pub chart_timeframe: Option<ChartTimeframe>,
    pub blacklist: Option<Vec<String>>,
}

impl ConfigRecord for Settings {
    const KEY: &'static str = "density-map-settings";
    type Patch = SettingsPatch;

    fn apply_patch(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.data_update {
            self.data_update = v;
        }
        if let Some(v) = patch.data_update_interval {
            self.data_update_interval = v;
        }
        if let Some(v) = patch.order_type {
            self.order_type = v;
        }
        if let Some(v) = patch.chart_candles {
            self.chart_candles = v;
        }
        if let Some(v) = patch.max_orders {
            self.max_orders = v;
        }
        if let Some(v) = patch.max_distance {
            self.max_distance = v;
        }
        if let Some(v) = patch.show_small_circle {
            self.show_small_circle = v;
        }
        if let Some(v) = patch.small_circle_range {
            self.small_circle_range = v;
        }
        if let Some(v) = patch.show_large_circle {
            self.show_large_circle = v;
        }
        if let Some(v) = patch.large_circle_range {
            self.large_circle_range = v;
        }
        if let Some(v) = patch.chart_timeframe {
            self.chart_timeframe = v;
        }
        if let Some(list) = patch.blacklist {
            self.blacklist = list.into_iter().collect();
        }
    }

    fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut corrected = Vec::new();

        let interval = self
            .data_update_interval
            .clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS);
        if interval != self.data_update_interval {
            self.data_update_interval = interval;
            corrected.push("dataUpdateInterval");
        }

        let candles = self.chart_candles.clamp(CHART_CANDLES_MIN, CHART_CANDLES_MAX);
        if candles != self.chart_candles {
            self.chart_candles = candles;
            corrected.push("chartCandles");
        }

        let orders = self.max_orders.clamp(MAX_ORDERS_MIN, MAX_ORDERS_MAX);
        if orders != self.max_orders {
            self.max_orders = orders;
            corrected.push("maxOrders");
        }

        for (name, value, lo, hi, default) in [
            (
                "maxDistance",
                &mut self.max_distance,
                MAX_DISTANCE_MIN,
                MAX_DISTANCE_MAX,
                defaults.max_distance,
            ),
            (
                "smallCircleRange",
                &mut self.small_circle_range,
                CIRCLE_RANGE_MIN,
                CIRCLE_RANGE_MAX,
                defaults.small_circle_range,
            ),
            (
                "largeCircleRange",
                &mut self.large_circle_range,
                CIRCLE_RANGE_MIN,
                CIRCLE_RANGE_MAX,
                defaults.large_circle_range,
            ),
        ] {
            let fixed = if value.is_finite() {
                value.clamp(lo, hi)
            } else {
                default
            };
            if fixed != *value {
                *value = fixed;
                corrected.push(name);
            }
        }

        let normalized: BTreeSet<String> = self
            .blacklist
            .iter()
            .map(|s| normalize_symbol(s))
            .filter(|s| !s.is_empty())
            .collect();
        if normalized != self.blacklist {
            self.blacklist = normalized;
            corrected.push("blacklist");
        }

        corrected
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Accept any JSON number and round it; negatives and non-finite values become 0.
fn de_rounded_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let v = f64::deserialize(deserializer)?;
    Ok(if v.is_finite() && v > 0.0 {
        v.round() as u64
    } else {
        0
    })
}

fn de_rounded_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let v = f64::deserialize(deserializer)?;
    Ok(if v.is_finite() && v > 0.0 {
        v.round() as u32
    } else {
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.is_automatic());
        assert_eq!(s.update_interval(), Duration::from_secs(5));
        assert_eq!(s.chart_timeframe, ChartTimeframe::M5);
        assert_eq!(s.small_circle(), Some(1.0));
        assert_eq!(s.large_circle(), Some(3.0));
        assert!(s.blacklist.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["dataUpdate"], "automatic");
        assert_eq!(json["dataUpdateInterval"], 5);
        assert_eq!(json["chartTimeframe"], "5m");
        assert_eq!(json["orderType"], "all");
        assert!(json["blacklist"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_partial_record_merges_with_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"dataUpdate":"manual","blacklist":["BTC"]}"#).unwrap();
        assert_eq!(s.data_update, DataUpdateMode::Manual);
        assert_eq!(s.chart_candles, 120);
        assert!(s.blacklist.contains("BTC"));
    }

    #[test]
    fn test_legacy_labels_accepted() {
        let s: Settings = serde_json::from_str(
            r#"{"dataUpdate":"Вручную","orderType":"Лимитные","chartTimeframe":"4ч","dataUpdateInterval":7.6}"#,
        )
        .unwrap();
        assert_eq!(s.data_update, DataUpdateMode::Manual);
        assert_eq!(s.order_type, OrderType::Limit);
        assert_eq!(s.chart_timeframe, ChartTimeframe::H4);
        assert_eq!(s.data_update_interval, 8);

        let out = serde_json::to_value(&s).unwrap();
        assert_eq!(out["chartTimeframe"], "4h");
        assert_eq!(out["dataUpdate"], "manual");
    }

    #[test]
    fn test_sanitize_clamps_to_nearest_bound() {
        let mut s = Settings {
            data_update_interval: 1,
            chart_candles: 5000,
            max_orders: 0,
            max_distance: 0.2,
            small_circle_range: f64::NAN,
            large_circle_range: 42.0,
            blacklist: [" btc ", "BTC", "", "eth"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let corrected = s.sanitize();

        assert_eq!(s.data_update_interval, 5);
        assert_eq!(s.chart_candles, 1000);
        assert_eq!(s.max_orders, 1);
        assert_eq!(s.max_distance, 1.0);
        assert_eq!(s.small_circle_range, 1.0);
        assert_eq!(s.large_circle_range, 10.0);
        assert_eq!(
            s.blacklist.iter().cloned().collect::<Vec<_>>(),
            vec!["BTC".to_string(), "ETH".to_string()]
        );
        assert_eq!(corrected.len(), 7);
    }

    #[test]
    fn test_huge_interval_is_capped() {
        let mut s: Settings =
            serde_json::from_str(r#"{"dataUpdateInterval":1e300}"#).unwrap();
        assert_eq!(s.data_update_interval, u64::MAX);
        assert_eq!(s.update_interval(), Duration::from_secs(MAX_UPDATE_INTERVAL_SECS));

        assert_eq!(s.sanitize(), vec!["dataUpdateInterval"]);
        assert_eq!(s.data_update_interval, MAX_UPDATE_INTERVAL_SECS);
    }

    #[test]
    fn test_sanitize_leaves_valid_settings_alone() {
        let mut s = Settings::default();
        assert!(s.sanitize().is_empty());
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn test_blacklist_helpers() {
        let s = Settings::default().with_blacklisted(" doge ");
        assert!(s.blacklist.contains("DOGE"));
        let s = s.with_blacklisted("DOGE").with_blacklisted("  ");
        assert_eq!(s.blacklist.len(), 1);
        let s = s.without_blacklisted("doge");
        assert!(s.blacklist.is_empty());
    }

    #[test]
    fn test_apply_patch() {
        let mut s = Settings::default();
        s.apply_patch(SettingsPatch {
            data_update_interval: Some(30),
            show_large_circle: Some(false),
            blacklist: Some(vec!["XRP".to_string()]),
            ..Default::default()
        });
        assert_eq!(s.data_update_interval, 30);
        assert_eq!(s.large_circle(), None);
        assert!(s.blacklist.contains("XRP"));
        assert_eq!(s.chart_candles, 120);
    }
}
