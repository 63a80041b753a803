//! Density scoring.
//!
//! `score = 100 * (0.5 * log10(volume + 1) / 10 + 0.3 * volatility / 100 + 0.2 * |change| / 100)`
//!
//! The volume term is logarithmic and unbounded above. It is not clamped, so
//! very large turnovers can push the total past 100.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::AssetSnapshot;

pub const VOLUME_WEIGHT: f64 = 0.5;
pub const VOLATILITY_WEIGHT: f64 = 0.3;
pub const PRICE_CHANGE_WEIGHT: f64 = 0.2;

/// Scores strictly above this are `High`.
pub const HIGH_THRESHOLD: f64 = 70.0;
/// Scores strictly above this (and not `High`) are `Medium`.
pub const MEDIUM_THRESHOLD: f64 = 40.0;

/// Weighted components of one score, each already scaled to the 0-100 range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityScore {
    pub volume: f64,
    pub volatility: f64,
    pub price_change: f64,
}

impl DensityScore {
    pub fn of(snapshot: &AssetSnapshot) -> Self {
        let volume = non_negative(snapshot.volume_24h);
        let volatility = non_negative(snapshot.volatility_24h_pct);
        let change = finite_or_zero(snapshot.price_change_24h_pct).abs();

        Self {
            volume: 100.0 * VOLUME_WEIGHT * (volume + 1.0).log10() / 10.0,
            volatility: 100.0 * VOLATILITY_WEIGHT * volatility / 100.0,
            price_change: 100.0 * PRICE_CHANGE_WEIGHT * change / 100.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.volume + self.volatility + self.price_change
    }

    pub fn band(&self) -> DensityBand {
        DensityBand::from_score(self.total())
    }
}

/// Composite density score. Always finite and non-negative.
pub fn score(snapshot: &AssetSnapshot) -> f64 {
    DensityScore::of(snapshot).total()
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn non_negative(v: f64) -> f64 {
    finite_or_zero(v).max(0.0)
}

/// Classification band used for colouring and band filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityBand {
    Low,
    Medium,
    High,
}

impl DensityBand {
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            Self::High
        } else if score > MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Display colour (hex) for the band.
    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "#22c55e",
            Self::Medium => "#f59e0b",
            Self::Low => "#ef4444",
        }
    }
}

impl fmt::Display for DensityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_zero_volume_contributes_nothing() {
        let s = AssetSnapshot::new("X", 0.0, 0.0, 0.0);
        assert_eq!(score(&s), 0.0);
    }

    #[test]
    fn test_formula_matches_components() {
        let s = AssetSnapshot::new("BTCUSDT", 5e9, 2.0, 3.0);
        let expected = 100.0 * (0.5 * (5e9f64 + 1.0).log10() / 10.0 + 0.3 * 0.03 + 0.2 * 0.02);
        assert!(approx(score(&s), expected));
        assert!(approx(score(&s), 49.794_850));
        assert_eq!(DensityScore::of(&s).band(), DensityBand::Medium);
    }

    #[test]
    fn test_price_change_uses_absolute_value() {
        let up = AssetSnapshot::new("A", 1e6, 10.0, 5.0);
        let down = AssetSnapshot::new("A", 1e6, -10.0, 5.0);
        assert!(approx(score(&up), score(&down)));
    }

    #[test]
    fn test_degenerate_inputs_stay_finite() {
        for s in [
            AssetSnapshot::new("A", f64::NAN, f64::INFINITY, f64::NEG_INFINITY),
            AssetSnapshot::new("B", -1.0, -5.0, -2.0),
            AssetSnapshot::new("C", f64::MAX, 0.0, 0.0),
        ] {
            let v = score(&s);
            assert!(v.is_finite(), "{} produced {v}", s.symbol);
            assert!(v >= 0.0);
        }
    }

    #[test]
    fn test_volume_term_is_not_clamped() {
        let s = AssetSnapshot::new("HUGE", 1e25, 100.0, 100.0);
        assert!(score(&s) > 100.0);
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(DensityBand::from_score(70.0001), DensityBand::High);
        assert_eq!(DensityBand::from_score(70.0), DensityBand::Medium);
        assert_eq!(DensityBand::from_score(40.0001), DensityBand::Medium);
        assert_eq!(DensityBand::from_score(40.0), DensityBand::Low);
        assert_eq!(DensityBand::from_score(0.0), DensityBand::Low);
    }

    #[test]
    fn test_band_serialization() {
        assert_eq!(DensityBand::High.to_string(), "high");
        assert_eq!(
            serde_json::to_string(&DensityBand::Medium).unwrap(),
            "\"medium\""
        );
        assert_eq!(DensityBand::Low.color(), "#ef4444");
    }
}
