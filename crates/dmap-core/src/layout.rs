//! Circular layout.
//!
//! Asset `i` of `n` sits at angle `i / n * 2π` around the viewport center,
//! at radius `BASE_RADIUS + u * JITTER_SPAN * min(width, height) / 2` where
//! `u ∈ [0, 1)` comes from a [`JitterSource`]. Display code passes a real RNG;
//! tests pass a seeded RNG, [`NoJitter`] or [`FixedJitter`].

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::snapshot::AssetSnapshot;

/// Fixed radial offset from the center.
pub const BASE_RADIUS: f64 = 50.0;
/// Fraction of the visible radius covered by jitter.
pub const JITTER_SPAN: f64 = 0.7;

/// Drawing surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> CoreResult<Self> {
        if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
            return Err(CoreError::InvalidViewport(format!("{width}x{height}")));
        }
        Ok(Self { width, height })
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Radius of the largest circle that fits: `min(width, height) / 2`.
    pub fn visible_radius(&self) -> f64 {
        self.width.min(self.height) / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    pub fn distance_from_center(&self, pos: &LayoutPosition) -> f64 {
        let (cx, cy) = self.center();
        (pos.x - cx).hypot(pos.y - cy)
    }

    /// Distance as a percentage of [`visible_radius`](Self::visible_radius).
    ///
    /// Zero for an empty viewport.
    pub fn distance_percent(&self, pos: &LayoutPosition) -> f64 {
        let max = self.visible_radius();
        if max == 0.0 {
            return 0.0;
        }
        self.distance_from_center(pos) / max * 100.0
    }

    /// Pixel radius of a reference ring covering `range_pct` percent of `min(width, height)`.
    pub fn ring_radius(&self, range_pct: f64) -> f64 {
        self.width.min(self.height) * range_pct / 100.0
    }
}

/// Position assigned to one displayed asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPosition {
    pub x: f64,
    pub y: f64,
}

/// Source of radial jitter in `[0, 1)`.
pub trait JitterSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: Rng + ?Sized> JitterSource for R {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Jitter source that always returns zero: every asset sits at `BASE_RADIUS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn next_unit(&mut self) -> f64 {
        0.0
    }
}

/// Jitter source that cycles through a fixed sequence.
#[derive(Debug, Clone)]
pub struct FixedJitter {
    values: Vec<f64>,
    next: usize,
}

impl FixedJitter {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, next: 0 }
    }
}

impl JitterSource for FixedJitter {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.next % self.values.len()];
        self.next = self.next.wrapping_add(1);
        v
    }
}

/// Place `snapshots` on a circle. Output is index-aligned with the input.
pub fn place<J: JitterSource + ?Sized>(
    snapshots: &[AssetSnapshot],
    viewport: &Viewport,
    jitter: &mut J,
) -> Vec<LayoutPosition> {
    let count = snapshots.len();
    let (cx, cy) = viewport.center();

    if viewport.is_empty() {
        return vec![LayoutPosition { x: cx, y: cy }; count];
    }

    let span = JITTER_SPAN * viewport.visible_radius();
    (0..count)
        .map(|i| {
            let angle = i as f64 / count as f64 * TAU;
            let u = jitter.next_unit();
            let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
            let radius = BASE_RADIUS + u * span;
            LayoutPosition {
                x: cx + angle.cos() * radius,
                y: cy + angle.sin() * radius,
            }
        })
        .collect()
}

/// Reproducible layout: same input and seed give identical positions.
pub fn place_seeded(
    snapshots: &[AssetSnapshot],
    viewport: &Viewport,
    seed: u64,
) -> Vec<LayoutPosition> {
    let mut rng = StdRng::seed_from_u64(seed);
    place(snapshots, viewport, &mut rng)
}

/// Display layout using the thread-local RNG.
pub fn place_jittered(snapshots: &[AssetSnapshot], viewport: &Viewport) -> Vec<LayoutPosition> {
    let mut rng = rand::rng();
    place(snapshots, viewport, &mut rng)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingKind {
    Small,
    Large,
}

/// Reference ring drawn around the center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub kind: RingKind,
    pub range_pct: f64,
    pub radius: f64,
}

/// Rings for the enabled ranges (`None` = hidden).
pub fn reference_rings(viewport: &Viewport, small: Option<f64>, large: Option<f64>) -> Vec<Ring> {
    [(RingKind::Small, small), (RingKind::Large, large)]
        .into_iter()
        .filter_map(|(kind, range)| {
            range.map(|range_pct| Ring {
                kind,
                range_pct,
                radius: viewport.ring_radius(range_pct),
            })
        })
        .collect()
}
