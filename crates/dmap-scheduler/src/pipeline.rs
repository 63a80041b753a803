//! Filter, score and layout for one cycle.

use dmap_core::{
    apply, place, place_jittered, place_seeded, reference_rings, AssetSnapshot, DensityScore,
    JitterSource, LayoutPosition, RawTicker, Ring, Viewport,
};
use dmap_settings::{FilterPreferences, Settings};
use tracing::debug;

use crate::presented::PresentedAsset;

/// Cycle-independent pipeline parameters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub viewport: Viewport,
    /// Cap on presented assets, applied after filtering.
    pub max_assets: usize,
    pub quote_suffix: String,
    /// Fixed layout seed. `None` jitters on every run.
    pub seed: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport {
                width: 800.0,
                height: 800.0,
            },
            max_assets: 100,
            quote_suffix: "USDT".to_string(),
            seed: None,
        }
    }
}

/// Run the pipeline over freshly fetched or cached tickers.
pub fn run_pipeline(
    tickers: &[RawTicker],
    settings: &Settings,
    filters: &FilterPreferences,
    options: &PipelineOptions,
) -> (Vec<PresentedAsset>, Vec<Ring>) {
    let selected = select(tickers, settings, filters, options);
    let positions = match options.seed {
        Some(seed) => place_seeded(&selected, &options.viewport, seed),
        None => place_jittered(&selected, &options.viewport),
    };
    finish(selected, positions, settings, options)
}

/// [`run_pipeline`] with a caller-supplied jitter source.
pub fn run_pipeline_with<J: JitterSource + ?Sized>(
    tickers: &[RawTicker],
    settings: &Settings,
    filters: &FilterPreferences,
    options: &PipelineOptions,
    jitter: &mut J,
) -> (Vec<PresentedAsset>, Vec<Ring>) {
    let selected = select(tickers, settings, filters, options);
    let positions = place(&selected, &options.viewport, jitter);
    finish(selected, positions, settings, options)
}

fn select(
    tickers: &[RawTicker],
    settings: &Settings,
    filters: &FilterPreferences,
    options: &PipelineOptions,
) -> Vec<AssetSnapshot> {
    let snapshots: Vec<AssetSnapshot> = tickers.iter().map(AssetSnapshot::from_raw).collect();
    let criteria = filters.criteria(&settings.blacklist, &options.quote_suffix);
    let mut selected = apply(&snapshots, &criteria);
    selected.truncate(options.max_assets);

    debug!(
        fetched = snapshots.len(),
        selected = selected.len(),
        "Pipeline filtered"
    );
    selected
}

fn finish(
    selected: Vec<AssetSnapshot>,
    positions: Vec<LayoutPosition>,
    settings: &Settings,
    options: &PipelineOptions,
) -> (Vec<PresentedAsset>, Vec<Ring>) {
    let viewport = &options.viewport;
    let assets = selected
        .into_iter()
        .zip(positions)
        .map(|(snapshot, pos)| {
            let score = DensityScore::of(&snapshot);
            PresentedAsset {
                display_symbol: snapshot.display_symbol(&options.quote_suffix).to_string(),
                volume_24h: snapshot.volume_24h,
                price_change_24h_pct: snapshot.price_change_24h_pct,
                volatility_24h_pct: snapshot.volatility_24h_pct,
                score: score.total(),
                band: score.band(),
                x: pos.x,
                y: pos.y,
                distance: viewport.distance_from_center(&pos),
                distance_percent: viewport.distance_percent(&pos),
                symbol: snapshot.symbol,
            }
        })
        .collect();

    let rings = reference_rings(viewport, settings.small_circle(), settings.large_circle());
    (assets, rings)
}
