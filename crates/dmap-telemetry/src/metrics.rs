//! Prometheus metrics.
//!
//! Registration uses `unwrap()`: a failure means duplicate metric names, which
//! is a startup bug. Panics only happen on first access of a static.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_counter,
    register_int_gauge, CounterVec, Encoder, GaugeVec, HistogramVec, IntCounter, IntGauge,
    TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Refresh cycles by trigger and outcome.
/// Labels: trigger (initial/timer/manual/blacklist/filters), outcome (ok/error)
pub static REFRESH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dmap_refresh_total",
        "Completed refresh cycles",
        &["trigger", "outcome"]
    )
    .unwrap()
});

/// Ingestion latency in milliseconds.
pub static INGEST_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dmap_ingest_latency_ms",
        "Ticker fetch latency in milliseconds",
        &["outcome"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Triggers dropped or queued because a load was in flight.
/// Labels: trigger, action (ignored/queued)
pub static COALESCED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dmap_coalesced_total",
        "Refresh triggers coalesced into an in-flight load",
        &["trigger", "action"]
    )
    .unwrap()
});

/// Ingestion results discarded because a newer cycle superseded them.
pub static STALE_DISCARDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dmap_stale_discarded_total",
        "Ingestion results discarded as stale"
    )
    .unwrap()
});

/// Tickers returned by the last successful fetch.
pub static TICKERS_FETCHED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dmap_tickers_fetched", "Tickers in the last fetch").unwrap()
});

/// Assets in the presented set after filtering.
pub static ASSETS_PRESENTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dmap_assets_presented", "Assets currently presented").unwrap()
});

/// Scheduler state (1 = active).
/// Labels: state (idle/loading/ready/errored)
pub static SCHEDULER_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dmap_scheduler_state",
        "Refresh scheduler current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Notification deliveries by outcome.
/// Labels: outcome (ok/invalid/error)
pub static NOTIFY_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dmap_notify_total",
        "Notification requests by outcome",
        &["outcome"]
    )
    .unwrap()
});

const SCHEDULER_STATES: [&str; 4] = ["idle", "loading", "ready", "errored"];

/// Facade over the metric statics.
pub struct Metrics;

impl Metrics {
    pub fn refresh_completed(trigger: &str, ok: bool) {
        REFRESH_TOTAL
            .with_label_values(&[trigger, outcome(ok)])
            .inc();
    }

    pub fn ingest_latency(ok: bool, latency_ms: f64) {
        INGEST_LATENCY_MS
            .with_label_values(&[outcome(ok)])
            .observe(latency_ms);
    }

    pub fn trigger_coalesced(trigger: &str, queued: bool) {
        let action = if queued { "queued" } else { "ignored" };
        COALESCED_TOTAL.with_label_values(&[trigger, action]).inc();
    }

    pub fn stale_discarded() {
        STALE_DISCARDED_TOTAL.inc();
    }

    pub fn tickers_fetched(count: usize) {
        TICKERS_FETCHED.set(count as i64);
    }

    pub fn assets_presented(count: usize) {
        ASSETS_PRESENTED.set(count as i64);
    }

    /// One-hot scheduler state.
    pub fn scheduler_state_set(state: &str) {
        for s in SCHEDULER_STATES {
            SCHEDULER_STATE
                .with_label_values(&[s])
                .set(if s == state { 1.0 } else { 0.0 });
        }
    }

    pub fn notify(outcome: &str) {
        NOTIFY_TOTAL.with_label_values(&[outcome]).inc();
    }
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

/// Render the default registry in the Prometheus text format.
pub fn encode_text() -> TelemetryResult<String> {
    let families = prometheus::gather();
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buf)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
