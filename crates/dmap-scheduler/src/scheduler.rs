//! Tokio driver for [`RefreshMachine`].
//!
//! The driver task owns the machine, the timer and the last fetched tickers.
//! Fetches run on their own task and report back over a channel tagged with
//! their cycle token, so a result that arrives after teardown or for a
//! superseded cycle is dropped.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dmap_core::RawTicker;
use dmap_feed::{FeedResult, MarketDataSource};
use dmap_settings::{FilterModel, FilterPreferences, Settings, SettingsModel};
use dmap_telemetry::Metrics;
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cycle::CycleToken;
use crate::error::{SchedulerError, SchedulerResult};
use crate::machine::{Completion, Decision, RefreshMachine, SchedulerState, Trigger};
use crate::pipeline::{run_pipeline, PipelineOptions};
use crate::presented::PresentedSet;

/// Capacity of the explicit refresh request queue.
const REQUEST_QUEUE: usize = 8;

/// Refresh scheduler, consumed by [`spawn`](Self::spawn).
pub struct RefreshScheduler {
    source: Arc<dyn MarketDataSource>,
    settings: Arc<SettingsModel>,
    filters: Arc<FilterModel>,
    options: PipelineOptions,
}

impl RefreshScheduler {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        settings: Arc<SettingsModel>,
        filters: Arc<FilterModel>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            settings,
            filters,
            options,
        }
    }

    /// Start the driver task. The initial load begins immediately.
    ///
    /// The scheduler stops when `cancel` fires or [`SchedulerHandle::shutdown`] is called.
    pub fn spawn(self, cancel: CancellationToken) -> (SchedulerHandle, JoinHandle<()>) {
        let cancel = cancel.child_token();
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (presented_tx, presented_rx) = watch::channel(PresentedSet::default());
        let state = Arc::new(RwLock::new(SchedulerState::Idle));

        // Subscribe before taking `live` so a commit racing the first poll is still seen.
        let mut settings_rx = self.settings.subscribe();
        let filters_rx = self.filters.subscribe();
        let live = settings_rx.borrow_and_update().clone();
        let driver = Driver {
            source: self.source,
            settings: self.settings,
            filters: self.filters,
            options: self.options,
            machine: RefreshMachine::new(),
            live,
            tickers: Vec::new(),
            fetched_at: None,
            last_error: None,
            deadline: None,
            done_tx,
            presented_tx,
            state: Arc::clone(&state),
        };

        let task = tokio::spawn(driver.run(
            request_rx,
            done_rx,
            settings_rx,
            filters_rx,
            cancel.clone(),
        ));

        let handle = SchedulerHandle {
            requests: request_tx,
            presented: presented_rx,
            state,
            cancel,
        };
        (handle, task)
    }
}

/// Cloneable control surface for a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    requests: mpsc::Sender<Trigger>,
    presented: watch::Receiver<PresentedSet>,
    state: Arc<RwLock<SchedulerState>>,
    cancel: CancellationToken,
}

impl SchedulerHandle {
    /// Request an explicit refresh. Ignored if a load is already in flight.
    pub fn refresh(&self) -> SchedulerResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        match self.requests.try_send(Trigger::Manual) {
            Ok(()) => Ok(()),
            // Queue full: a refresh is already pending.
            Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SchedulerError::Closed),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PresentedSet> {
        self.presented.clone()
    }

    pub fn current(&self) -> PresentedSet {
        self.presented.borrow().clone()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Stop the scheduler. Pending timers are cleared; an in-flight fetch is discarded.
    pub fn shutdown(&self) {
        info!("Refresh scheduler shutdown requested");
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct Loaded {
    token: CycleToken,
    trigger: Trigger,
    result: FeedResult<Vec<RawTicker>>,
    elapsed: Duration,
}

struct Driver {
    source: Arc<dyn MarketDataSource>,
    settings: Arc<SettingsModel>,
    filters: Arc<FilterModel>,
    options: PipelineOptions,
    machine: RefreshMachine,
    /// Last settings seen, for change detection only.
    live: Settings,
    /// Tickers from the last successful fetch.
    tickers: Vec<RawTicker>,
    fetched_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    deadline: Option<Instant>,
    done_tx: mpsc::UnboundedSender<Loaded>,
    presented_tx: watch::Sender<PresentedSet>,
    state: Arc<RwLock<SchedulerState>>,
}

impl Driver {
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<Trigger>,
        mut done: mpsc::UnboundedReceiver<Loaded>,
        mut settings_rx: watch::Receiver<Settings>,
        mut filters_rx: watch::Receiver<FilterPreferences>,
        cancel: CancellationToken,
    ) {
        info!(
            automatic = self.live.is_automatic(),
            interval_secs = self.live.update_interval().as_secs(),
            "Refresh scheduler started"
        );
        self.handle(Trigger::Initial);

        loop {
            let timer = wait_for(self.deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(loaded) = done.recv() => self.on_loaded(loaded),
                _ = timer => {
                    self.deadline = None;
                    self.handle(Trigger::Timer);
                }
                Some(trigger) = requests.recv() => self.handle(trigger),
                Ok(()) = settings_rx.changed() => {
                    let next = settings_rx.borrow_and_update().clone();
                    self.on_settings(next);
                }
                Ok(()) = filters_rx.changed() => self.handle(Trigger::Filters),
            }
        }

        self.deadline = None;
        self.machine.stop();
        self.sync_state();
        info!("Refresh scheduler stopped");
    }

    fn handle(&mut self, trigger: Trigger) {
        match self.machine.on_trigger(trigger) {
            Decision::Fetch(token) => self.start_fetch(token, trigger),
            Decision::Recompute(token) => self.publish(token),
            Decision::Queued => Metrics::trigger_coalesced(trigger.as_str(), true),
            Decision::Ignored => {
                if self.machine.is_loading() {
                    Metrics::trigger_coalesced(trigger.as_str(), false);
                }
            }
        }
        self.sync_state();
    }

    fn start_fetch(&self, token: CycleToken, trigger: Trigger) {
        debug!(cycle = token.value(), %trigger, "Fetch started");
        let source = Arc::clone(&self.source);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = source.fetch_tickers().await;
            // Receiver is gone after teardown; the result is discarded.
            let _ = done.send(Loaded {
                token,
                trigger,
                result,
                elapsed: started.elapsed(),
            });
        });
    }

    fn on_loaded(&mut self, loaded: Loaded) {
        let ok = loaded.result.is_ok();
        let (follow_up, recompute) = match self.machine.on_complete(loaded.token, ok) {
            Completion::Stale => {
                Metrics::stale_discarded();
                debug!(cycle = loaded.token.value(), "Stale fetch result discarded");
                return;
            }
            Completion::Apply {
                follow_up,
                recompute,
            } => (follow_up, recompute),
        };

        Metrics::ingest_latency(ok, loaded.elapsed.as_secs_f64() * 1000.0);
        Metrics::refresh_completed(loaded.trigger.as_str(), ok);

        match loaded.result {
            Ok(tickers) => {
                Metrics::tickers_fetched(tickers.len());
                self.tickers = tickers;
                self.fetched_at = Some(Utc::now());
                self.last_error = None;
                self.publish(loaded.token);
            }
            Err(e) => {
                warn!(
                    cycle = loaded.token.value(),
                    error = %e,
                    "Ticker fetch failed, keeping previous data"
                );
                let message = e.to_string();
                self.last_error = Some(message.clone());
                if recompute && self.machine.has_data() {
                    // Filters changed during the load; re-present the cached tickers.
                    self.publish(loaded.token);
                } else {
                    self.presented_tx.send_modify(|set| {
                        set.cycle = loaded.token.value();
                        set.last_error = Some(message);
                    });
                }
            }
        }

        self.arm();
        self.sync_state();

        if follow_up {
            self.handle(Trigger::Blacklist);
        }
    }

    fn on_settings(&mut self, next: Settings) {
        let prev = std::mem::replace(&mut self.live, next);
        let mode_changed = prev.data_update != self.live.data_update;
        let blacklist_changed = prev.blacklist != self.live.blacklist;
        let rings_changed = prev.small_circle() != self.live.small_circle()
            || prev.large_circle() != self.live.large_circle();

        if mode_changed {
            if self.live.is_automatic() {
                if self.deadline.is_none() && !self.machine.is_loading() {
                    self.arm();
                }
            } else {
                self.deadline = None;
                info!("Switched to manual updates, timer disarmed");
            }
        }

        // Interval changes take effect at the next arm; an armed timer is left alone.
        if blacklist_changed {
            self.handle(Trigger::Blacklist);
        } else if rings_changed {
            self.handle(Trigger::Filters);
        }
    }

    /// Arm the timer from the interval in live settings, or disarm in manual mode.
    fn arm(&mut self) {
        let settings = self.settings.current();
        if settings.is_automatic() {
            let interval = settings.update_interval();
            self.deadline = Instant::now().checked_add(interval);
            if self.deadline.is_some() {
                debug!(interval_secs = interval.as_secs(), "Refresh timer armed");
            } else {
                warn!(
                    interval_secs = interval.as_secs(),
                    "Refresh interval out of range, timer disarmed"
                );
            }
        } else {
            self.deadline = None;
        }
    }

    fn publish(&mut self, token: CycleToken) {
        let settings = self.settings.current();
        let filters = self.filters.current();
        let (assets, rings) = run_pipeline(&self.tickers, &settings, &filters, &self.options);
        Metrics::assets_presented(assets.len());

        debug!(cycle = token.value(), assets = assets.len(), "Presented set updated");
        self.presented_tx.send_replace(PresentedSet {
            cycle: token.value(),
            state: self.machine.state(),
            assets,
            rings,
            source_count: self.tickers.len(),
            last_error: self.last_error.clone(),
            updated_at: self.fetched_at,
        });
    }

    fn sync_state(&self) {
        let state = self.machine.state();
        let prev = std::mem::replace(&mut *self.state.write(), state);
        if prev != state {
            debug!(from = %prev, to = %state, "Scheduler state changed");
            Metrics::scheduler_state_set(state.as_str());
        }
        self.presented_tx.send_if_modified(|set| {
            if set.state == state {
                false
            } else {
                set.state = state;
                true
            }
        });
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}
