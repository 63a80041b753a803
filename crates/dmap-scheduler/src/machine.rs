//! Refresh decisions, free of IO and time.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::cycle::{CycleRegister, CycleToken};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Nothing loaded yet, or torn down.
    #[default]
    Idle,
    Loading,
    Ready,
    /// Last load failed; previous data is still presented.
    Errored,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Initial,
    Timer,
    /// Explicit user action.
    Manual,
    /// Blacklist edit; bypasses the timer.
    Blacklist,
    /// Filter preferences or display options changed; reuses the last tickers.
    Filters,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Timer => "timer",
            Self::Manual => "manual",
            Self::Blacklist => "blacklist",
            Self::Filters => "filters",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`RefreshMachine::on_trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Start a fetch tagged with this token.
    Fetch(CycleToken),
    /// Re-run the pipeline on the cached tickers, publishing under this token.
    Recompute(CycleToken),
    /// A fetch is in flight and will be followed by exactly one more.
    Queued,
    /// Nothing to do.
    Ignored,
}

/// Outcome of [`RefreshMachine::on_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Result belongs to the in-flight cycle and should be applied.
    /// `follow_up` is set when a forced refresh was queued meanwhile;
    /// `recompute` when filters changed meanwhile and the cached tickers
    /// must be re-presented even if this fetch failed.
    Apply { follow_up: bool, recompute: bool },
    /// Result is from a superseded cycle or arrived after teardown.
    Stale,
}

/// Coalescing state machine. At most one fetch is in flight.
#[derive(Debug, Default)]
pub struct RefreshMachine {
    state: SchedulerState,
    register: CycleRegister,
    in_flight: Option<CycleToken>,
    pending_forced: bool,
    pending_recompute: bool,
    has_data: bool,
    stopped: bool,
}

impl RefreshMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<CycleToken> {
        self.in_flight
    }

    pub fn has_pending(&self) -> bool {
        self.pending_forced
    }

    /// Whether a successful fetch has ever been applied.
    pub fn has_data(&self) -> bool {
        self.has_data
    }

    pub fn latest(&self) -> CycleToken {
        self.register.latest()
    }

    pub fn on_trigger(&mut self, trigger: Trigger) -> Decision {
        if self.stopped {
            return Decision::Ignored;
        }

        let decision = match trigger {
            Trigger::Filters if self.is_loading() => {
                self.pending_recompute = true;
                Decision::Ignored
            }
            Trigger::Filters if !self.has_data => Decision::Ignored,
            Trigger::Filters => Decision::Recompute(self.register.issue()),
            Trigger::Blacklist if self.is_loading() => {
                self.pending_forced = true;
                Decision::Queued
            }
            _ if self.is_loading() => Decision::Ignored,
            _ => {
                let token = self.register.issue();
                self.in_flight = Some(token);
                self.state = SchedulerState::Loading;
                Decision::Fetch(token)
            }
        };

        debug!(%trigger, state = %self.state, ?decision, "Refresh trigger");
        decision
    }

    /// Record the end of a fetch.
    pub fn on_complete(&mut self, token: CycleToken, ok: bool) -> Completion {
        if self.stopped || self.in_flight != Some(token) {
            return Completion::Stale;
        }

        self.in_flight = None;
        if ok {
            self.has_data = true;
            self.state = SchedulerState::Ready;
        } else {
            self.state = SchedulerState::Errored;
        }

        Completion::Apply {
            follow_up: std::mem::take(&mut self.pending_forced),
            recompute: std::mem::take(&mut self.pending_recompute),
        }
    }

    /// Tear down: pending work is dropped and later completions are stale.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.in_flight = None;
        self.pending_forced = false;
        self.pending_recompute = false;
        self.state = SchedulerState::Idle;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(follow_up: bool) -> Completion {
        Completion::Apply {
            follow_up,
            recompute: false,
        }
    }

    fn fetch_token(d: Decision) -> CycleToken {
        match d {
            Decision::Fetch(t) => t,
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_initial_load_to_ready() {
        let mut m = RefreshMachine::new();
        assert_eq!(m.state(), SchedulerState::Idle);

        let t = fetch_token(m.on_trigger(Trigger::Initial));
        assert_eq!(m.state(), SchedulerState::Loading);
        assert_eq!(m.on_complete(t, true), applied(false));
        assert_eq!(m.state(), SchedulerState::Ready);
    }

    #[test]
    fn test_timer_twice_while_loading_starts_one_fetch() {
        let mut m = RefreshMachine::new();
        let t = fetch_token(m.on_trigger(Trigger::Timer));
        assert_eq!(m.on_trigger(Trigger::Timer), Decision::Ignored);
        assert_eq!(m.on_trigger(Trigger::Timer), Decision::Ignored);
        assert_eq!(m.on_trigger(Trigger::Manual), Decision::Ignored);
        assert_eq!(m.on_complete(t, true), applied(false));
        assert!(!m.is_loading());
    }

    #[test]
    fn test_blacklist_while_loading_queues_one_follow_up() {
        let mut m = RefreshMachine::new();
        let t = fetch_token(m.on_trigger(Trigger::Initial));
        assert_eq!(m.on_trigger(Trigger::Blacklist), Decision::Queued);
        assert_eq!(m.on_trigger(Trigger::Blacklist), Decision::Queued);
        assert!(m.has_pending());

        assert_eq!(m.on_complete(t, true), applied(true));
        assert!(!m.has_pending());

        let next = fetch_token(m.on_trigger(Trigger::Blacklist));
        assert!(next > t);
        assert_eq!(m.on_complete(next, true), applied(false));
    }

    #[test]
    fn test_failure_keeps_data_flag_and_recovers() {
        let mut m = RefreshMachine::new();
        let t1 = fetch_token(m.on_trigger(Trigger::Initial));
        m.on_complete(t1, true);

        let t2 = fetch_token(m.on_trigger(Trigger::Timer));
        m.on_complete(t2, false);
        assert_eq!(m.state(), SchedulerState::Errored);

        // Cached tickers still usable after a failure.
        assert!(matches!(m.on_trigger(Trigger::Filters), Decision::Recompute(_)));

        let t3 = fetch_token(m.on_trigger(Trigger::Timer));
        m.on_complete(t3, true);
        assert_eq!(m.state(), SchedulerState::Ready);
    }

    #[test]
    fn test_filters_need_data_and_idle_fetcher() {
        let mut m = RefreshMachine::new();
        assert_eq!(m.on_trigger(Trigger::Filters), Decision::Ignored);

        let t = fetch_token(m.on_trigger(Trigger::Initial));
        assert_eq!(m.on_trigger(Trigger::Filters), Decision::Ignored);
        m.on_complete(t, true);

        match m.on_trigger(Trigger::Filters) {
            Decision::Recompute(r) => assert!(r > t),
            other => panic!("expected recompute, got {other:?}"),
        }
        assert_eq!(m.state(), SchedulerState::Ready);
    }

    #[test]
    fn test_filters_while_loading_marks_recompute() {
        let mut m = RefreshMachine::new();
        let t1 = fetch_token(m.on_trigger(Trigger::Initial));
        m.on_complete(t1, true);

        let t2 = fetch_token(m.on_trigger(Trigger::Manual));
        assert_eq!(m.on_trigger(Trigger::Filters), Decision::Ignored);
        assert_eq!(
            m.on_complete(t2, false),
            Completion::Apply {
                follow_up: false,
                recompute: true
            }
        );
        assert!(m.has_data());

        // Flag is consumed by the completion.
        let t3 = fetch_token(m.on_trigger(Trigger::Manual));
        assert_eq!(
            m.on_complete(t3, true),
            Completion::Apply {
                follow_up: false,
                recompute: false
            }
        );
    }

    #[test]
    fn test_unknown_token_is_stale() {
        let mut m = RefreshMachine::new();
        let t = fetch_token(m.on_trigger(Trigger::Initial));
        m.on_complete(t, true);
        // Duplicate completion for an already-applied cycle.
        assert_eq!(m.on_complete(t, true), Completion::Stale);
        assert_eq!(m.state(), SchedulerState::Ready);
    }

    #[test]
    fn test_completion_after_stop_is_stale() {
        let mut m = RefreshMachine::new();
        let t = fetch_token(m.on_trigger(Trigger::Initial));
        m.stop();
        assert_eq!(m.on_complete(t, true), Completion::Stale);
        assert_eq!(m.state(), SchedulerState::Idle);
        assert_eq!(m.on_trigger(Trigger::Manual), Decision::Ignored);
    }
}
