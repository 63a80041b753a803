//! Refresh scheduling for the density map.
//!
//! One cycle: fetch tickers, then filter, score and lay out synchronously,
//! then publish a [`PresentedSet`]. [`RefreshMachine`] decides what each
//! trigger does; [`RefreshScheduler`] drives it on tokio.
//!
//! ```text
//! Idle ──▶ Loading ──ok──▶ Ready ──▶ Loading ...
//!             │
//!             └──err──▶ Errored ──▶ Loading ──ok──▶ Ready
//! ```

pub mod cycle;
pub mod error;
pub mod machine;
pub mod pipeline;
pub mod presented;
pub mod scheduler;

pub use cycle::{CycleRegister, CycleToken};
pub use error::{SchedulerError, SchedulerResult};
pub use machine::{Completion, Decision, RefreshMachine, SchedulerState, Trigger};
pub use pipeline::{run_pipeline, run_pipeline_with, PipelineOptions};
pub use presented::{PresentedAsset, PresentedSet};
pub use scheduler::{RefreshScheduler, SchedulerHandle};
