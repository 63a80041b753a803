//! Scheduler error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler has shut down")]
    Closed,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
