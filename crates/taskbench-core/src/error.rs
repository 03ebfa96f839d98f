//! Error types for taskbench.
//!
//! Three categories matter to the engine:
//! - [`TaskError::NoMoreData`]: a content source ran dry. Expected and
//!   recoverable: sequences catch it and turn it into exhaustion state.
//! - [`TaskError::Config`]: bad parameters or settings, raised before or
//!   while a task is configured. Fatal.
//! - everything else: fatal, propagated unchanged to the driver.

use std::time::Duration;
use thiserror::Error;

/// Shorthand used across the crate.
pub type Result<T, E = TaskError> = std::result::Result<T, E>;

/// Errors raised while configuring or running tasks.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("no more data available from the content source")]
    NoMoreData,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("thread {thread} panicked: {message}")]
    ThreadPanicked { thread: String, message: String },

    #[error("cannot aggregate stats for {task}: {reason}")]
    StatsMismatch { task: String, reason: String },

    #[error("{task} failed: {reason}")]
    Failed { task: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    /// `true` for the exhaustion signal.
    pub fn is_no_more_data(&self) -> bool {
        matches!(self, TaskError::NoMoreData)
    }

    pub fn failed(task: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        TaskError::Failed {
            task: task.into(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration-time errors. Never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("EXHAUST repetitions are not allowed for parallel sequence {0}")]
    ExhaustInParallel(String),

    #[error("a fixed run time ({run_time:?}) is not allowed for parallel sequence {sequence}")]
    RunTimeInParallel { sequence: String, run_time: Duration },

    #[error("invalid rate {0:?} (expected N, N/sec or N/min with N > 0)")]
    InvalidRate(String),

    #[error("invalid repetitions {0:?} (expected N, *, or a duration such as 2.5s)")]
    InvalidRepetitions(String),

    #[error("{task} does not support parameters")]
    ParamsNotSupported { task: String },

    #[error("invalid parameters for {task}: {reason}")]
    InvalidParams { task: String, reason: String },

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("unknown content source: {name} (supported: {supported})")]
    UnknownContentSource { name: String, supported: String },

    #[error("config error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn invalid_params(task: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ConfigError::InvalidParams {
            task: task.into(),
            reason: reason.to_string(),
        }
    }
}
