//! taskbench-core — task lifecycle, task sequences and run statistics.
//!
//! This crate holds the execution engine of taskbench plus the shared run
//! context every task is bound to.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────── RunData (Arc) ────────────────┐
//!              │ Config · Points · ContentSource · MemoryIndex │
//!              └──────────────────────▲────────────────────────┘
//!                                     │
//! driver ──► TaskSequence ──► Task::run_and_maybe_stats ──► setup / do_logic / tear_down
//!               │   │
//!               │   └──► parallel replicas (one thread each, joined)
//!               └──────► background runners (started once, stopped + joined at the end)
//! ```
//!
//! Leaf tasks live in the `taskbench` crate; content sources live in
//! `taskbench-feeds`.

pub mod background;
pub mod config;
pub mod content;
pub mod error;
pub mod index;
pub mod run_data;
pub mod schedule;
pub mod sequence;
pub mod stats;
pub mod stop;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use content::{ContentSource, DocData};
pub use error::{ConfigError, Result, TaskError};
pub use run_data::RunData;
pub use schedule::{Rate, RateUnit, Repetitions};
pub use sequence::TaskSequence;
pub use stats::{Points, StatsHandle, TaskStats, TimeBuckets};
pub use stop::StopSignal;
pub use task::{Task, TaskBase};
