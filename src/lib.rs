//! taskbench — task-sequence benchmark harness.
//!
//! The execution engine lives in `taskbench-core` and the document feeds in
//! `taskbench-feeds`. This crate adds the leaf tasks, the name → task
//! registry, the demo plan run by the binary and the end-of-run summary.
//!
//! # Architecture
//!
//! ```text
//! CLI ──► Config ──► open_content_source ──► RunData
//!                                              │
//!          build_plan ──► TaskSequence tree ◄──┘
//!                              │
//!                    run_and_maybe_stats ──► Points ──► Summary
//! ```

pub mod plan;
pub mod registry;
pub mod summary;
pub mod tasks;

pub use plan::{build_plan, PlanOptions};
pub use registry::create_task;
pub use summary::Summary;
