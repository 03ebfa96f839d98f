//! The demo benchmark plan run by the `taskbench` binary.
//!
//! ```text
//! Benchmark {
//!     ResetSystem
//!     Populate [
//!         AddDocs { AddDoc > : EXHAUST      (or : N when the source repeats)
//!     ] * threads
//!     ResetInputs
//!     Drain { ConsumeContentSource > : <duration>s   (optional)
//! }
//! ```

use crate::registry::create_task;
use std::sync::Arc;
use std::time::Duration;
use taskbench_core::{ConfigError, Rate, Repetitions, RunData, TaskSequence};

/// Knobs of the demo plan.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Parallel populate loops.
    pub threads: u32,
    /// Per-loop pacing of `AddDoc`.
    pub rate: Option<Rate>,
    /// Run time of the drain phase; `None` skips it.
    pub drain: Option<Duration>,
    /// Documents per loop when the content source never runs dry.
    pub docs_per_thread: u32,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            rate: None,
            drain: None,
            docs_per_thread: 1000,
        }
    }
}

impl PlanOptions {
    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_drain(mut self, drain: Duration) -> Self {
        self.drain = Some(drain);
        self
    }

    pub fn with_docs_per_thread(mut self, docs: u32) -> Self {
        self.docs_per_thread = docs;
        self
    }
}

/// Assemble the plan. A repeating content source bounds each populate loop
/// by `docs_per_thread`; a finite one runs the loops until it is drained.
pub fn build_plan(run_data: &Arc<RunData>, opts: &PlanOptions) -> Result<TaskSequence, ConfigError> {
    let mut root = TaskSequence::new(Arc::clone(run_data), Some("Benchmark"), false);
    root.add_task(create_task("ResetSystem", run_data, None)?);

    let loop_reps = if run_data.config().content.forever {
        Repetitions::Count(opts.docs_per_thread)
    } else {
        Repetitions::Exhaust
    };
    let mut add_docs = TaskSequence::new(Arc::clone(run_data), Some("AddDocs"), false)
        .with_task(create_task("AddDoc", run_data, None)?)
        .with_repetitions(loop_reps)?;
    if let Some(rate) = opts.rate {
        add_docs.set_rate(rate);
    }
    add_docs.set_no_child_report();

    let populate = TaskSequence::new(Arc::clone(run_data), Some("Populate"), true)
        .with_task(Box::new(add_docs))
        .with_repetitions(Repetitions::Count(opts.threads))?;
    root.add_task(Box::new(populate));
    root.add_task(create_task("ResetInputs", run_data, None)?);

    if let Some(run_time) = opts.drain {
        let mut drain = TaskSequence::new(Arc::clone(run_data), Some("Drain"), false)
            .with_task(create_task("ConsumeContentSource", run_data, None)?)
            .with_repetitions(Repetitions::RunTime(run_time))?;
        drain.set_no_child_report();
        root.add_task(Box::new(drain));
    }
    Ok(root)
}
