//! Test builders: run contexts and probe tasks.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskbench_core::{Config, ContentSource, Result, RunData, Task, TaskBase, TaskError};
use taskbench_feeds::{LineDocSource, SingleDocSource};

use super::fixtures::line_text;

/// Names of probe invocations, in the order they happened.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn logged(log: &CallLog) -> Vec<String> {
    log.lock().expect("call log poisoned").clone()
}

// ---------------------------------------------------------------------------
// RunDataBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for a shared run context.
///
/// Progress logging is off unless the test sets `[log] step` itself.
///
/// # Example
///
/// ```rust
/// let rd = RunDataBuilder::new()
///     .toml("[report]\ntime_step_msec = 10\n")
///     .lines(20, false)
///     .build();
/// ```
pub struct RunDataBuilder {
    toml: String,
    source: Option<Box<dyn ContentSource>>,
}

impl RunDataBuilder {
    pub fn new() -> Self {
        Self {
            toml: String::new(),
            source: None,
        }
    }

    /// Append TOML to the config. Sections must not repeat.
    pub fn toml(mut self, toml: &str) -> Self {
        self.toml.push_str(toml);
        self.toml.push('\n');
        self
    }

    pub fn source(mut self, source: Box<dyn ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn single(self, forever: bool) -> Self {
        self.source(Box::new(SingleDocSource::new(forever)))
    }

    /// `n` documents from an in-memory line file.
    pub fn lines(self, n: usize, forever: bool) -> Self {
        let source = LineDocSource::from_text(&line_text(n), forever).expect("valid line text");
        self.source(Box::new(source))
    }

    pub fn build(self) -> Arc<RunData> {
        let toml = if self.toml.contains("[log]") {
            self.toml
        } else {
            format!("[log]\nstep = 0\n{}", self.toml)
        };
        let config = Config::from_toml_str(&toml).expect("valid test config");
        let source = self
            .source
            .unwrap_or_else(|| Box::new(SingleDocSource::new(true)));
        Arc::new(RunData::new(config, source))
    }
}

impl Default for RunDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A run context over a repeating single-document source.
pub fn run_data() -> Arc<RunData> {
    RunDataBuilder::new().build()
}

// ---------------------------------------------------------------------------
// ProbeTask
// ---------------------------------------------------------------------------

/// A leaf task that records how it was driven.
///
/// Clones share the call counter and the call log but nothing else, so a
/// parallel replica's scratch state stays its own.
#[derive(Clone)]
pub struct ProbeTask {
    base: TaskBase,
    count: u64,
    sleep: Duration,
    calls: Arc<AtomicU64>,
    log: Option<CallLog>,
    scratch: Option<Vec<u64>>,
    fail_on: Option<u64>,
    spin: bool,
}

impl ProbeTask {
    pub fn new(run_data: &Arc<RunData>, name: &str) -> Self {
        Self {
            base: TaskBase::new(Arc::clone(run_data), name),
            count: 1,
            sleep: Duration::ZERO,
            calls: Arc::new(AtomicU64::new(0)),
            log: None,
            scratch: None,
            fail_on: None,
            spin: false,
        }
    }

    /// Count reported by each call.
    pub fn returning(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn sleeping(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn logging(mut self, log: &CallLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    /// Report the length of a private list that grows by one per call.
    pub fn with_scratch(mut self) -> Self {
        self.scratch = Some(Vec::new());
        self
    }

    /// Fail on the given call (1-based, counted across clones).
    pub fn failing_on(mut self, call: u64) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// Run until stopped.
    pub fn spinning(mut self) -> Self {
        self.spin = true;
        self
    }

    pub fn background(mut self, priority_delta: i32) -> Self {
        self.base.set_background(Some(priority_delta));
        self
    }

    pub fn without_counting(mut self) -> Self {
        self.base.set_disable_counting(true);
        self
    }

    /// Handle on the shared call counter.
    pub fn calls(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn Task> {
        Box::new(self)
    }
}

impl Task for ProbeTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(log) = &self.log {
            log.lock()
                .expect("call log poisoned")
                .push(self.base.name().to_string());
        }
        if self.fail_on == Some(call) {
            return Err(TaskError::failed(self.base.name(), "probe failure"));
        }
        if self.spin {
            while !self.base.stop_requested() {
                std::thread::sleep(Duration::from_millis(1));
            }
        } else if !self.sleep.is_zero() {
            std::thread::sleep(self.sleep);
        }
        if let Some(scratch) = self.scratch.as_mut() {
            scratch.push(call);
            return Ok(scratch.len() as u64);
        }
        Ok(self.count)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// ExhaustAfter
// ---------------------------------------------------------------------------

/// Succeeds `budget` times, then reports that its input ran dry. Clones
/// draw on the same budget.
#[derive(Clone)]
pub struct ExhaustAfter {
    base: TaskBase,
    budget: Arc<AtomicU64>,
    calls: Arc<AtomicU64>,
}

impl ExhaustAfter {
    pub fn new(run_data: &Arc<RunData>, budget: u64) -> Self {
        Self {
            base: TaskBase::new(Arc::clone(run_data), "ExhaustAfter"),
            budget: Arc::new(AtomicU64::new(budget)),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Give the task `budget` more successful calls.
    pub fn refill(&self, budget: u64) {
        self.budget.store(budget, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn Task> {
        Box::new(self)
    }
}

impl Task for ExhaustAfter {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .map(|_| 1)
            .map_err(|_| TaskError::NoMoreData)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}
