//! Test doubles shared by the unit tests of this crate.

use crate::config::Config;
use crate::content::{ContentSource, DocData};
use crate::error::{Result, TaskError};
use crate::run_data::RunData;
use crate::task::{Task, TaskBase};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// A fixed list of documents.
pub struct VecSource {
    docs: Vec<String>,
    next: usize,
    issued: u64,
    forever: bool,
}

impl VecSource {
    pub fn new(docs: &[&str], forever: bool) -> Self {
        Self {
            docs: docs.iter().map(|s| s.to_string()).collect(),
            next: 0,
            issued: 0,
            forever,
        }
    }
}

impl ContentSource for VecSource {
    fn next_doc(&mut self) -> Result<DocData> {
        if self.next >= self.docs.len() {
            if !self.forever || self.docs.is_empty() {
                return Err(TaskError::NoMoreData);
            }
            self.next = 0;
        }
        let body = self.docs[self.next].clone();
        self.next += 1;
        self.issued += 1;
        Ok(DocData::new(self.issued - 1, format!("doc{}", self.issued - 1), body))
    }

    fn reset_inputs(&mut self) -> Result<()> {
        self.next = 0;
        Ok(())
    }

    fn name(&self) -> &str {
        "vec"
    }
}

pub fn run_data() -> Arc<RunData> {
    run_data_with("")
}

pub fn run_data_with(toml: &str) -> Arc<RunData> {
    let config = Config::from_toml_str(toml).unwrap();
    Arc::new(RunData::new(config, Box::new(VecSource::new(&["a", "b"], true))))
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Returns a fixed count and appends its name to a shared log.
#[derive(Clone)]
pub struct CountingTask {
    base: TaskBase,
    count: u64,
    sleep: Duration,
    log: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicU64>,
}

impl CountingTask {
    pub fn new(run_data: &Arc<RunData>, name: &str) -> Self {
        Self {
            base: TaskBase::new(Arc::clone(run_data), name),
            count: 1,
            sleep: Duration::ZERO,
            log: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_log(mut self, log: &Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Arc::clone(log);
        self
    }

    /// Calls made on this task and all of its clones.
    pub fn invocations(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }
}

impl Task for CountingTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        if !self.sleep.is_zero() {
            std::thread::sleep(self.sleep);
        }
        self.log.lock().push(self.base.name().to_string());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.count)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}

/// Succeeds until a shared budget runs out, then reports `NoMoreData`.
#[derive(Clone)]
pub struct ExhaustingTask {
    base: TaskBase,
    remaining: Arc<AtomicU64>,
}

impl ExhaustingTask {
    pub fn new(run_data: &Arc<RunData>, name: &str, budget: u64) -> Self {
        Self {
            base: TaskBase::new(Arc::clone(run_data), name),
            remaining: Arc::new(AtomicU64::new(budget)),
        }
    }

    pub fn budget(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.remaining)
    }
}

impl Task for ExhaustingTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| 1)
            .map_err(|_| TaskError::NoMoreData)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}

/// Refills an [`ExhaustingTask`] budget; behaves like `ResetInputs`.
#[derive(Clone)]
pub struct RefillTask {
    base: TaskBase,
    budget: Arc<AtomicU64>,
    amount: u64,
}

impl RefillTask {
    pub fn new(run_data: &Arc<RunData>, budget: Arc<AtomicU64>, amount: u64) -> Self {
        Self {
            base: TaskBase::new(Arc::clone(run_data), "Refill"),
            budget,
            amount,
        }
    }
}

impl Task for RefillTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.budget.store(self.amount, Ordering::SeqCst);
        Ok(0)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn resets_inputs(&self) -> bool {
        true
    }

    fn should_not_record_stats(&self) -> bool {
        true
    }
}

/// Spins until stopped; returns the number of 1ms naps taken.
#[derive(Clone)]
pub struct SpinTask {
    base: TaskBase,
}

impl SpinTask {
    pub fn new(run_data: &Arc<RunData>, name: &str) -> Self {
        Self {
            base: TaskBase::new(Arc::clone(run_data), name),
        }
    }
}

impl Task for SpinTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        let mut naps = 0;
        while !self.base.stop_requested() {
            std::thread::sleep(Duration::from_millis(1));
            naps += 1;
        }
        Ok(naps)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}

/// Fails every call.
#[derive(Clone)]
pub struct FailingTask {
    base: TaskBase,
}

impl FailingTask {
    pub fn new(run_data: &Arc<RunData>) -> Self {
        Self {
            base: TaskBase::new(Arc::clone(run_data), "Fail"),
        }
    }
}

impl Task for FailingTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        Err(TaskError::failed("Fail", "deliberate"))
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}
