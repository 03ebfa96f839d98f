//! Statistics collection.
//!
//! [`Points`] is the run-wide collector. Every measured task run gets one
//! [`TaskStats`] record, created by [`Points::mark_task_start`] and completed
//! by [`Points::mark_task_end`]. Records are shared as [`StatsHandle`]s so a
//! sequence can attach its per-slot throughput counters to its own record
//! after its children have finished.

use crate::error::{Result, TaskError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared handle to one task run's statistics.
pub type StatsHandle = Arc<Mutex<TaskStats>>;

// ---------------------------------------------------------------------------
// Time buckets
// ---------------------------------------------------------------------------

/// Completed work items per fixed-width wall-clock slot, counted from the
/// start of the owning sequence's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBuckets {
    step: Duration,
    counts: Vec<u64>,
}

impl TimeBuckets {
    /// `step` must be non-zero.
    pub fn new(step: Duration) -> Self {
        debug_assert!(!step.is_zero(), "bucket width must be positive");
        Self {
            step,
            counts: Vec::new(),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Add `count` to the slot containing `elapsed`, growing as needed.
    pub fn record(&mut self, elapsed: Duration, count: u64) {
        let slot = (elapsed.as_nanos() / self.step.as_nanos().max(1)) as usize;
        if slot >= self.counts.len() {
            self.counts.resize(slot + 1, 0);
        }
        self.counts[slot] += count;
    }

    /// Elementwise sum with another set of buckets of the same width.
    pub fn merge(&mut self, other: &TimeBuckets) {
        merge_counts(&mut self.counts, &other.counts);
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// Elementwise `into[i] += from[i]`, extending `into` with zeros first when
/// `from` is longer.
pub fn merge_counts(into: &mut Vec<u64>, from: &[u64]) {
    if from.len() > into.len() {
        into.resize(from.len(), 0);
    }
    for (slot, n) in into.iter_mut().zip(from) {
        *slot += n;
    }
}

// ---------------------------------------------------------------------------
// TaskStats
// ---------------------------------------------------------------------------

/// Statistics of one task run, or of several runs once aggregated with
/// [`TaskStats::add`].
#[derive(Debug, Clone)]
pub struct TaskStats {
    task_name: String,
    /// `None` once runs from different rounds have been aggregated.
    round: Option<u32>,
    start: Instant,
    elapsed: Duration,
    task_run_num: u64,
    /// Tasks started by the collector between this task's start and end.
    num_parallel_tasks: u64,
    count: u64,
    num_runs: u32,
    counts_by_time: Option<TimeBuckets>,
}

impl TaskStats {
    fn started(task_name: &str, round: Option<u32>, task_run_num: u64) -> Self {
        Self {
            task_name: task_name.to_string(),
            round,
            start: Instant::now(),
            elapsed: Duration::ZERO,
            task_run_num,
            num_parallel_tasks: 0,
            count: 0,
            num_runs: 0,
            counts_by_time: None,
        }
    }

    fn mark_end(&mut self, num_parallel_tasks: u64, count: u64) {
        self.elapsed = self.start.elapsed();
        self.num_parallel_tasks = num_parallel_tasks;
        self.count = count;
        self.num_runs = 1;
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn round(&self) -> Option<u32> {
        self.round
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn task_run_num(&self) -> u64 {
        self.task_run_num
    }

    pub fn num_parallel_tasks(&self) -> u64 {
        self.num_parallel_tasks
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn num_runs(&self) -> u32 {
        self.num_runs
    }

    pub fn counts_by_time(&self) -> Option<&TimeBuckets> {
        self.counts_by_time.as_ref()
    }

    /// Attach per-slot counters, replacing any previous ones.
    pub fn set_counts_by_time(&mut self, buckets: TimeBuckets) {
        self.counts_by_time = Some(buckets);
    }

    /// Fold another run into this one.
    pub fn add(&mut self, other: &TaskStats) -> Result<()> {
        if let (Some(mine), Some(theirs)) = (&self.counts_by_time, &other.counts_by_time) {
            if mine.step() != theirs.step() {
                return Err(TaskError::StatsMismatch {
                    task: self.task_name.clone(),
                    reason: format!(
                        "bucket width {:?} differs from {:?}",
                        mine.step(),
                        theirs.step()
                    ),
                });
            }
        }

        self.num_runs += other.num_runs;
        self.elapsed += other.elapsed;
        self.count += other.count;
        if self.round != other.round {
            self.round = None;
        }
        match (&mut self.counts_by_time, &other.counts_by_time) {
            (Some(mine), Some(theirs)) => mine.merge(theirs),
            (None, Some(theirs)) => self.counts_by_time = Some(theirs.clone()),
            _ => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PointsInner {
    stats: Vec<StatsHandle>,
    next_run_num: u64,
    current: Option<StatsHandle>,
}

/// Run-wide statistics collector. Safe to share between threads.
#[derive(Debug, Default)]
pub struct Points {
    inner: Mutex<PointsInner>,
}

impl Points {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a record for a task run and make it the current one.
    pub fn mark_task_start(&self, task_name: &str, round: Option<u32>) -> StatsHandle {
        let mut inner = self.inner.lock();
        let run_num = inner.next_run_num;
        inner.next_run_num += 1;
        let handle = Arc::new(Mutex::new(TaskStats::started(task_name, round, run_num)));
        inner.stats.push(Arc::clone(&handle));
        inner.current = Some(Arc::clone(&handle));
        handle
    }

    /// Close a record opened by [`Points::mark_task_start`].
    pub fn mark_task_end(&self, handle: &StatsHandle, count: u64) {
        // Collector lock first, record lock second: the only order used.
        let inner = self.inner.lock();
        let mut stats = handle.lock();
        let num_parallel = inner
            .next_run_num
            .saturating_sub(1)
            .saturating_sub(stats.task_run_num);
        stats.mark_end(num_parallel, count);
    }

    /// The most recently started record.
    pub fn current_stats(&self) -> Option<StatsHandle> {
        self.inner.lock().current.clone()
    }

    /// Snapshot of every record, in start order.
    pub fn task_stats(&self) -> Vec<TaskStats> {
        let handles = self.inner.lock().stats.clone();
        handles.iter().map(|h| h.lock().clone()).collect()
    }

    /// Drop all records. Run numbering continues.
    pub fn clear_data(&self) {
        let mut inner = self.inner.lock();
        inner.stats.clear();
        inner.current = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
