//! TaskSequence, the composite task that drives the benchmark.
//!
//! A sequence owns an ordered list of children and runs them either
//! serially (in declared order, pass after pass) or in parallel (one thread
//! per replica). Passes are bounded by a count, by exhaustion of the content
//! source, or by wall-clock time. A rate paces individual child starts.
//!
//! # Serial runs
//!
//! ```text
//! pass 0: c1 c2 [bg started once] c3
//! pass 1: c1 c2                   c3
//! ...      stop / count / time / exhaustion ends the passes
//! end:    raise bg stop ─► join bg ─► flush time buckets ─► clear own stop
//! ```
//!
//! # Parallel runs
//!
//! `repetitions × children` deep clones are started on named scoped
//! threads, every one linked to this sequence's stop signal, and all of them
//! are joined before the first error (if any) is returned.

use crate::background::{panic_message, BackgroundRunner};
use crate::error::{ConfigError, Result, TaskError};
use crate::run_data::RunData;
use crate::schedule::{Pacer, Rate, Repetitions};
use crate::stats::TimeBuckets;
use crate::stop::StopSignal;
use crate::task::{Task, TaskBase};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, Scope};
use std::time::{Duration, Instant};
use tracing::debug;

// ---------------------------------------------------------------------------
// Exhaustion bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Exhaustion {
    exhausted: bool,
    /// A `ResetInputs` ran after exhaustion; the enclosing sequence should
    /// start over rather than stop.
    reset: bool,
}

impl Exhaustion {
    /// Fold in the state left behind by a child that just completed.
    fn observe(&mut self, child: &mut dyn Task) {
        if child.resets_inputs() {
            self.exhausted = false;
            self.reset = true;
        } else if let Some(seq) = child.as_sequence_mut() {
            if seq.exhaustion.reset {
                self.exhausted = false;
                self.reset = true;
                seq.exhaustion.reset = false;
            } else {
                self.exhausted |= seq.exhaustion.exhausted;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TaskSequence
// ---------------------------------------------------------------------------

pub struct TaskSequence {
    base: TaskBase,
    tasks: Vec<Box<dyn Task>>,
    parallel: bool,
    repetitions: Repetitions,
    rate: Option<Rate>,
    let_child_report: bool,
    exhaustion: Exhaustion,
    /// Any child can change exhaustion state (a sequence or an input reset).
    any_exhaustible: bool,
    log_by_time: Option<Duration>,
    counts_by_time: Option<TimeBuckets>,
    /// Passes actually run by the last fixed-time run.
    completed_repetitions: Option<u32>,
    seq_name: String,
}

impl TaskSequence {
    /// `name` defaults to `Seq` or `Par`.
    pub fn new(run_data: Arc<RunData>, name: Option<&str>, parallel: bool) -> Self {
        let name = name.unwrap_or(if parallel { "Par" } else { "Seq" });
        let log_by_time = match run_data.config().report.time_step_msec {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let mut seq = Self {
            base: TaskBase::new(run_data, name),
            tasks: Vec::new(),
            parallel,
            repetitions: Repetitions::default(),
            rate: None,
            let_child_report: true,
            exhaustion: Exhaustion::default(),
            any_exhaustible: false,
            log_by_time,
            counts_by_time: None,
            completed_repetitions: None,
            seq_name: String::new(),
        };
        seq.update_sequence_name();
        seq
    }

    pub fn serial(run_data: Arc<RunData>) -> Self {
        Self::new(run_data, None, false)
    }

    pub fn parallel(run_data: Arc<RunData>) -> Self {
        Self::new(run_data, None, true)
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Append a child. Its depth and stop signal are tied to this sequence.
    pub fn add_task(&mut self, mut task: Box<dyn Task>) {
        task.set_depth(self.base.depth() + 1);
        task.link_stop(self.base.stop_signal());
        self.any_exhaustible |= task.resets_inputs() || task.as_sequence().is_some();
        self.tasks.push(task);
    }

    pub fn with_task(mut self, task: Box<dyn Task>) -> Self {
        self.add_task(task);
        self
    }

    pub fn set_repetitions(&mut self, repetitions: Repetitions) -> Result<(), ConfigError> {
        if self.parallel {
            match repetitions {
                Repetitions::Exhaust => {
                    return Err(ConfigError::ExhaustInParallel(self.seq_name.clone()))
                }
                Repetitions::RunTime(run_time) => {
                    return Err(ConfigError::RunTimeInParallel {
                        sequence: self.seq_name.clone(),
                        run_time,
                    })
                }
                Repetitions::Count(_) => {}
            }
        }
        self.repetitions = repetitions;
        self.update_sequence_name();
        Ok(())
    }

    pub fn with_repetitions(mut self, repetitions: Repetitions) -> Result<Self, ConfigError> {
        self.set_repetitions(repetitions)?;
        Ok(self)
    }

    pub fn set_rate(&mut self, rate: Rate) {
        self.rate = Some(rate);
        self.update_sequence_name();
    }

    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.set_rate(rate);
        self
    }

    pub fn set_name(&mut self, name: &str) {
        self.base.set_name(name);
        self.update_sequence_name();
    }

    /// Run children without recording their statistics, here and in every
    /// nested sequence.
    pub fn set_no_child_report(&mut self) {
        self.let_child_report = false;
        for task in &mut self.tasks {
            if let Some(seq) = task.as_sequence_mut() {
                seq.set_no_child_report();
            }
        }
    }

    fn update_sequence_name(&mut self) {
        let mut name = self.base.name().to_string();
        match self.repetitions {
            Repetitions::Exhaust => name.push_str("_Exhaust"),
            Repetitions::Count(n) if n > 1 => name.push_str(&format!("_{n}")),
            _ => {}
        }
        if let Some(rate) = self.rate {
            name.push_str(&format!("_{rate}"));
        }
        if self.parallel && !name.to_lowercase().contains("par") {
            name.push_str("_Par");
        }
        self.seq_name = name;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn tasks(&self) -> &[Box<dyn Task>] {
        &self.tasks
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn repetitions(&self) -> Repetitions {
        self.repetitions
    }

    pub fn rate(&self) -> Option<Rate> {
        self.rate
    }

    pub fn let_child_report(&self) -> bool {
        self.let_child_report
    }

    /// `true` if the last run ended because a content source was drained.
    pub fn is_exhausted(&self) -> bool {
        self.exhaustion.exhausted
    }

    /// `true` if the last run reset its inputs and the reset has not yet
    /// been consumed by an enclosing sequence.
    pub fn is_reset_exhausted(&self) -> bool {
        self.exhaustion.reset
    }

    pub fn completed_repetitions(&self) -> Option<u32> {
        self.completed_repetitions
    }

    pub fn counts_by_time(&self) -> Option<&TimeBuckets> {
        self.counts_by_time.as_ref()
    }

    // -----------------------------------------------------------------------
    // Serial execution
    // -----------------------------------------------------------------------

    fn do_serial_tasks(&mut self) -> Result<u64> {
        let mut state = SerialRun {
            stop: self.base.stop_signal().clone(),
            pacer: self.rate.map(Pacer::new),
            repetitions: self.repetitions,
            report: self.let_child_report,
            any_exhaustible: self.any_exhaustible,
            started: Instant::now(),
            buckets: self
                .log_by_time
                .filter(|_| !self.let_child_report)
                .map(TimeBuckets::new),
            exhaustion: Exhaustion::default(),
            completed: None,
        };
        debug!(
            sequence = %self.seq_name,
            repetitions = ?state.repetitions,
            rate = ?self.rate,
            "starting serial passes"
        );

        let mut slots: Vec<Slot<'_>> = self.tasks.iter_mut().map(Slot::new).collect();
        let result = thread::scope(|scope| {
            let mut runners = Vec::new();
            let mut result = run_passes(scope, &mut slots, &mut runners, &mut state);

            for runner in &runners {
                runner.stop_now();
            }
            for runner in runners {
                match runner.join() {
                    Ok(n) => {
                        if let Ok(total) = result.as_mut() {
                            *total += n;
                        }
                    }
                    Err(TaskError::NoMoreData) => state.exhaustion.exhausted = true,
                    Err(e) => {
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                }
            }
            result
        });

        self.exhaustion = state.exhaustion;
        self.completed_repetitions = state.completed;
        if state.buckets.is_some() {
            self.counts_by_time = state.buckets;
        }
        result
    }

    // -----------------------------------------------------------------------
    // Parallel execution
    // -----------------------------------------------------------------------

    fn do_parallel_tasks(&mut self) -> Result<u64> {
        let stop = self.base.stop_signal().clone();
        let passes = self.repetitions.count().unwrap_or(1) as usize;
        let mut replicas = Vec::with_capacity(passes * self.tasks.len());
        for _ in 0..passes {
            for task in &self.tasks {
                let mut replica = task.clone_task();
                replica.link_stop(&stop);
                replicas.push(replica);
            }
        }
        debug!(sequence = %self.seq_name, replicas = replicas.len(), rate = ?self.rate, "starting parallel replicas");

        let report = self.let_child_report;
        let mut pacer = self.rate.map(Pacer::new);
        let seq_name = &self.seq_name;
        let planned = replicas.len();
        let mut spawn_error = None;

        let outcomes: Vec<Result<ReplicaOutcome>> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(replicas.len());
            for (i, mut replica) in replicas.into_iter().enumerate() {
                if let Some(pacer) = pacer.as_mut() {
                    if !pacer.wait_turn(&stop) {
                        debug!(sequence = %seq_name, skipped = planned - i, "stopped while pacing replica starts");
                        break;
                    }
                }
                let thread_name = format!("{seq_name}-{i}");
                let spawned = thread::Builder::new()
                    .name(thread_name.clone())
                    .spawn_scoped(scope, move || {
                        let result = replica.run_and_maybe_stats(report);
                        (replica, result)
                    });
                match spawned {
                    Ok(handle) => handles.push((thread_name, handle)),
                    Err(e) => {
                        stop.raise();
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            handles
                .into_iter()
                .map(|(thread, handle)| {
                    handle.join().map_err(|payload| TaskError::ThreadPanicked {
                        thread,
                        message: panic_message(payload.as_ref()),
                    })
                })
                .collect()
        });

        let mut total = 0;
        let mut first_error = spawn_error.map(TaskError::from);
        let mut exhaustion = Exhaustion::default();
        let mut buckets: Option<TimeBuckets> = None;

        for outcome in outcomes {
            let (mut replica, result) = match outcome {
                Ok(pair) => pair,
                Err(e) => {
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            match result {
                Ok(n) => {
                    total += n;
                    if self.any_exhaustible {
                        exhaustion.observe(&mut *replica);
                    }
                }
                Err(TaskError::NoMoreData) => exhaustion.exhausted = true,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
            if let Some(sub) = replica.as_sequence().and_then(TaskSequence::counts_by_time) {
                buckets
                    .get_or_insert_with(|| TimeBuckets::new(sub.step()))
                    .merge(sub);
            }
        }

        self.exhaustion = exhaustion;
        self.counts_by_time = buckets;
        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }

    /// Attach the time buckets to this run's statistics record.
    fn flush_counts_by_time(&self) {
        if let (Some(buckets), Some(stats)) = (&self.counts_by_time, self.base.stats()) {
            stats.lock().set_counts_by_time(buckets.clone());
        }
    }
}

type ReplicaOutcome = (Box<dyn Task>, Result<u64>);

// ---------------------------------------------------------------------------
// Serial pass loop
// ---------------------------------------------------------------------------

/// A child of a serial sequence for the duration of one `do_logic` call.
enum Slot<'t> {
    Foreground(&'t mut Box<dyn Task>),
    /// Handed to a runner on the first pass; `None` afterwards.
    Background(Option<&'t mut Box<dyn Task>>),
}

impl<'t> Slot<'t> {
    fn new(task: &'t mut Box<dyn Task>) -> Self {
        if task.base().run_in_background() {
            Slot::Background(Some(task))
        } else {
            Slot::Foreground(task)
        }
    }
}

struct SerialRun {
    stop: StopSignal,
    pacer: Option<Pacer>,
    repetitions: Repetitions,
    report: bool,
    any_exhaustible: bool,
    started: Instant,
    buckets: Option<TimeBuckets>,
    exhaustion: Exhaustion,
    completed: Option<u32>,
}

impl SerialRun {
    fn wants_another_pass(&self, passes: u32) -> bool {
        if self.stop.is_raised() {
            return false;
        }
        match self.repetitions {
            Repetitions::Count(n) => passes < n,
            Repetitions::Exhaust => !self.exhaustion.exhausted,
            Repetitions::RunTime(_) => true,
        }
    }
}

fn run_passes<'scope, 'env, 't: 'scope>(
    scope: &'scope Scope<'scope, 'env>,
    slots: &mut [Slot<'t>],
    runners: &mut Vec<BackgroundRunner<'scope>>,
    state: &mut SerialRun,
) -> Result<u64> {
    let mut total = 0;
    let mut passes = 0u32;

    'passes: while state.wants_another_pass(passes) {
        for slot in slots.iter_mut() {
            let task = match slot {
                Slot::Background(pending) => {
                    if let Some(task) = pending.take() {
                        runners.push(BackgroundRunner::spawn(scope, task, state.report)?);
                    }
                    continue;
                }
                Slot::Foreground(task) => &mut ***task,
            };

            if let Some(pacer) = state.pacer.as_mut() {
                if !pacer.wait_turn(&state.stop) {
                    break 'passes;
                }
            }

            match task.run_and_maybe_stats(state.report) {
                Ok(n) => {
                    total += n;
                    if let Some(buckets) = state.buckets.as_mut() {
                        buckets.record(state.started.elapsed(), n);
                    }
                    if state.any_exhaustible {
                        state.exhaustion.observe(task);
                    }
                }
                Err(TaskError::NoMoreData) => {
                    debug!(task = %task.name(), "content exhausted");
                    state.exhaustion.exhausted = true;
                }
                Err(e) => return Err(e),
            }
        }

        passes += 1;
        if let Repetitions::RunTime(limit) = state.repetitions {
            if state.started.elapsed() >= limit {
                break;
            }
        }
    }
    if let Repetitions::RunTime(_) = state.repetitions {
        state.completed = Some(passes);
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Task impl
// ---------------------------------------------------------------------------

impl Clone for TaskSequence {
    /// Deep copy: children are cloned and re-linked to the copy's own stop
    /// signal.
    fn clone(&self) -> Self {
        let base = self.base.clone();
        let stop = base.stop_signal().clone();
        let tasks = self
            .tasks
            .iter()
            .map(|task| {
                let mut copy = task.clone_task();
                copy.link_stop(&stop);
                copy
            })
            .collect();
        Self {
            base,
            tasks,
            parallel: self.parallel,
            repetitions: self.repetitions,
            rate: self.rate,
            let_child_report: self.let_child_report,
            exhaustion: self.exhaustion,
            any_exhaustible: self.any_exhaustible,
            log_by_time: self.log_by_time,
            counts_by_time: None,
            completed_repetitions: None,
            seq_name: self.seq_name.clone(),
        }
    }
}

impl Task for TaskSequence {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.exhaustion = Exhaustion::default();
        self.completed_repetitions = None;

        let result = if self.parallel {
            self.do_parallel_tasks()
        } else {
            self.do_serial_tasks()
        };

        self.flush_counts_by_time();
        self.base.stop_signal().clear();
        if let Err(e) = &result {
            debug!(sequence = %self.seq_name, error = %e, "sequence ended with an error");
        }
        result
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn name(&self) -> String {
        self.seq_name.clone()
    }

    fn as_sequence(&self) -> Option<&TaskSequence> {
        Some(self)
    }

    fn as_sequence_mut(&mut self) -> Option<&mut TaskSequence> {
        Some(self)
    }

    fn link_stop(&mut self, parent: &StopSignal) {
        self.base.link_stop_to(parent);
        let stop = self.base.stop_signal().clone();
        for task in &mut self.tasks {
            task.link_stop(&stop);
        }
    }

    fn set_depth(&mut self, depth: usize) {
        self.base.set_depth(depth);
        for task in &mut self.tasks {
            task.set_depth(depth + 1);
        }
    }

    fn close(&mut self) -> Result<()> {
        for task in &mut self.tasks {
            task.close()?;
        }
        Ok(())
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self.base.depth();
        self.base.write_prefix(f, &self.seq_name)?;
        f.write_str(if self.parallel { " [" } else { " {" })?;
        writeln!(f)?;
        for task in &self.tasks {
            task.fmt_tree(f)?;
            writeln!(f)?;
        }
        write!(f, "{:width$}", "", width = 4 * depth)?;
        f.write_str(match (self.let_child_report, self.parallel) {
            (false, _) => ">",
            (true, true) => "]",
            (true, false) => "}",
        })?;
        match self.repetitions {
            Repetitions::RunTime(d) => write!(f, " {}s", d.as_secs_f64())?,
            Repetitions::Exhaust => f.write_str(" * EXHAUST")?,
            Repetitions::Count(n) if n > 1 => write!(f, " * {n}")?,
            Repetitions::Count(_) => {}
        }
        if let Some(rate) = self.rate {
            write!(f, ",  rate: {rate}")?;
        }
        self.base.write_background(f)
    }
}

impl fmt::Display for TaskSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f)
    }
}

impl fmt::Debug for TaskSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSequence")
            .field("name", &self.seq_name)
            .field("parallel", &self.parallel)
            .field("repetitions", &self.repetitions)
            .field("rate", &self.rate)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        run_data, run_data_with, CountingTask, ExhaustingTask, FailingTask, RefillTask, SpinTask,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    fn boxed(task: impl Task + 'static) -> Box<dyn Task> {
        Box::new(task)
    }

    #[test]
    fn serial_runs_children_in_order() {
        let rd = run_data();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(CountingTask::new(&rd, "c1").with_log(&log)))
            .with_task(boxed(CountingTask::new(&rd, "c2").with_log(&log)))
            .with_repetitions(Repetitions::Count(3))
            .unwrap();

        assert_eq!(seq.run_and_maybe_stats(false).unwrap(), 6);
        assert_eq!(*log.lock(), vec!["c1", "c2", "c1", "c2", "c1", "c2"]);
    }

    #[test]
    fn zero_repetitions_run_nothing() {
        let rd = run_data();
        let counter = CountingTask::new(&rd, "c");
        let calls = counter.calls();
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(counter))
            .with_repetitions(Repetitions::Count(0))
            .unwrap();
        assert_eq!(seq.run_and_maybe_stats(true).unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn disabled_children_contribute_zero() {
        let rd = run_data();
        let mut quiet = CountingTask::new(&rd, "quiet").with_count(10);
        quiet.base_mut().set_disable_counting(true);
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(quiet))
            .with_task(boxed(CountingTask::new(&rd, "loud").with_count(2)))
            .with_repetitions(Repetitions::Count(2))
            .unwrap();
        assert_eq!(seq.run_and_maybe_stats(false).unwrap(), 4);
    }

    #[test]
    fn exhaust_stops_in_the_exhausting_pass() {
        let rd = run_data();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(ExhaustingTask::new(&rd, "e", 2)))
            .with_task(boxed(CountingTask::new(&rd, "after").with_count(0).with_log(&log)))
            .with_repetitions(Repetitions::Exhaust)
            .unwrap();

        assert_eq!(seq.run_and_maybe_stats(false).unwrap(), 2);
        assert!(seq.is_exhausted());
        // Siblings still run in the pass that hit exhaustion.
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn exhaust_starts_clean_on_the_next_call() {
        let rd = run_data();
        let exhausting = ExhaustingTask::new(&rd, "e", 1);
        let budget = exhausting.budget();
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(exhausting))
            .with_repetitions(Repetitions::Exhaust)
            .unwrap();

        assert_eq!(seq.run_and_maybe_stats(false).unwrap(), 1);
        assert!(seq.is_exhausted());

        budget.store(3, Ordering::SeqCst);
        assert_eq!(seq.run_and_maybe_stats(false).unwrap(), 3);
        assert!(seq.is_exhausted());
    }

    #[test]
    fn reset_inputs_clears_exhaustion_and_propagates() {
        let rd = run_data();
        let exhausting = ExhaustingTask::new(&rd, "e", 2);
        let budget = exhausting.budget();
        let inner = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(exhausting))
            .with_repetitions(Repetitions::Exhaust)
            .unwrap();
        let mut outer = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(inner))
            .with_task(boxed(RefillTask::new(&rd, budget, 2)))
            .with_repetitions(Repetitions::Count(2))
            .unwrap();

        assert_eq!(outer.run_and_maybe_stats(false).unwrap(), 4);
        assert!(!outer.is_exhausted());
        assert!(outer.is_reset_exhausted());
    }

    #[test]
    fn nested_exhaustion_stops_the_parent() {
        let rd = run_data();
        let inner = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(ExhaustingTask::new(&rd, "e", 5)))
            .with_repetitions(Repetitions::Count(2))
            .unwrap();
        let mut outer = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(inner))
            .with_repetitions(Repetitions::Exhaust)
            .unwrap();

        // Passes of two: 2, 2, then 1 + exhaustion.
        assert_eq!(outer.run_and_maybe_stats(false).unwrap(), 5);
        assert!(outer.is_exhausted());
    }

    #[test]
    fn fixed_time_records_completed_passes() {
        let rd = run_data();
        let counter = CountingTask::new(&rd, "c").with_sleep(Duration::from_millis(5));
        let calls = counter.calls();
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(counter))
            .with_repetitions(Repetitions::RunTime(Duration::from_millis(40)))
            .unwrap();

        let start = Instant::now();
        let total = seq.run_and_maybe_stats(false).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
        let passes = seq.completed_repetitions().unwrap();
        assert_eq!(u64::from(passes), calls.load(Ordering::SeqCst));
        assert_eq!(total, u64::from(passes));
    }

    #[test]
    fn rate_spaces_child_starts() {
        let rd = run_data();
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(CountingTask::new(&rd, "c")))
            .with_repetitions(Repetitions::Count(5))
            .unwrap()
            .with_rate(Rate::per_second(50).unwrap());

        let start = Instant::now();
        assert_eq!(seq.run_and_maybe_stats(false).unwrap(), 5);
        // k = 5 starts at 20ms spacing: at least (k - 1) / r.
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn failures_propagate_unchanged() {
        let rd = run_data();
        let mut seq = TaskSequence::serial(Arc::clone(&rd)).with_task(boxed(FailingTask::new(&rd)));
        assert!(matches!(
            seq.run_and_maybe_stats(false),
            Err(TaskError::Failed { .. })
        ));
    }

    #[test]
    fn background_child_starts_once_and_is_joined() {
        let rd = run_data();
        let mut spinner = SpinTask::new(&rd, "Spin");
        spinner.base_mut().set_background(Some(0));
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(spinner))
            .with_task(boxed(
                CountingTask::new(&rd, "c").with_count(0).with_sleep(Duration::from_millis(5)),
            ))
            .with_repetitions(Repetitions::Count(4))
            .unwrap();

        let total = seq.run_and_maybe_stats(false).unwrap();
        // Only the spinner counts: one nap per millisecond, roughly 20 of them.
        assert!(total > 0);
        assert!(!seq.base().stop_requested());
    }

    #[test]
    fn background_child_is_joined_after_a_failure() {
        let rd = run_data();
        let mut spinner = SpinTask::new(&rd, "Spin");
        spinner.base_mut().set_background(Some(2));
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(spinner))
            .with_task(boxed(FailingTask::new(&rd)));
        assert!(seq.run_and_maybe_stats(false).is_err());
    }

    #[test]
    fn stop_now_ends_a_sequence_early() {
        let rd = run_data();
        let counter = CountingTask::new(&rd, "c").with_sleep(Duration::from_millis(2));
        let calls = counter.calls();
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(counter))
            .with_repetitions(Repetitions::Count(1_000_000))
            .unwrap();
        let stop = seq.base().stop_signal().clone();

        thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(20));
                stop.raise();
            });
            seq.run_and_maybe_stats(false).unwrap();
        });
        assert!(calls.load(Ordering::SeqCst) < 1_000_000);
        // The flag is cleared once the sequence returns.
        assert!(!seq.base().stop_requested());
    }

    #[test]
    fn parallel_runs_every_replica() {
        let rd = run_data();
        let c1 = CountingTask::new(&rd, "c1");
        let c2 = CountingTask::new(&rd, "c2");
        let (calls1, calls2) = (c1.calls(), c2.calls());
        let mut seq = TaskSequence::parallel(Arc::clone(&rd))
            .with_task(boxed(c1))
            .with_task(boxed(c2))
            .with_repetitions(Repetitions::Count(2))
            .unwrap();

        assert_eq!(seq.run_and_maybe_stats(true).unwrap(), 4);
        assert_eq!(calls1.load(Ordering::SeqCst), 2);
        assert_eq!(calls2.load(Ordering::SeqCst), 2);
        // One record for the sequence and one per replica.
        assert_eq!(rd.points().task_stats().len(), 5);
    }

    #[test]
    fn parallel_exhaustion_reaches_the_parent() {
        let rd = run_data();
        let mut seq = TaskSequence::parallel(Arc::clone(&rd))
            .with_task(boxed(ExhaustingTask::new(&rd, "e", 3)))
            .with_repetitions(Repetitions::Count(4))
            .unwrap();
        assert_eq!(seq.run_and_maybe_stats(false).unwrap(), 3);
        assert!(seq.is_exhausted());
    }

    #[test]
    fn parallel_waits_for_all_replicas_before_failing() {
        let rd = run_data();
        let counter = CountingTask::new(&rd, "slow").with_sleep(Duration::from_millis(10));
        let calls = counter.calls();
        let mut seq = TaskSequence::parallel(Arc::clone(&rd))
            .with_task(boxed(FailingTask::new(&rd)))
            .with_task(boxed(counter))
            .with_repetitions(Repetitions::Count(3))
            .unwrap();

        assert!(matches!(
            seq.run_and_maybe_stats(false),
            Err(TaskError::Failed { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn parallel_rejects_exhaust_and_run_time() {
        let rd = run_data();
        assert!(matches!(
            TaskSequence::parallel(Arc::clone(&rd)).set_repetitions(Repetitions::Exhaust),
            Err(ConfigError::ExhaustInParallel(_))
        ));
        assert!(matches!(
            TaskSequence::parallel(rd).set_repetitions(Repetitions::RunTime(Duration::from_secs(1))),
            Err(ConfigError::RunTimeInParallel { .. })
        ));
    }

    #[test]
    fn time_buckets_flush_to_the_sequence_record() {
        let rd = run_data_with("[report]\ntime_step_msec = 1000\n");
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(CountingTask::new(&rd, "c").with_count(2)))
            .with_repetitions(Repetitions::Count(3))
            .unwrap();
        seq.set_no_child_report();

        assert_eq!(seq.run_and_maybe_stats(true).unwrap(), 6);
        let stats = rd.points().task_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].counts_by_time().unwrap().counts(), &[6]);
    }

    #[test]
    fn parallel_merges_replica_buckets() {
        let rd = run_data_with("[report]\ntime_step_msec = 1000\n");
        let mut inner = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(CountingTask::new(&rd, "c")))
            .with_repetitions(Repetitions::Count(5))
            .unwrap();
        inner.set_no_child_report();
        let mut seq = TaskSequence::parallel(Arc::clone(&rd))
            .with_task(boxed(inner))
            .with_repetitions(Repetitions::Count(3))
            .unwrap();

        assert_eq!(seq.run_and_maybe_stats(true).unwrap(), 15);
        assert_eq!(seq.counts_by_time().unwrap().counts(), &[15]);
    }

    #[test]
    fn sequence_names() {
        let rd = run_data();
        let seq = TaskSequence::serial(Arc::clone(&rd));
        assert_eq!(seq.name(), "Seq");

        let seq = TaskSequence::serial(Arc::clone(&rd))
            .with_repetitions(Repetitions::Exhaust)
            .unwrap();
        assert_eq!(seq.name(), "Seq_Exhaust");

        let seq = TaskSequence::parallel(Arc::clone(&rd))
            .with_repetitions(Repetitions::Count(4))
            .unwrap()
            .with_rate(Rate::per_minute(30).unwrap());
        assert_eq!(seq.name(), "Par_4_30/min");

        let seq = TaskSequence::new(Arc::clone(&rd), Some("Populate"), true);
        assert_eq!(seq.name(), "Populate_Par");

        let seq = TaskSequence::new(rd, Some("Parse"), true);
        assert_eq!(seq.name(), "Parse");
    }

    #[test]
    fn display_dumps_the_tree() {
        let rd = run_data();
        let mut spinner = SpinTask::new(&rd, "Spin");
        spinner.base_mut().set_background(Some(-2));
        let inner = TaskSequence::parallel(Arc::clone(&rd))
            .with_task(boxed(CountingTask::new(&rd, "AddDoc")))
            .with_repetitions(Repetitions::Count(4))
            .unwrap();
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(inner))
            .with_task(boxed(spinner))
            .with_repetitions(Repetitions::Exhaust)
            .unwrap()
            .with_rate(Rate::per_second(10).unwrap());
        seq.set_depth(0);

        let expected = "\
Seq_Exhaust_10/sec {
    Par_4 [
        AddDoc
    ] * 4
    Spin &-2
} * EXHAUST,  rate: 10/sec";
        assert_eq!(seq.to_string(), expected);
    }

    #[test]
    fn display_marks_silent_and_timed_sequences() {
        let rd = run_data();
        let mut seq = TaskSequence::serial(Arc::clone(&rd))
            .with_task(boxed(CountingTask::new(&rd, "c")))
            .with_repetitions(Repetitions::RunTime(Duration::from_millis(500)))
            .unwrap();
        seq.set_no_child_report();
        seq.base_mut().set_disable_counting(true);
        seq.base_mut().set_background(Some(0));
        assert_eq!(seq.to_string(), "-Seq {\n    c\n> 0.5s &");
    }

    #[test]
    fn clones_are_independent() {
        let rd = run_data();
        let seq = TaskSequence::serial(Arc::clone(&rd)).with_task(boxed(CountingTask::new(&rd, "c")));
        let copy = seq.clone_task();
        copy.stop_now();
        assert!(!seq.base().stop_requested());
        assert!(copy.as_sequence().unwrap().tasks()[0].base().stop_requested());
        assert!(!seq.tasks()[0].base().stop_requested());
    }
}
