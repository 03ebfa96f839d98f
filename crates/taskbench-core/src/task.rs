//! The task lifecycle contract.
//!
//! A [`Task`] is one unit of measured work. Drivers call
//! [`Task::run_and_maybe_stats`], which runs `setup → do_logic → tear_down`
//! and, when asked, brackets the measured part with the statistics
//! collector. Only `do_logic` is timed.
//!
//! State common to every task lives in [`TaskBase`]; implementors embed one
//! and expose it through [`Task::base`] / [`Task::base_mut`].

use crate::error::{ConfigError, Result};
use crate::run_data::RunData;
use crate::sequence::TaskSequence;
use crate::stats::StatsHandle;
use crate::stop::StopSignal;
use std::fmt;
use std::sync::Arc;
use tracing::info;

// ---------------------------------------------------------------------------
// TaskBase
// ---------------------------------------------------------------------------

/// Per-task state shared by every [`Task`] implementation.
#[derive(Debug)]
pub struct TaskBase {
    run_data: Arc<RunData>,
    name: String,
    params: Option<String>,
    depth: usize,
    log_step: u64,
    log_step_count: u64,
    max_depth_log_start: usize,
    disable_counting: bool,
    /// Priority delta when the task runs in the background.
    background: Option<i32>,
    stop: StopSignal,
    /// Record of the run in progress, while one is being measured.
    stats: Option<StatsHandle>,
}

impl TaskBase {
    pub fn new(run_data: Arc<RunData>, name: impl Into<String>) -> Self {
        let name = name.into();
        let config = run_data.config();
        let log_step = match config.log_step_for(&name) {
            step if step <= 0 => u64::MAX,
            step => step as u64,
        };
        let max_depth_log_start = config.log.max_depth;
        Self {
            run_data,
            name,
            params: None,
            depth: 0,
            log_step,
            log_step_count: 0,
            max_depth_log_start,
            disable_counting: false,
            background: None,
            stop: StopSignal::new(),
            stats: None,
        }
    }

    pub fn run_data(&self) -> &Arc<RunData> {
        &self.run_data
    }

    /// Type name without parameters.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    /// Store an already validated parameter string.
    pub fn set_params(&mut self, params: &str) {
        self.params = Some(params.to_string());
    }

    /// Name as displayed and recorded: `Name` or `Name(params)`.
    pub fn display_name(&self) -> String {
        match &self.params {
            Some(p) => format!("{}({})", self.name, p),
            None => self.name.clone(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn disable_counting(&self) -> bool {
        self.disable_counting
    }

    pub fn set_disable_counting(&mut self, disable: bool) {
        self.disable_counting = disable;
    }

    pub fn run_in_background(&self) -> bool {
        self.background.is_some()
    }

    /// `Some(delta)` marks the task as a background task.
    pub fn set_background(&mut self, priority_delta: Option<i32>) {
        self.background = priority_delta;
    }

    pub fn background_priority_delta(&self) -> i32 {
        self.background.unwrap_or(0)
    }

    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Make this task's stop signal a descendant of `parent`.
    pub fn link_stop_to(&mut self, parent: &StopSignal) {
        self.stop.link_to(parent);
    }

    /// `true` once a stop was requested for this task or an enclosing one.
    pub fn stop_requested(&self) -> bool {
        self.stop.is_raised()
    }

    pub fn stats(&self) -> Option<&StatsHandle> {
        self.stats.as_ref()
    }

    /// Count one completion; returns the running total when it is time to
    /// log progress.
    fn tick_log_step(&mut self) -> Option<u64> {
        self.log_step_count += 1;
        (self.log_step_count % self.log_step == 0).then_some(self.log_step_count)
    }

    fn log_progress(&self, message: &str) {
        let elapsed = self.run_data.start_time().elapsed().as_secs_f64();
        let thread = std::thread::current();
        info!(
            elapsed = format_args!("{elapsed:7.2}s"),
            thread = thread.name().unwrap_or("unnamed"),
            "{message}"
        );
    }

    /// Indentation, counting marker and name.
    pub fn write_prefix(&self, f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
        write!(f, "{:width$}", "", width = 4 * self.depth)?;
        if self.disable_counting {
            f.write_str("-")?;
        }
        f.write_str(name)
    }

    /// ` &` or ` &<delta>` for background tasks, nothing otherwise.
    pub fn write_background(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.background {
            Some(0) => f.write_str(" &"),
            Some(delta) => write!(f, " &{delta}"),
            None => Ok(()),
        }
    }
}

impl Clone for TaskBase {
    /// Clones get their own stop flag and no in-flight statistics.
    fn clone(&self) -> Self {
        Self {
            run_data: Arc::clone(&self.run_data),
            name: self.name.clone(),
            params: self.params.clone(),
            depth: self.depth,
            log_step: self.log_step,
            log_step_count: self.log_step_count,
            max_depth_log_start: self.max_depth_log_start,
            disable_counting: self.disable_counting,
            background: self.background,
            stop: self.stop.fork(),
            stats: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of measured work.
///
/// `do_logic` must be repeatable in a tight loop. `setup` and `tear_down`
/// are excluded from the measured interval and must be safe to call even
/// when no work was done.
pub trait Task: Send {
    fn base(&self) -> &TaskBase;

    fn base_mut(&mut self) -> &mut TaskBase;

    /// Perform the work; returns the number of work items completed.
    /// A drained content source is reported as
    /// [`TaskError::NoMoreData`](crate::TaskError::NoMoreData).
    fn do_logic(&mut self) -> Result<u64>;

    /// Independent deep copy for a parallel replica. Shares only the run
    /// context with `self`.
    fn clone_task(&self) -> Box<dyn Task>;

    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Logs progress every `log.step` completions.
    fn tear_down(&mut self) -> Result<()> {
        if let Some(count) = self.base_mut().tick_log_step() {
            let message = self.log_message(count);
            self.base().log_progress(&message);
        }
        Ok(())
    }

    fn log_message(&self, count: u64) -> String {
        format!("processed {count} records")
    }

    fn name(&self) -> String {
        self.base().display_name()
    }

    fn supports_params(&self) -> bool {
        false
    }

    /// Parse and store a parameter string. Implementors that accept
    /// parameters override this and call [`TaskBase::set_params`].
    fn set_params(&mut self, params: &str) -> Result<(), ConfigError> {
        if !self.supports_params() {
            return Err(ConfigError::ParamsNotSupported {
                task: self.base().name().to_string(),
            });
        }
        self.base_mut().set_params(params);
        Ok(())
    }

    /// Tasks returning `true` are never bracketed by the statistics
    /// collector (control tasks such as `NewRound`).
    fn should_not_record_stats(&self) -> bool {
        false
    }

    fn should_never_log_at_start(&self) -> bool {
        false
    }

    /// `true` for tasks that rewind the content source. Sequences use it to
    /// clear their exhaustion state.
    fn resets_inputs(&self) -> bool {
        false
    }

    fn as_sequence(&self) -> Option<&TaskSequence> {
        None
    }

    fn as_sequence_mut(&mut self) -> Option<&mut TaskSequence> {
        None
    }

    /// Request cooperative cancellation of this task and everything it runs.
    fn stop_now(&self) {
        self.base().stop.raise();
    }

    /// Make this task's stop signal a descendant of `parent`.
    fn link_stop(&mut self, parent: &StopSignal) {
        self.base_mut().link_stop_to(parent);
    }

    fn set_depth(&mut self, depth: usize) {
        self.base_mut().set_depth(depth);
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Structural dump used by `Display`.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base();
        base.write_prefix(f, &self.name())?;
        base.write_background(f)
    }

    /// Run the full lifecycle once. With `report_stats`, the `do_logic` call
    /// is recorded in the run's [`Points`](crate::Points). Disabled counting
    /// forces the returned count to zero.
    fn run_and_maybe_stats(&mut self, report_stats: bool) -> Result<u64> {
        if !report_stats || self.should_not_record_stats() {
            self.setup()?;
            let count = self.do_logic()?;
            let count = if self.base().disable_counting { 0 } else { count };
            self.tear_down()?;
            return Ok(count);
        }

        let base = self.base();
        if base.depth <= base.max_depth_log_start && !self.should_never_log_at_start() {
            info!(task = %self.name(), depth = base.depth, "starting task");
        }

        self.setup()?;
        let run_data = Arc::clone(self.base().run_data());
        let round = Some(run_data.config().round());
        let handle = run_data.points().mark_task_start(&self.name(), round);
        self.base_mut().stats = Some(Arc::clone(&handle));

        let result = self.do_logic();
        self.base_mut().stats = None;
        let count = result?;
        let count = if self.base().disable_counting { 0 } else { count };
        run_data.points().mark_task_end(&handle, count);

        self.tear_down()?;
        Ok(count)
    }
}

impl fmt::Display for dyn Task + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f)
    }
}

impl fmt::Debug for dyn Task + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name())
            .field("depth", &self.base().depth())
            .finish_non_exhaustive()
    }
}

impl Clone for Box<dyn Task> {
    fn clone(&self) -> Self {
        self.clone_task()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
