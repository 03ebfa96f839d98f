//! Background task runner.
//!
//! A background child of a serial sequence runs on its own scoped thread
//! for the whole of the sequence's `do_logic` call. Its thread performs a
//! single `run_and_maybe_stats`; the sequence raises the task's stop signal
//! once its own passes are done and then joins the thread.

use crate::error::{Result, TaskError};
use crate::stop::StopSignal;
use crate::task::Task;
use std::any::Any;
use std::thread::{self, Scope, ScopedJoinHandle};
use tracing::debug;

pub struct BackgroundRunner<'scope> {
    thread_name: String,
    stop: StopSignal,
    handle: Option<ScopedJoinHandle<'scope, Result<u64>>>,
}

impl<'scope> BackgroundRunner<'scope> {
    /// Start `task` on a named thread inside `scope`.
    pub fn spawn<'env>(
        scope: &'scope Scope<'scope, 'env>,
        task: &'scope mut Box<dyn Task>,
        report_stats: bool,
    ) -> Result<Self> {
        let thread_name = format!("bg-{}", task.name());
        let stop = task.base().stop_signal().clone();
        let delta = task.base().background_priority_delta();
        if delta != 0 {
            // std exposes no portable thread priority API; the delta is a hint.
            debug!(task = %thread_name, priority_delta = delta, "background priority not applied");
        }

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn_scoped(scope, move || task.run_and_maybe_stats(report_stats))?;
        debug!(task = %thread_name, "background task started");

        Ok(Self {
            thread_name,
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop_now(&self) {
        self.stop.raise();
    }

    /// Wait for the task to finish and return its count. The task's stop
    /// flag is cleared so the next run starts fresh.
    pub fn join(mut self) -> Result<u64> {
        let Some(handle) = self.handle.take() else {
            return Ok(0);
        };
        let joined = handle.join();
        self.stop.clear();
        debug!(task = %self.thread_name, "background task joined");
        joined.map_err(|payload| TaskError::ThreadPanicked {
            thread: self.thread_name.clone(),
            message: panic_message(payload.as_ref()),
        })?
    }
}

impl Drop for BackgroundRunner<'_> {
    /// An unjoined runner is being abandoned (the caller is unwinding);
    /// stop it so the enclosing scope can finish joining.
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop.raise();
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
