//! Name → constructor table for the leaf tasks.

use crate::tasks::{
    AddDocTask, ClearStatsTask, ConsumeContentSourceTask, NewRoundTask, ResetInputsTask,
    ResetSystemTask, WaitTask,
};
use std::sync::Arc;
use taskbench_core::{ConfigError, RunData, Task};

type Factory = fn(Arc<RunData>) -> Box<dyn Task>;

const TASKS: &[(&str, Factory)] = &[
    ("AddDoc", add_doc),
    ("ConsumeContentSource", consume_content_source),
    ("Wait", wait),
    ("NewRound", new_round),
    ("ResetInputs", reset_inputs),
    ("ClearStats", clear_stats),
    ("ResetSystem", reset_system),
];

fn add_doc(rd: Arc<RunData>) -> Box<dyn Task> {
    Box::new(AddDocTask::new(rd))
}

fn consume_content_source(rd: Arc<RunData>) -> Box<dyn Task> {
    Box::new(ConsumeContentSourceTask::new(rd))
}

fn wait(rd: Arc<RunData>) -> Box<dyn Task> {
    Box::new(WaitTask::new(rd))
}

fn new_round(rd: Arc<RunData>) -> Box<dyn Task> {
    Box::new(NewRoundTask::new(rd))
}

fn reset_inputs(rd: Arc<RunData>) -> Box<dyn Task> {
    Box::new(ResetInputsTask::new(rd))
}

fn clear_stats(rd: Arc<RunData>) -> Box<dyn Task> {
    Box::new(ClearStatsTask::new(rd))
}

fn reset_system(rd: Arc<RunData>) -> Box<dyn Task> {
    Box::new(ResetSystemTask::new(rd))
}

/// Names accepted by [`create_task`].
pub fn task_names() -> impl Iterator<Item = &'static str> {
    TASKS.iter().map(|(name, _)| *name)
}

/// Build the task called `name` (case-insensitive, optional `Task` suffix)
/// and apply `params` if given.
pub fn create_task(
    name: &str,
    run_data: &Arc<RunData>,
    params: Option<&str>,
) -> Result<Box<dyn Task>, ConfigError> {
    let trimmed = name.trim();
    let key = trimmed
        .strip_suffix("Task")
        .filter(|k| !k.is_empty())
        .unwrap_or(trimmed);

    let (_, factory) = TASKS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(key))
        .ok_or_else(|| ConfigError::UnknownTask(trimmed.to_string()))?;

    let mut task = factory(Arc::clone(run_data));
    if let Some(params) = params {
        task.set_params(params)?;
    }
    Ok(task)
}
