//! Per-task summary of a finished run, as a text table or JSON.

use serde::Serialize;
use std::fmt;
use taskbench_core::{Points, Result, TaskStats};

/// One row: every completed run of a task name folded together.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub name: String,
    /// `None` when the runs spanned several rounds.
    pub round: Option<u32>,
    pub runs: u32,
    pub count: u64,
    pub elapsed_secs: f64,
    /// Work items per second of summed task time.
    pub per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts_by_time: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_msec: Option<u64>,
}

impl TaskSummary {
    fn from_stats(stats: &TaskStats) -> Self {
        let elapsed_secs = stats.elapsed().as_secs_f64();
        let per_sec = if elapsed_secs > 0.0 {
            stats.count() as f64 / elapsed_secs
        } else {
            0.0
        };
        let buckets = stats.counts_by_time();
        Self {
            name: stats.task_name().to_string(),
            round: stats.round(),
            runs: stats.num_runs(),
            count: stats.count(),
            elapsed_secs,
            per_sec,
            counts_by_time: buckets.map(|b| b.counts().to_vec()),
            bucket_msec: buckets.map(|b| b.step().as_millis() as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub tasks: Vec<TaskSummary>,
}

impl Summary {
    /// Fold the collector's records by task name, in order of first
    /// appearance. Runs that never finished are left out.
    pub fn collect(points: &Points) -> Result<Self> {
        let mut folded: Vec<TaskStats> = Vec::new();
        for stats in points.task_stats() {
            if stats.num_runs() == 0 {
                continue;
            }
            match folded.iter_mut().find(|s| s.task_name() == stats.task_name()) {
                Some(existing) => existing.add(&stats)?,
                None => folded.push(stats),
            }
        }
        Ok(Self {
            generated_at: chrono::Utc::now(),
            tasks: folded.iter().map(TaskSummary::from_stats).collect(),
        })
    }

    pub fn task(&self, name: &str) -> Option<&TaskSummary> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .tasks
            .iter()
            .map(|t| t.name.len())
            .max()
            .unwrap_or(0)
            .max("Operation".len());
        writeln!(
            f,
            "{:<width$}  {:>5}  {:>6}  {:>12}  {:>12}  {:>10}",
            "Operation", "round", "runs", "records", "rec/s", "elapsed"
        )?;
        for t in &self.tasks {
            let round = t.round.map_or_else(|| "-".to_string(), |r| r.to_string());
            writeln!(
                f,
                "{:<width$}  {:>5}  {:>6}  {:>12}  {:>12.2}  {:>9.2}s",
                t.name, round, t.runs, t.count, t.per_sec, t.elapsed_secs
            )?;
        }
        Ok(())
    }
}
