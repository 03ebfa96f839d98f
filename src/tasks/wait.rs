use std::sync::Arc;
use std::time::{Duration, Instant};
use taskbench_core::{ConfigError, Result, RunData, Task, TaskBase};

const POLL: Duration = Duration::from_millis(1);

/// Sleeps for a fixed time, waking early when stopped. Parameter: a number
/// of seconds with an optional `s`, `m` or `h` suffix (`0.5`, `10s`, `4.5m`,
/// `2h`).
#[derive(Debug, Clone)]
pub struct WaitTask {
    base: TaskBase,
    wait: Duration,
}

impl WaitTask {
    pub fn new(run_data: Arc<RunData>) -> Self {
        Self {
            base: TaskBase::new(run_data, "Wait"),
            wait: Duration::ZERO,
        }
    }

    pub fn wait_time(&self) -> Duration {
        self.wait
    }
}

fn parse_wait(params: &str) -> Option<Duration> {
    let trimmed = params.trim();
    let (number, multiplier) = match trimmed.chars().last()? {
        's' => (&trimmed[..trimmed.len() - 1], 1.0),
        'm' => (&trimmed[..trimmed.len() - 1], 60.0),
        'h' => (&trimmed[..trimmed.len() - 1], 3600.0),
        _ => (trimmed, 1.0),
    };
    let secs = number.trim().parse::<f64>().ok()? * multiplier;
    Duration::try_from_secs_f64(secs).ok()
}

impl Task for WaitTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        let deadline = Instant::now() + self.wait;
        while !self.base.stop_requested() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(POLL));
        }
        Ok(0)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn supports_params(&self) -> bool {
        true
    }

    fn set_params(&mut self, params: &str) -> Result<(), ConfigError> {
        self.wait = parse_wait(params).ok_or_else(|| {
            ConfigError::invalid_params("Wait", format!("{params:?}; expected e.g. 10.0s, 4.5m, 2h"))
        })?;
        self.base.set_params(params.trim());
        Ok(())
    }

    fn should_not_record_stats(&self) -> bool {
        true
    }
}
