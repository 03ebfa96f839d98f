use std::sync::Arc;
use taskbench_core::{Result, RunData, Task, TaskBase};

/// Pulls one document from the content source and discards it. Measures
/// the source on its own.
#[derive(Debug, Clone)]
pub struct ConsumeContentSourceTask {
    base: TaskBase,
}

impl ConsumeContentSourceTask {
    pub fn new(run_data: Arc<RunData>) -> Self {
        Self {
            base: TaskBase::new(run_data, "ConsumeContentSource"),
        }
    }
}

impl Task for ConsumeContentSourceTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.base.run_data().next_doc()?;
        Ok(1)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}
