//! Control tasks. None of them do measured work, so none of them record
//! statistics.

use std::sync::Arc;
use taskbench_core::{Result, RunData, Task, TaskBase};
use tracing::info;

macro_rules! control_task {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $ty {
            base: TaskBase,
        }

        impl $ty {
            pub fn new(run_data: Arc<RunData>) -> Self {
                Self {
                    base: TaskBase::new(run_data, $name),
                }
            }
        }
    };
}

control_task!(
    /// Advances the benchmark round; by-round properties move to their
    /// next value.
    NewRoundTask,
    "NewRound"
);

control_task!(
    /// Rewinds the content source. Sequences treat it as the end of an
    /// exhaustion cycle.
    ResetInputsTask,
    "ResetInputs"
);

control_task!(
    /// Drops every statistics record collected so far.
    ClearStatsTask,
    "ClearStats"
);

control_task!(
    /// Empties the document sink, rewinds inputs and restarts the clock.
    /// Counts as an input reset for exhaustion bookkeeping.
    ResetSystemTask,
    "ResetSystem"
);

impl Task for NewRoundTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        let round = self.base.run_data().config().new_round();
        info!(round, "new round");
        Ok(0)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn should_not_record_stats(&self) -> bool {
        true
    }
}

impl Task for ResetInputsTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.base.run_data().reset_inputs()?;
        Ok(0)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn should_not_record_stats(&self) -> bool {
        true
    }

    fn resets_inputs(&self) -> bool {
        true
    }
}

impl Task for ClearStatsTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.base.run_data().points().clear_data();
        Ok(0)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn should_not_record_stats(&self) -> bool {
        true
    }
}

impl Task for ResetSystemTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn do_logic(&mut self) -> Result<u64> {
        self.base.run_data().reinit()?;
        Ok(0)
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn should_not_record_stats(&self) -> bool {
        true
    }

    fn resets_inputs(&self) -> bool {
        true
    }
}
