//! Leaf benchmark tasks.
//!
//! Each task is a thin wrapper: it parses an optional parameter, calls one
//! or two operations on the shared [`RunData`](taskbench_core::RunData), and
//! reports how many work items it completed.

mod add_doc;
mod consume;
mod control;
mod wait;

pub use add_doc::AddDocTask;
pub use consume::ConsumeContentSourceTask;
pub use control::{ClearStatsTask, NewRoundTask, ResetInputsTask, ResetSystemTask};
pub use wait::WaitTask;
