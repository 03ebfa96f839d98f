//! A source that serves one fixed document.

use taskbench_core::{ContentSource, DocData, Result, TaskError};

const DOC_TITLE: &str = "taskbench single document";
const DOC_TEXT: &str = "A benchmark runs the same small piece of work many times, counts \
how often it completed, and divides by the time it took. This paragraph is the work: \
it is handed out as a document each time a task asks for one, so that adding it to \
the sink costs roughly the same on every call.";

/// Serves the same document over and over. When `forever` is false it
/// serves it once per reset.
#[derive(Debug)]
pub struct SingleDocSource {
    forever: bool,
    served_since_reset: bool,
    next_id: u64,
}

impl SingleDocSource {
    pub fn new(forever: bool) -> Self {
        Self {
            forever,
            served_since_reset: false,
            next_id: 0,
        }
    }
}

impl ContentSource for SingleDocSource {
    fn next_doc(&mut self) -> Result<DocData> {
        if self.served_since_reset && !self.forever {
            return Err(TaskError::NoMoreData);
        }
        self.served_since_reset = true;
        let id = self.next_id;
        self.next_id += 1;
        Ok(DocData::new(id, DOC_TITLE, DOC_TEXT))
    }

    fn reset_inputs(&mut self) -> Result<()> {
        self.served_since_reset = false;
        Ok(())
    }

    fn name(&self) -> &str {
        "single"
    }
}
