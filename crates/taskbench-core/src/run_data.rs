//! The run context shared by every task of a benchmark run.

use crate::config::Config;
use crate::content::{ContentSource, DocData};
use crate::error::Result;
use crate::index::MemoryIndex;
use crate::stats::Points;
use parking_lot::Mutex;
use std::fmt;
use std::time::Instant;
use tracing::debug;

/// Shared benchmark state. Tasks hold it as `Arc<RunData>`; every mutable
/// part is internally synchronised.
pub struct RunData {
    config: Config,
    points: Points,
    start: Mutex<Instant>,
    content: Mutex<Box<dyn ContentSource>>,
    index: MemoryIndex,
}

impl RunData {
    pub fn new(config: Config, content: Box<dyn ContentSource>) -> Self {
        Self {
            config,
            points: Points::new(),
            start: Mutex::new(Instant::now()),
            content: Mutex::new(content),
            index: MemoryIndex::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn points(&self) -> &Points {
        &self.points
    }

    pub fn index(&self) -> &MemoryIndex {
        &self.index
    }

    /// Instant the run (or the last [`RunData::reinit`]) started.
    pub fn start_time(&self) -> Instant {
        *self.start.lock()
    }

    pub fn reset_start_time(&self) {
        *self.start.lock() = Instant::now();
    }

    /// Next document from the content source, body truncated to
    /// `content.doc_size`.
    pub fn next_doc(&self) -> Result<DocData> {
        let mut doc = self.content.lock().next_doc()?;
        doc.truncate_body(self.config.content.doc_size);
        Ok(doc)
    }

    pub fn reset_inputs(&self) -> Result<()> {
        let mut content = self.content.lock();
        debug!(source = content.name(), "resetting inputs");
        content.reset_inputs()
    }

    /// Empty the document sink, rewind the content source and restart the
    /// clock. Statistics are kept.
    pub fn reinit(&self) -> Result<()> {
        self.index.clear();
        self.reset_inputs()?;
        self.reset_start_time();
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.content.lock().close()
    }
}

impl fmt::Debug for RunData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunData")
            .field("round", &self.config.round())
            .field("content", &self.content.lock().name())
            .field("docs", &self.index.num_docs())
            .finish_non_exhaustive()
    }
}
