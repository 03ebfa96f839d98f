//! Content sources: the document feeds leaf tasks consume.
//!
//! Concrete sources live in `taskbench-feeds`; the engine only needs the
//! trait so the run context can hold one behind a lock.

use crate::error::Result;

/// One document produced by a [`ContentSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocData {
    /// Position of the document in the feed, counted across rewinds.
    pub id: u64,
    pub title: String,
    pub date: Option<String>,
    pub body: String,
}

impl DocData {
    pub fn new(id: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            date: None,
            body: body.into(),
        }
    }

    /// Total payload size in bytes.
    pub fn len(&self) -> usize {
        self.title.len() + self.body.len() + self.date.as_ref().map_or(0, String::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncate the body to at most `size` bytes, respecting char
    /// boundaries. `0` leaves the body untouched.
    pub fn truncate_body(&mut self, size: usize) {
        if size == 0 || self.body.len() <= size {
            return;
        }
        let mut cut = size;
        while !self.body.is_char_boundary(cut) {
            cut -= 1;
        }
        self.body.truncate(cut);
    }
}

/// A document feed.
///
/// When a non-repeating source runs out, [`ContentSource::next_doc`] returns
/// [`TaskError::NoMoreData`](crate::TaskError::NoMoreData) until
/// [`ContentSource::reset_inputs`] is called.
pub trait ContentSource: Send {
    fn next_doc(&mut self) -> Result<DocData>;

    /// Rewind to the first document.
    fn reset_inputs(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Short name used in logs.
    fn name(&self) -> &str;
}
