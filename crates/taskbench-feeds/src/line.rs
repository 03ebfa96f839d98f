//! A source reading one document per line from a text file.
//!
//! Each non-blank line holds `title<TAB>date<TAB>body`. A first line
//! starting with [`HEADER_MARKER`] describes the fields and is skipped.

use std::path::Path;
use taskbench_core::{ContentSource, DocData, Result, TaskError};
use tracing::debug;

/// Prefix of an optional header line.
pub const HEADER_MARKER: &str = "FIELDS_HEADER_INDICATOR###";

const SEP: char = '\t';

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    title: String,
    date: String,
    body: String,
}

/// Documents read from a line file. The file is loaded once; rewinding is
/// free.
#[derive(Debug)]
pub struct LineDocSource {
    lines: Vec<Line>,
    next: usize,
    next_id: u64,
    forever: bool,
}

impl LineDocSource {
    pub fn open(path: impl AsRef<Path>, forever: bool) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let source = Self::from_text(&text, forever)?;
        debug!(path = %path.display(), docs = source.lines.len(), "loaded line file");
        Ok(source)
    }

    /// Parse documents from already loaded text.
    pub fn from_text(text: &str, forever: bool) -> Result<Self> {
        let mut lines = Vec::new();
        for (n, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() || (n == 0 && raw.starts_with(HEADER_MARKER)) {
                continue;
            }
            let mut fields = raw.splitn(3, SEP);
            match (fields.next(), fields.next(), fields.next()) {
                (Some(title), Some(date), Some(body)) => lines.push(Line {
                    title: title.to_string(),
                    date: date.to_string(),
                    body: body.to_string(),
                }),
                _ => {
                    return Err(TaskError::failed(
                        "LineDocSource",
                        format!("line {} is not title<TAB>date<TAB>body", n + 1),
                    ))
                }
            }
        }
        Ok(Self {
            lines,
            next: 0,
            next_id: 0,
            forever,
        })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl ContentSource for LineDocSource {
    fn next_doc(&mut self) -> Result<DocData> {
        if self.next >= self.lines.len() {
            if !self.forever || self.lines.is_empty() {
                return Err(TaskError::NoMoreData);
            }
            debug!(docs = self.lines.len(), "line file exhausted, rewinding");
            self.next = 0;
        }
        let line = &self.lines[self.next];
        self.next += 1;
        let id = self.next_id;
        self.next_id += 1;
        Ok(DocData {
            id,
            title: line.title.clone(),
            date: Some(line.date.clone()),
            body: line.body.clone(),
        })
    }

    fn reset_inputs(&mut self) -> Result<()> {
        self.next = 0;
        Ok(())
    }

    fn name(&self) -> &str {
        "line"
    }
}
