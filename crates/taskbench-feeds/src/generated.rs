//! Synthetic documents, deterministic from their position in the feed.

use taskbench_core::{ContentSource, DocData, Result, TaskError};

const WORDS: &[&str] = &[
    "index", "segment", "term", "posting", "field", "query", "score", "merge",
    "buffer", "token", "analyzer", "document", "reader", "writer", "commit",
];

/// Produces `docs_per_pass` documents, then rewinds (`forever`) or reports
/// exhaustion until reset.
#[derive(Debug)]
pub struct GeneratedDocSource {
    docs_per_pass: usize,
    forever: bool,
    position: usize,
    next_id: u64,
}

impl GeneratedDocSource {
    pub fn new(docs_per_pass: usize, forever: bool) -> Self {
        Self {
            docs_per_pass,
            forever,
            position: 0,
            next_id: 0,
        }
    }

    fn body_for(position: usize) -> String {
        let len = 8 + position % 24;
        (0..len)
            .map(|i| WORDS[(position * 7 + i * 3) % WORDS.len()])
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ContentSource for GeneratedDocSource {
    fn next_doc(&mut self) -> Result<DocData> {
        if self.position >= self.docs_per_pass {
            if !self.forever || self.docs_per_pass == 0 {
                return Err(TaskError::NoMoreData);
            }
            self.position = 0;
        }
        let position = self.position;
        self.position += 1;
        let id = self.next_id;
        self.next_id += 1;
        Ok(DocData::new(
            id,
            format!("generated document {position}"),
            Self::body_for(position),
        ))
    }

    fn reset_inputs(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn name(&self) -> &str {
        "generated"
    }
}
