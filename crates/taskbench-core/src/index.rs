//! In-memory document sink standing in for an index writer.

use crate::content::DocData;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct SinkState {
    docs: Vec<DocData>,
    bytes: u64,
}

/// Thread-safe append-only store of added documents.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: Mutex<SinkState>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document; returns the number of documents now held.
    pub fn add_document(&self, doc: DocData) -> usize {
        let mut state = self.state.lock();
        state.bytes += doc.len() as u64;
        state.docs.push(doc);
        state.docs.len()
    }

    pub fn num_docs(&self) -> usize {
        self.state.lock().docs.len()
    }

    /// Total payload bytes added since the last clear.
    pub fn bytes(&self) -> u64 {
        self.state.lock().bytes
    }

    /// Ids of the held documents, in insertion order.
    pub fn doc_ids(&self) -> Vec<u64> {
        self.state.lock().docs.iter().map(|d| d.id).collect()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.docs.clear();
        state.bytes = 0;
    }
}
