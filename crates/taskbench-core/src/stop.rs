//! Cooperative cancellation.
//!
//! Every task owns a [`StopSignal`]. A signal has one flag of its own plus
//! handles to the flags of every enclosing sequence, so raising a sequence's
//! flag is observed by all of its descendants, including parallel replicas
//! and background tasks running on other threads.
//!
//! Cloning a signal shares the flag (that is how a driver or a background
//! runner keeps a handle it can raise later). [`StopSignal::fork`] creates an
//! independent flag with the same ancestry; task clones use it.
//!
//! Nothing here preempts work: a task that never polls
//! [`StopSignal::is_raised`] runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    own: Arc<AtomicBool>,
    ancestors: Arc<[Arc<AtomicBool>]>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Observed by this task and everything below it.
    pub fn raise(&self) {
        self.own.store(true, Ordering::Release);
    }

    /// Clear this signal's own flag. Ancestor flags are left alone.
    pub fn clear(&self) {
        self.own.store(false, Ordering::Release);
    }

    /// `true` when this flag or any enclosing sequence's flag is raised.
    pub fn is_raised(&self) -> bool {
        self.is_raised_locally() || self.ancestors.iter().any(|f| f.load(Ordering::Acquire))
    }

    /// `true` only when this signal's own flag is raised.
    pub fn is_raised_locally(&self) -> bool {
        self.own.load(Ordering::Acquire)
    }

    /// An independent flag (starting in the current state) with the same
    /// ancestry.
    pub fn fork(&self) -> Self {
        Self {
            own: Arc::new(AtomicBool::new(self.is_raised_locally())),
            ancestors: Arc::clone(&self.ancestors),
        }
    }

    /// Re-parent this signal under `parent`.
    pub fn link_to(&mut self, parent: &StopSignal) {
        let mut ancestors = Vec::with_capacity(parent.ancestors.len() + 1);
        ancestors.extend(parent.ancestors.iter().cloned());
        ancestors.push(Arc::clone(&parent.own));
        self.ancestors = ancestors.into();
    }

    /// `true` if both handles point at the same flag.
    pub fn same_flag(&self, other: &StopSignal) -> bool {
        Arc::ptr_eq(&self.own, &other.own)
    }
}
