//! A cooperative stop flag shared between the runner, the parallel map
//! engine, and whatever external signal (e.g. Ctrl-C) a host wires up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable flag that can be flipped from outside a running
/// step to request cancellation (spec.md §5 "Cancellation").
///
/// The engine checks this flag between records (serial mode) or between
/// records within a chunk (parallel mode); there is no preemption.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` has been called on this token or any of its
    /// clones.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
