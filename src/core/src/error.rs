//! Error kinds owned by `minidp-core`: failures that occur while actually
//! running a processor, as opposed to constructing or looking one up
//! (those live in `minidp-registry`) or validating a recipe (those live in
//! `minidp-runner`).

use std::{error, fmt};

/// A processor failed while processing a specific record.
///
/// Carries the processor name and the 0-based index of the offending
/// record within the step's input manifest, per spec.md §7.
#[derive(Debug)]
pub struct ProcessorExecutionError {
    /// The processor's `NAME`.
    pub processor: String,
    /// 0-based index of the record being processed when the failure
    /// occurred.
    pub record_index: usize,
    source: Box<dyn error::Error + Send + Sync>,
}

impl ProcessorExecutionError {
    /// Construct a new execution error.
    pub fn new(
        processor: impl Into<String>,
        record_index: usize,
        source: impl Into<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            processor: processor.into(),
            record_index,
            source: source.into(),
        }
    }
}

impl fmt::Display for ProcessorExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processor {:?} failed on record {}: {}",
            self.processor, self.record_index, self.source
        )
    }
}

impl error::Error for ProcessorExecutionError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// A run (or a single step within it) was cancelled by an external signal
/// before it completed (spec.md §5 "Cancellation").
#[derive(Debug)]
pub struct CancelledError {
    /// Human-readable reason for the cancellation.
    pub reason: String,
}

impl CancelledError {
    /// Construct a new cancellation error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CancelledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled: {}", self.reason)
    }
}

impl error::Error for CancelledError {}
