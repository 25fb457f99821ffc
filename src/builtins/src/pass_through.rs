//! `PassThrough`: emits input unchanged (spec.md §4.7). Useful as a
//! no-op step, and as a reference processor for exercising the engine
//! independent of any transform.

use minidp_core::{DataEntry, MapProcessor, Record};
use minidp_registry::ProcessorConstructionError;
use serde_json::Value;

/// Emits every input record unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl PassThrough {
    /// Construct from a step's `params`. Takes no params; any value
    /// (including `{}`) is accepted.
    pub fn from_params(_params: Value) -> Result<Self, ProcessorConstructionError> {
        Ok(Self)
    }
}

impl MapProcessor for PassThrough {
    fn name(&self) -> &str {
        "PassThrough"
    }

    fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
        vec![DataEntry::record(record)]
    }
}
