//! `DuplicateFields`: copies a value to a new key without removing the
//! source (spec.md §4.7).

use crate::params::parse;
use minidp_core::{DataEntry, MapProcessor, Record};
use minidp_registry::ProcessorConstructionError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// For each `src -> dst` mapping, if `src` exists, sets `dst` to a deep
/// copy of its value.
#[derive(Clone, Debug, Deserialize)]
pub struct DuplicateFields {
    /// `src -> dst` key mapping.
    pub duplicate_fields: BTreeMap<String, String>,
}

impl DuplicateFields {
    /// Construct from a step's `params`.
    pub fn from_params(params: Value) -> Result<Self, ProcessorConstructionError> {
        parse("DuplicateFields", params)
    }
}

impl MapProcessor for DuplicateFields {
    fn name(&self) -> &str {
        "DuplicateFields"
    }

    fn process_record(&mut self, mut record: Record) -> Vec<DataEntry> {
        for (src, dst) in &self.duplicate_fields {
            if let Some(value) = record.get(src).cloned() {
                record.insert(dst.clone(), value);
            }
        }
        vec![DataEntry::record(record)]
    }
}
