//! `FilterByField`: keeps or drops a record based on membership of one
//! field's value in a fixed set (spec.md §4.7).

use crate::params::parse;
use minidp_core::{DataEntry, MapProcessor, Record};
use minidp_registry::ProcessorConstructionError;
use serde::Deserialize;
use serde_json::Value;

fn default_exclude() -> bool {
    false
}

/// Keeps a record iff `(record[field] in values) XOR exclude`. A
/// missing `field` is treated as not matching any `values` entry.
#[derive(Clone, Debug, Deserialize)]
pub struct FilterByField {
    /// Field to test.
    pub field: String,
    /// Values to match against.
    pub values: Vec<Value>,
    /// Invert the match. Default `false`.
    #[serde(default = "default_exclude")]
    pub exclude: bool,
}

impl FilterByField {
    /// Construct from a step's `params`.
    pub fn from_params(params: Value) -> Result<Self, ProcessorConstructionError> {
        parse("FilterByField", params)
    }
}

impl MapProcessor for FilterByField {
    fn name(&self) -> &str {
        "FilterByField"
    }

    fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
        let matches = record
            .get(&self.field)
            .map_or(false, |value| self.values.contains(value));

        if matches ^ self.exclude {
            vec![DataEntry::record(record)]
        } else {
            vec![]
        }
    }
}
