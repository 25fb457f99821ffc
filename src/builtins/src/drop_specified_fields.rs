//! `DropSpecifiedFields`: removes listed keys if present (spec.md §4.7).

use crate::params::parse;
use minidp_core::{DataEntry, MapProcessor, Record};
use minidp_registry::ProcessorConstructionError;
use serde::Deserialize;
use serde_json::Value;

/// Removes `fields_to_drop` from every record. Missing keys are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct DropSpecifiedFields {
    /// Keys to remove.
    pub fields_to_drop: Vec<String>,
}

impl DropSpecifiedFields {
    /// Construct from a step's `params`.
    pub fn from_params(params: Value) -> Result<Self, ProcessorConstructionError> {
        parse("DropSpecifiedFields", params)
    }
}

impl MapProcessor for DropSpecifiedFields {
    fn name(&self) -> &str {
        "DropSpecifiedFields"
    }

    fn process_record(&mut self, mut record: Record) -> Vec<DataEntry> {
        for key in &self.fields_to_drop {
            record.remove(key);
        }
        vec![DataEntry::record(record)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_present_ignores_missing() {
        let mut processor =
            DropSpecifiedFields::from_params(json!({"fields_to_drop": ["a", "nope"]})).unwrap();

        let mut record = Record::new();
        record.insert("a".to_owned(), json!(1));
        record.insert("b".to_owned(), json!(2));

        let entries = processor.process_record(record);
        let record = entries.into_iter().next().unwrap().data.into_record().unwrap();
        assert_eq!(record.get("a"), None);
        assert_eq!(record.get("b"), Some(&json!(2)));
    }
}
