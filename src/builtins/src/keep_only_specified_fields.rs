//! `KeepOnlySpecifiedFields`: emits a new record with only the listed
//! keys that exist (spec.md §4.7).

use crate::params::parse;
use minidp_core::{DataEntry, MapProcessor, Record};
use minidp_registry::ProcessorConstructionError;
use serde::Deserialize;
use serde_json::Value;

/// Emits a record containing only `fields_to_keep` (those that exist).
#[derive(Clone, Debug, Deserialize)]
pub struct KeepOnlySpecifiedFields {
    /// Keys to keep.
    pub fields_to_keep: Vec<String>,
}

impl KeepOnlySpecifiedFields {
    /// Construct from a step's `params`.
    pub fn from_params(params: Value) -> Result<Self, ProcessorConstructionError> {
        parse("KeepOnlySpecifiedFields", params)
    }
}

impl MapProcessor for KeepOnlySpecifiedFields {
    fn name(&self) -> &str {
        "KeepOnlySpecifiedFields"
    }

    fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
        let mut kept = Record::new();
        for key in &self.fields_to_keep {
            if let Some(value) = record.get(key) {
                kept.insert(key.clone(), value.clone());
            }
        }
        vec![DataEntry::record(kept)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_only_listed_existing_fields() {
        let mut processor =
            KeepOnlySpecifiedFields::from_params(json!({"fields_to_keep": ["a", "nope"]}))
                .unwrap();

        let mut record = Record::new();
        record.insert("a".to_owned(), json!(1));
        record.insert("b".to_owned(), json!(2));

        let entries = processor.process_record(record);
        let record = entries.into_iter().next().unwrap().data.into_record().unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a"), Some(&json!(1)));
    }
}
