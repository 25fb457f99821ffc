//! `AddConstantFields`: shallow-merges a fixed set of fields into every
//! record (spec.md §4.7).

use crate::params::parse;
use minidp_core::{DataEntry, MapProcessor, Record};
use minidp_registry::ProcessorConstructionError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Merges `fields` into every record, overwriting existing keys of the
/// same name.
#[derive(Clone, Debug, Deserialize)]
pub struct AddConstantFields {
    /// Fields to merge into every record.
    pub fields: BTreeMap<String, Value>,
}

impl AddConstantFields {
    /// Construct from a step's `params`.
    pub fn from_params(params: Value) -> Result<Self, ProcessorConstructionError> {
        parse("AddConstantFields", params)
    }
}

impl MapProcessor for AddConstantFields {
    fn name(&self) -> &str {
        "AddConstantFields"
    }

    fn process_record(&mut self, mut record: Record) -> Vec<DataEntry> {
        for (key, value) in &self.fields {
            record.insert(key.clone(), value.clone());
        }
        vec![DataEntry::record(record)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_and_overwrites() {
        let mut processor = AddConstantFields::from_params(json!({
            "fields": {"src": "w", "a": 9}
        }))
        .unwrap();

        let mut record = Record::new();
        record.insert("a".to_owned(), json!(1));
        let entries = processor.process_record(record);

        assert_eq!(entries.len(), 1);
        let record = entries.into_iter().next().unwrap().data.into_record().unwrap();
        assert_eq!(record.get("src"), Some(&json!("w")));
        assert_eq!(record.get("a"), Some(&json!(9)));
    }

    #[test]
    fn rejects_missing_fields_param() {
        assert!(AddConstantFields::from_params(json!({})).is_err());
    }
}
