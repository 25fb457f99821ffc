//! `RenameFields`: moves values from `old` keys to `new` keys (spec.md
//! §4.7).
//!
//! spec.md §9 leaves open whether a chain like `a->b, b->c` should let
//! `a`'s value flow through to `c`. DESIGN.md resolves this as "each
//! rename observes the pre-rename record": every `old` value is read
//! from the original record before any renames are applied, so renames
//! never chain. Renames are applied in `rename_fields`' key order
//! (`old`, ascending); if two renames share a `new` key, the
//! lexicographically later `old` wins.

use crate::params::parse;
use minidp_core::{DataEntry, MapProcessor, Record};
use minidp_registry::ProcessorConstructionError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// For each `old -> new` mapping, if `old` exists in the record, moves
/// its value to `new` (overwriting `new` if already present).
#[derive(Clone, Debug, Deserialize)]
pub struct RenameFields {
    /// `old -> new` key mapping.
    pub rename_fields: BTreeMap<String, String>,
}

impl RenameFields {
    /// Construct from a step's `params`.
    pub fn from_params(params: Value) -> Result<Self, ProcessorConstructionError> {
        parse("RenameFields", params)
    }
}

impl MapProcessor for RenameFields {
    fn name(&self) -> &str {
        "RenameFields"
    }

    fn process_record(&mut self, mut record: Record) -> Vec<DataEntry> {
        let moves: Vec<(String, Option<Value>)> = self
            .rename_fields
            .keys()
            .map(|old| (old.clone(), record.get(old).cloned()))
            .collect();

        for (old, _) in &moves {
            record.remove(old);
        }

        for (old, value) in moves {
            if let Some(value) = value {
                let new = self.rename_fields[&old].clone();
                record.insert(new, value);
            }
        }

        vec![DataEntry::record(record)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_present_key() {
        let mut processor =
            RenameFields::from_params(json!({"rename_fields": {"text": "content"}})).unwrap();

        let mut record = Record::new();
        record.insert("text".to_owned(), json!("x"));
        let entries = processor.process_record(record);
        let record = entries.into_iter().next().unwrap().data.into_record().unwrap();

        assert_eq!(record.get("text"), None);
        assert_eq!(record.get("content"), Some(&json!("x")));
    }

    #[test]
    fn double_rename_does_not_chain() {
        // a -> b, b -> c, with both a and b present in the input.
        // Expected (per the pre-rename-observation resolution): original
        // b's value ends up at c, original a's value ends up at b -- a's
        // value never reaches c.
        let mut processor = RenameFields::from_params(json!({
            "rename_fields": {"a": "b", "b": "c"}
        }))
        .unwrap();

        let mut record = Record::new();
        record.insert("a".to_owned(), json!("from-a"));
        record.insert("b".to_owned(), json!("from-b"));

        let entries = processor.process_record(record);
        let record = entries.into_iter().next().unwrap().data.into_record().unwrap();

        assert_eq!(record.get("b"), Some(&json!("from-a")));
        assert_eq!(record.get("c"), Some(&json!("from-b")));
        assert_eq!(record.get("a"), None);
    }

    #[test]
    fn missing_old_key_is_a_no_op() {
        let mut processor =
            RenameFields::from_params(json!({"rename_fields": {"absent": "new"}})).unwrap();

        let mut record = Record::new();
        record.insert("other".to_owned(), json!(1));
        let entries = processor.process_record(record.clone());
        let out = entries.into_iter().next().unwrap().data.into_record().unwrap();

        assert_eq!(out, record);
    }
}
