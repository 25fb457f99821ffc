//! The eight built-in MiniDP processors (spec.md §4.7), plus
//! [`register_builtins`], which registers all of them into a
//! [`minidp_registry::Registry`] under their documented short names
//! (spec.md §9 "by the time `run` executes, all built-ins are
//! present").

#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod add_constant_fields;
mod drop_specified_fields;
mod duplicate_fields;
mod filter_by_field;
mod keep_only_specified_fields;
mod params;
mod pass_through;
mod rename_fields;
mod sort_manifest;

pub use add_constant_fields::AddConstantFields;
pub use drop_specified_fields::DropSpecifiedFields;
pub use duplicate_fields::DuplicateFields;
pub use filter_by_field::FilterByField;
pub use keep_only_specified_fields::KeepOnlySpecifiedFields;
pub use pass_through::PassThrough;
pub use rename_fields::RenameFields;
pub use sort_manifest::SortManifest;

use minidp_core::MapProcessor;
use minidp_registry::Registry;

/// Register all eight built-ins under their spec.md §4.7 names.
pub fn register_builtins(registry: &Registry) {
    registry.register_map_processor(
        "AddConstantFields",
        "fields: {string: any} -- shallow-merges fields into every record",
        |params| {
            AddConstantFields::from_params(params)
                .map(|p| Box::new(p) as Box<dyn MapProcessor>)
        },
    );
    registry.register_map_processor(
        "DropSpecifiedFields",
        "fields_to_drop: [string] -- removes listed keys if present",
        |params| {
            DropSpecifiedFields::from_params(params)
                .map(|p| Box::new(p) as Box<dyn MapProcessor>)
        },
    );
    registry.register_map_processor(
        "KeepOnlySpecifiedFields",
        "fields_to_keep: [string] -- emits only the listed keys that exist",
        |params| {
            KeepOnlySpecifiedFields::from_params(params)
                .map(|p| Box::new(p) as Box<dyn MapProcessor>)
        },
    );
    registry.register_map_processor(
        "RenameFields",
        "rename_fields: {old: new} -- moves values from old keys to new keys",
        |params| {
            RenameFields::from_params(params).map(|p| Box::new(p) as Box<dyn MapProcessor>)
        },
    );
    registry.register_map_processor(
        "DuplicateFields",
        "duplicate_fields: {src: dst} -- copies values without removing the source",
        |params| {
            DuplicateFields::from_params(params)
                .map(|p| Box::new(p) as Box<dyn MapProcessor>)
        },
    );
    registry.register_map_processor(
        "FilterByField",
        "field, values, exclude=false -- keeps iff (record[field] in values) xor exclude",
        |params| {
            FilterByField::from_params(params).map(|p| Box::new(p) as Box<dyn MapProcessor>)
        },
    );
    registry.register(
        "SortManifest",
        "attribute_sort_by, descending=false -- loads, sorts, and rewrites the whole manifest",
        |params| {
            SortManifest::from_params(params)
                .map(|p| Box::new(p) as Box<dyn minidp_core::Processor>)
        },
    );
    registry.register_map_processor("PassThrough", "emits input unchanged", |params| {
        PassThrough::from_params(params).map(|p| Box::new(p) as Box<dyn MapProcessor>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registers_all_eight_built_ins() {
        let registry = Registry::new();
        register_builtins(&registry);

        let names: Vec<String> = registry.list().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                "AddConstantFields",
                "DropSpecifiedFields",
                "DuplicateFields",
                "FilterByField",
                "KeepOnlySpecifiedFields",
                "PassThrough",
                "RenameFields",
                "SortManifest",
            ]
        );
    }

    #[test]
    fn resolved_pass_through_is_usable() {
        let registry = Registry::new();
        register_builtins(&registry);

        let mut processor = registry.resolve("PassThrough", json!({})).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        std::fs::write(&input, "{\"a\":1}\n").unwrap();
        let output = dir.path().join("out.jsonl");

        let ctx = minidp_core::RunContext::new(dir.path());
        let cancel = minidp_core::CancellationToken::new();
        let stats = processor.process(&ctx, &cancel, &input, &output).unwrap();
        assert_eq!(stats.r#in, 1);
        assert_eq!(stats.out, 1);
    }
}
