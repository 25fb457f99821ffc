//! Recipe loading from disk: out of scope for `minidp-runner` (spec.md §1
//! "recipe file loading from disk (treated as hand the runner a parsed
//! recipe value)"), so it lives here in the CLI front end.

use anyhow::{Context, Result};
use minidp_runner::Recipe;
use std::path::Path;

const KNOWN_TOP_LEVEL_FIELDS: &[&str] = &[
    "version",
    "name",
    "workspace_dir",
    "input_manifest",
    "output_manifest",
    "steps_to_run",
    "steps",
];

/// Read and parse a recipe file, warning (not failing) on unrecognized
/// top-level fields (spec.md §6).
pub fn load_recipe(path: &Path) -> Result<Recipe> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading recipe file {}", path.display()))?;

    let raw: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("parsing recipe file {} as JSON", path.display()))?;

    if let Some(object) = raw.as_object() {
        for key in object.keys() {
            if !KNOWN_TOP_LEVEL_FIELDS.contains(&key.as_str()) {
                tracing::warn!(field = %key, "recipe declares an unrecognized top-level field");
            }
        }
    }

    serde_json::from_value(raw)
        .with_context(|| format!("recipe file {} does not match the recipe schema", path.display()))
}
