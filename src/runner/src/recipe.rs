//! The parsed recipe document and per-step descriptor (spec.md §3, §4.5).

use crate::error::RecipeValidationError;
use serde::Deserialize;
use serde_json::Value;

fn default_true() -> bool {
    true
}

fn default_params() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_version() -> String {
    "0.1".to_owned()
}

fn default_workspace_dir() -> String {
    "./runs".to_owned()
}

fn default_steps_to_run() -> String {
    "all".to_owned()
}

/// One entry in a [`Recipe`] (spec.md §3).
///
/// Unknown fields are rejected: "unknown step-level fields are rejected
/// with a validation error; only the documented set is accepted"
/// (spec.md §6). Unknown fields inside `params` are processor-defined.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeStep {
    /// Defaults to `step_{index}` if unset; see [`RecipeStep::id_or_default`].
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_params")]
    pub params: Value,
    pub input_manifest: Option<String>,
    pub output_manifest: Option<String>,
}

impl RecipeStep {
    /// This step's id, or `step_{index}` if it has none.
    pub fn id_or_default(&self, index: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("step_{}", index))
    }
}

/// A parsed MiniDP recipe document (spec.md §3).
///
/// Unknown top-level fields are ignored (spec.md §6 "ignored with a
/// warning"); that warning is emitted by the caller parsing the raw JSON,
/// since `serde`'s default behavior already silently ignores them.
#[derive(Clone, Debug, Deserialize)]
pub struct Recipe {
    #[serde(default = "default_version")]
    pub version: String,
    pub name: Option<String>,
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,
    pub input_manifest: Option<String>,
    pub output_manifest: Option<String>,
    #[serde(default = "default_steps_to_run")]
    pub steps_to_run: String,
    pub steps: Vec<RecipeStep>,
}

impl Recipe {
    /// Validate the recipe per spec.md §4.5, short-circuiting on the first
    /// violation.
    ///
    /// A non-`"0.1"` `version` is logged as a warning, not a validation
    /// failure (spec.md §4.5 rule 4).
    pub fn validate(&self) -> Result<(), RecipeValidationError> {
        if self.version != "0.1" {
            tracing::warn!(version = %self.version, "recipe declares an unrecognized version");
        }

        if self.steps.is_empty() {
            return Err(RecipeValidationError::new(
                "steps",
                "recipe must declare at least one step",
            ));
        }

        for (index, step) in self.steps.iter().enumerate() {
            if step.r#type.trim().is_empty() {
                return Err(RecipeValidationError::new(
                    format!("steps[{}].type", index),
                    "step type must not be empty",
                ));
            }
        }

        parse_steps_to_run(&self.steps_to_run, self.steps.len())?;
        Ok(())
    }

    /// The `(start, end)` window `steps_to_run` selects, per spec.md §4.5
    /// rule 3. Call after [`Recipe::validate`] has already succeeded.
    pub fn selected_range(&self) -> Result<(usize, usize), RecipeValidationError> {
        parse_steps_to_run(&self.steps_to_run, self.steps.len())
    }
}

/// Parse a `steps_to_run` expression against a recipe with `len` steps,
/// per spec.md §4.5 rule 3: `"all"`, a bare integer `n` (as `n:n+1`), or a
/// `"a:b"`/`"a:"`/`":b"` slice, with `0 <= a <= b <= len`.
fn parse_steps_to_run(expr: &str, len: usize) -> Result<(usize, usize), RecipeValidationError> {
    let invalid = |message: &str| {
        RecipeValidationError::new(
            "steps_to_run",
            format!("invalid slice expression {:?}: {}", expr, message),
        )
    };

    let (start, end): (i64, i64) = if expr == "all" {
        (0, len as i64)
    } else if let Some(colon) = expr.find(':') {
        let (before, after) = expr.split_at(colon);
        let after = &after[1..];

        let start = if before.is_empty() {
            0
        } else {
            before.parse::<i64>().map_err(|_| invalid("bound is not an integer"))?
        };
        let end = if after.is_empty() {
            len as i64
        } else {
            after.parse::<i64>().map_err(|_| invalid("bound is not an integer"))?
        };
        (start, end)
    } else {
        let n = expr.parse::<i64>().map_err(|_| invalid("not \"all\", an integer, or a slice"))?;
        (n, n + 1)
    };

    if start < 0 || end < start || end > len as i64 {
        return Err(invalid("bounds must satisfy 0 <= a <= b <= len(steps)"));
    }

    Ok((start as usize, end as usize))
}
