//! The pipeline orchestrator (spec.md §4.6): step selection, I/O
//! stitching, the execution loop, temp-file lifecycle, and preview mode.

use crate::error::{RecipeValidationError, RunError};
use crate::recipe::{Recipe, RecipeStep};
use minidp_core::{CancellationToken, ManifestReader, Record, RunContext, RunStats};
use minidp_registry::Registry;
use std::path::{Path, PathBuf};

/// Per-invocation overrides for [`PipelineRunner::run`] (spec.md §6,
/// SPEC_FULL.md supplemental feature 3: surfaced on both `run` and
/// `preview`).
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Overrides the recipe's `workspace_dir` for this invocation.
    pub workspace_override: Option<PathBuf>,
    /// Keep `{workspace}/.tmp/{run_id}/` after a successful run.
    pub keep_temps: bool,
    /// Shared cancellation flag. Clone it to an external signal handler
    /// (e.g. SIGINT) before calling `run`/`preview` to make the run
    /// cooperatively cancellable (spec.md §5).
    pub cancel: CancellationToken,
}

/// The result of a completed run (spec.md §4.6 "Return value", plus
/// SPEC_FULL.md's supplemental `RunSummary` detail).
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Absolute path of the final output manifest.
    pub output: PathBuf,
    /// Per-step stats, in execution order, for every step that ran.
    pub stats: Vec<StepSummary>,
}

/// Stats for one executed step, tagged with its id for reporting.
#[derive(Clone, Debug)]
pub struct StepSummary {
    /// The step's id (or `step_{index}` default).
    pub step_id: String,
    /// The step's `type`.
    pub step_type: String,
    /// The counters `process` produced.
    pub stats: RunStats,
}

struct ResolvedStep<'r> {
    absolute_index: usize,
    step: &'r RecipeStep,
    input: PathBuf,
    output: PathBuf,
}

/// Orchestrates recipe execution against a [`Registry`] of processors.
pub struct PipelineRunner<'a> {
    registry: &'a Registry,
}

impl<'a> PipelineRunner<'a> {
    /// Build a runner resolving processor types against `registry`.
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Validate, stitch, and execute `recipe`'s selected steps in order.
    pub fn run(&self, recipe: &Recipe, options: &RunOptions) -> Result<RunSummary, RunError> {
        recipe.validate()?;
        let (start, end) = recipe.selected_range()?;

        let workspace_dir = options
            .workspace_override
            .clone()
            .unwrap_or_else(|| PathBuf::from(&recipe.workspace_dir));
        let ctx = RunContext::new(workspace_dir);
        let run_id = ctx.run_id().to_owned();

        let resolved = Self::stitch(recipe, &ctx, start, end)?;
        let mut stats = Vec::new();
        let result = self.execute(&resolved, &ctx, &options.cancel, &run_id, &mut stats);

        if result.is_ok() && !options.keep_temps {
            if let Err(err) = ctx.remove_temp_dir() {
                tracing::warn!(%run_id, error = %err, "failed to remove temp directory after a successful run");
            }
        }
        // On failure the temp directory is retained for diagnosis (spec.md §4.6).
        result?;

        let output = resolved
            .iter()
            .filter(|r| r.step.enabled)
            .last()
            .map(|r| r.output.clone())
            .or_else(|| resolved.last().map(|r| r.input.clone()))
            .ok_or_else(|| {
                RecipeValidationError::new("steps_to_run", "no steps were selected to run")
            })?;

        Ok(RunSummary {
            output: to_absolute(&output),
            stats,
        })
    }

    /// Run `recipe` to completion, then stream the first `n` records of
    /// the final output manifest (spec.md §4.6 "Preview mode").
    pub fn preview_recipe(
        &self,
        recipe: &Recipe,
        n: usize,
        options: &RunOptions,
    ) -> Result<(RunSummary, Vec<Record>), RunError> {
        let summary = self.run(recipe, options)?;
        let preview = ManifestReader::open(&summary.output)
            .map_err(RunError::from)?
            .take(n)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RunError::from)?;
        Ok((summary, preview))
    }

    /// Compute resolved input/output paths for every step in the selected
    /// window (spec.md §4.6 "I/O stitching algorithm"), including disabled
    /// ones, whose slot is transparent: their virtual output (used to feed
    /// the next step) is their own resolved input unless they carry an
    /// explicit `output_manifest` override.
    fn stitch<'r>(
        recipe: &'r Recipe,
        ctx: &RunContext,
        start: usize,
        end: usize,
    ) -> Result<Vec<ResolvedStep<'r>>, RunError> {
        let window = &recipe.steps[start..end];
        let k = window.len();
        let mut resolved = Vec::with_capacity(k);
        let mut prev_output: Option<PathBuf> = None;

        for (i, step) in window.iter().enumerate() {
            let absolute_index = start + i;

            let input = match &step.input_manifest {
                Some(path) => PathBuf::from(path),
                None if i == 0 => recipe
                    .input_manifest
                    .as_ref()
                    .map(PathBuf::from)
                    .ok_or_else(|| {
                        RecipeValidationError::new(
                            "input_manifest",
                            "recipe input_manifest is required when the first selected step sets none",
                        )
                    })?,
                None => prev_output
                    .clone()
                    .expect("prev_output is set for every step after the first"),
            };

            let is_last = i == k - 1;
            let output = match &step.output_manifest {
                Some(path) => PathBuf::from(path),
                None if is_last && recipe.output_manifest.is_some() => {
                    PathBuf::from(recipe.output_manifest.as_ref().unwrap())
                }
                None => minidp_core::temp_step_path(ctx.temp_dir()?, absolute_index),
            };

            let virtual_output = if step.enabled {
                output.clone()
            } else {
                match &step.output_manifest {
                    Some(path) => PathBuf::from(path),
                    None => input.clone(),
                }
            };

            resolved.push(ResolvedStep {
                absolute_index,
                step,
                input,
                output,
            });
            prev_output = Some(virtual_output);
        }

        Ok(resolved)
    }

    fn execute(
        &self,
        resolved: &[ResolvedStep<'_>],
        ctx: &RunContext,
        cancel: &CancellationToken,
        run_id: &str,
        stats_out: &mut Vec<StepSummary>,
    ) -> Result<(), RunError> {
        for r in resolved.iter().filter(|r| r.step.enabled) {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled(minidp_core::CancelledError::new(
                    "cancelled before step started",
                )));
            }

            let step_id = r.step.id_or_default(r.absolute_index);
            let start_line = format!("[{}] starting step {} ({})", run_id, step_id, r.step.r#type);
            tracing::info!(%run_id, step = %step_id, r#type = %r.step.r#type, stdout = %start_line, "starting step");

            let mut processor = self
                .registry
                .resolve(&r.step.r#type, r.step.params.clone())
                .map_err(RunError::from)?;

            let outcome = processor
                .prepare(ctx)
                .map_err(|err| RunError::from_step_error(step_id.clone(), err))
                .and_then(|()| {
                    processor
                        .process(ctx, cancel, &r.input, &r.output)
                        .map_err(|err| RunError::from_step_error(step_id.clone(), err))
                });

            let stats = match outcome {
                Ok(stats) => stats,
                Err(err) => {
                    if let Err(finalize_err) = processor.finalize(ctx, &RunStats::default()) {
                        tracing::warn!(%run_id, step = %step_id, error = %finalize_err, "finalize failed after step error");
                    }
                    return Err(err);
                }
            };

            let stats_line = format!(
                "[{}] step {} stats: in={} out={} dropped={} expanded={} time={:.3}s",
                run_id,
                step_id,
                stats.r#in,
                stats.out,
                stats.dropped,
                stats.expanded,
                stats.time.as_secs_f64()
            );
            tracing::info!(
                %run_id,
                step = %step_id,
                r#in = stats.r#in,
                out = stats.out,
                dropped = stats.dropped,
                expanded = stats.expanded,
                time_ms = stats.time.as_millis() as u64,
                stdout = %stats_line,
                "step finished"
            );

            if let Err(err) = processor.finalize(ctx, &stats) {
                tracing::warn!(%run_id, step = %step_id, error = %err, "finalize failed after a successful step");
            }

            stats_out.push(StepSummary {
                step_id,
                step_type: r.step.r#type.clone(),
                stats,
            });
        }

        Ok(())
    }
}

fn to_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RecipeStep;
    use minidp_processors::register_builtins;
    use serde_json::json;
    use std::fs;

    fn step(id: &str, r#type: &str, params: serde_json::Value) -> RecipeStep {
        serde_json::from_value(json!({
            "id": id,
            "type": r#type,
            "params": params,
        }))
        .unwrap()
    }

    fn disabled(mut s: RecipeStep) -> RecipeStep {
        s.enabled = false;
        s
    }

    #[test]
    fn single_step_pass_through() {
        let registry = Registry::new();
        register_builtins(&registry);

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        fs::write(&input, "{\"a\":1}\n{\"a\":2}\n").unwrap();

        let recipe = Recipe {
            version: "0.1".to_owned(),
            name: None,
            workspace_dir: dir.path().join("runs").to_string_lossy().into_owned(),
            input_manifest: Some(input.to_string_lossy().into_owned()),
            output_manifest: Some(dir.path().join("out.jsonl").to_string_lossy().into_owned()),
            steps_to_run: "all".to_owned(),
            steps: vec![step("s0", "PassThrough", json!({}))],
        };

        let runner = PipelineRunner::new(&registry);
        let summary = runner.run(&recipe, &RunOptions::default()).unwrap();

        assert_eq!(summary.stats.len(), 1);
        assert_eq!(summary.stats[0].stats.r#in, 2);
        assert_eq!(summary.stats[0].stats.out, 2);
        assert_eq!(fs::read_to_string(&summary.output).unwrap(), "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn add_drop_rename_chain() {
        let registry = Registry::new();
        register_builtins(&registry);

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        fs::write(&input, "{\"text\":\"x\"}\n").unwrap();
        let output = dir.path().join("out.jsonl");

        let recipe = Recipe {
            version: "0.1".to_owned(),
            name: None,
            workspace_dir: dir.path().join("runs").to_string_lossy().into_owned(),
            input_manifest: Some(input.to_string_lossy().into_owned()),
            output_manifest: Some(output.to_string_lossy().into_owned()),
            steps_to_run: "all".to_owned(),
            steps: vec![
                step("add", "AddConstantFields", json!({"fields": {"src": "w"}})),
                step("drop", "DropSpecifiedFields", json!({"fields_to_drop": ["nope"]})),
                step("rename", "RenameFields", json!({"rename_fields": {"text": "content"}})),
            ],
        };

        let runner = PipelineRunner::new(&registry);
        let summary = runner.run(&recipe, &RunOptions::default()).unwrap();

        assert_eq!(summary.stats.len(), 3);
        for s in &summary.stats {
            assert_eq!(s.stats.r#in, 1);
            assert_eq!(s.stats.out, 1);
        }
        let contents = fs::read_to_string(&summary.output).unwrap();
        let record: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(record, json!({"src": "w", "content": "x"}));
    }

    #[test]
    fn disabled_step_is_transparent_for_stitching() {
        let registry = Registry::new();
        register_builtins(&registry);

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        fs::write(&input, "{\"a\":1}\n").unwrap();
        let output = dir.path().join("out.jsonl");

        let recipe = Recipe {
            version: "0.1".to_owned(),
            name: None,
            workspace_dir: dir.path().join("runs").to_string_lossy().into_owned(),
            input_manifest: Some(input.to_string_lossy().into_owned()),
            output_manifest: Some(output.to_string_lossy().into_owned()),
            steps_to_run: "all".to_owned(),
            steps: vec![
                disabled(step(
                    "skipped",
                    "AddConstantFields",
                    json!({"fields": {"should_not_appear": true}}),
                )),
                step("keep", "PassThrough", json!({})),
            ],
        };

        let runner = PipelineRunner::new(&registry);
        let summary = runner.run(&recipe, &RunOptions::default()).unwrap();

        // only the enabled step ran
        assert_eq!(summary.stats.len(), 1);
        assert_eq!(summary.stats[0].step_id, "keep");
        assert_eq!(fs::read_to_string(&summary.output).unwrap(), "{\"a\":1}\n");
    }

    #[test]
    fn keep_temps_retains_temp_directory() {
        let registry = Registry::new();
        register_builtins(&registry);

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        fs::write(&input, "{\"a\":1}\n").unwrap();

        let recipe = Recipe {
            version: "0.1".to_owned(),
            name: None,
            workspace_dir: dir.path().join("runs").to_string_lossy().into_owned(),
            input_manifest: Some(input.to_string_lossy().into_owned()),
            output_manifest: None,
            steps_to_run: "all".to_owned(),
            steps: vec![
                step("a", "PassThrough", json!({})),
                step("b", "PassThrough", json!({})),
            ],
        };

        let runner = PipelineRunner::new(&registry);
        let options = RunOptions {
            keep_temps: true,
            ..RunOptions::default()
        };
        let summary = runner.run(&recipe, &options).unwrap();

        let temp_dir = dir.path().join("runs").join(".tmp");
        assert!(temp_dir.exists());
        assert!(summary.output.exists());
    }

    #[test]
    fn preview_streams_first_n_records() {
        let registry = Registry::new();
        register_builtins(&registry);

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        fs::write(&input, "{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n").unwrap();

        let recipe = Recipe {
            version: "0.1".to_owned(),
            name: None,
            workspace_dir: dir.path().join("runs").to_string_lossy().into_owned(),
            input_manifest: Some(input.to_string_lossy().into_owned()),
            output_manifest: None,
            steps_to_run: "all".to_owned(),
            steps: vec![step("s0", "PassThrough", json!({}))],
        };

        let runner = PipelineRunner::new(&registry);
        let (_summary, preview) = runner
            .preview_recipe(&recipe, 2, &RunOptions::default())
            .unwrap();

        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].get("a"), Some(&json!(1)));
        assert_eq!(preview[1].get("a"), Some(&json!(2)));
    }
}
