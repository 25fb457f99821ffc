//! Argument definitions for the `minidp` binary (spec.md §6).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "minidp", author, version, about = "A deterministic, recipe-driven JSONL pipeline engine")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a recipe to completion.
    Run(RunArgs),
    /// Run a recipe, then print the first few records of its output.
    Preview(PreviewArgs),
    /// Validate a recipe without running it.
    Validate(ValidateArgs),
    /// List the built-in processors and their parameters.
    ListProcessors,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the recipe JSON file.
    pub recipe: PathBuf,
    /// Overrides the recipe's `workspace_dir`.
    #[arg(short = 'w', long)]
    pub workspace: Option<PathBuf>,
    /// Keep the run's temp directory after a successful run.
    #[arg(long)]
    pub keep_temps: bool,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Path to the recipe JSON file.
    pub recipe: PathBuf,
    /// Number of records to preview.
    #[arg(short = 'n', default_value_t = 5)]
    pub n: usize,
    /// Overrides the recipe's `workspace_dir`.
    #[arg(short = 'w', long)]
    pub workspace: Option<PathBuf>,
    /// Keep the run's temp directory (SPEC_FULL.md supplemental feature 3).
    #[arg(long)]
    pub keep_temps: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the recipe JSON file.
    pub recipe: PathBuf,
}
