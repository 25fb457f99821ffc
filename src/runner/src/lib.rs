//! # MiniDP runner
//!
//! `minidp-runner` parses and validates recipes (spec.md §3, §4.5) and
//! orchestrates their execution against a [`minidp_registry::Registry`]
//! (spec.md §4.6): step selection, input/output manifest stitching,
//! temp-file lifecycle, and preview mode.

#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
mod recipe;
mod runner;

pub use error::{RecipeValidationError, RunError, StepFailedError};
pub use recipe::{Recipe, RecipeStep};
pub use runner::{PipelineRunner, RunOptions, RunSummary, StepSummary};
