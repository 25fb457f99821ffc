//! # MiniDP core
//!
//! `minidp-core` provides the building blocks every other MiniDP crate is
//! built on: the JSON [`Record`]/[`DataEntry`] model, streaming JSONL
//! manifest I/O, the [`Processor`]/[`MapProcessor`] contracts, and the
//! serial-or-parallel map engine that drives a `MapProcessor` across a
//! manifest.
//!
//! It does not know anything about recipes, the processor registry, or
//! the CLI — those live in `minidp-registry`, `minidp-processors`, and
//! `minidp-runner`/`minidp-cli` respectively.

#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod cancellation;
mod context;
mod engine;
mod error;
mod manifest;
mod parallel;
mod processor;
mod record;
mod stats;

pub use cancellation::CancellationToken;
pub use context::{ContextError, RunContext};
pub use error::{CancelledError, ProcessorExecutionError};
pub use manifest::{temp_step_path, ManifestReadError, ManifestReader, ManifestWriteError, ManifestWriter};
pub use processor::{
    BoxedError, CommonMapParams, ConfiguredMapProcessor, MapProcessor, MapProcessorAdapter,
    MapProcessorConfig, MapProcessorFactory, Processor, TestCase,
};
pub use record::{DataEntry, Record, RecordData};
pub use stats::RunStats;
