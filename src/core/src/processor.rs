//! The two processor contracts from spec.md §4.3: the general [`Processor`]
//! trait every step's implementation satisfies, and the [`MapProcessor`]
//! specialization that the registry and built-ins use for one-record-at-a-
//! time transforms.

use crate::{CancellationToken, DataEntry, Record, RunContext, RunStats};
use serde::Deserialize;
use serde_json::Value;
use std::error;
use std::path::Path;
use std::time::Instant;

/// A boxed, `Send`-able error, the common currency at the processor
/// boundary — mirrors the grounding repo's own practice of aggregating
/// heterogeneous per-processor error types behind `Box<dyn Error>` at its
/// orchestration boundary (`automaat-server`'s `Processor::run`/
/// `Processor::validate`).
pub type BoxedError = Box<dyn error::Error + Send + Sync>;

/// The general processor contract (spec.md §4.3).
///
/// A `Processor` is constructed with its params plus the input/output
/// manifest paths the runner selected, and is responsible for reading
/// `input` and producing `output`. Object-safe so the registry can hand
/// out `Box<dyn Processor>` regardless of concrete type, built-in or
/// dynamically resolved.
pub trait Processor: Send {
    /// Human-readable processor name, used in error messages and
    /// `list-processors` output.
    fn name(&self) -> &str;

    /// Called once before `process`. Default no-op.
    fn prepare(&mut self, _ctx: &RunContext) -> Result<(), BoxedError> {
        Ok(())
    }

    /// Read `input`, write `output`, and return the resulting stats.
    fn process(
        &mut self,
        ctx: &RunContext,
        cancel: &CancellationToken,
        input: &Path,
        output: &Path,
    ) -> Result<RunStats, BoxedError>;

    /// Called once after `process`, even on failure (best-effort, with
    /// whatever stats value was produced, or a zeroed one on failure
    /// before any stats existed). Default no-op.
    fn finalize(&mut self, _ctx: &RunContext, _stats: &RunStats) -> Result<(), BoxedError> {
        Ok(())
    }
}

/// Extra, recognized params for any [`MapProcessor`] (spec.md §4.3 table).
#[derive(Clone, Copy, Debug)]
pub struct MapProcessorConfig {
    /// `>= 2` enables parallel mode. Default 1 (serial, in-order).
    pub max_workers: usize,
    /// Chunk size per parallel dispatch. Default 10000.
    pub in_memory_chunksize: usize,
}

impl Default for MapProcessorConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            in_memory_chunksize: 10_000,
        }
    }
}

/// One `{input, output}` pair a [`MapProcessor`] can self-verify against
/// during `prepare` (spec.md §4.3, §8).
#[derive(Clone, Debug, Deserialize)]
pub struct TestCase {
    /// The record handed to `process_record`.
    pub input: Record,
    /// The expected non-dropped output records, in order.
    pub output: Vec<Record>,
}

/// The per-record transform specialization of [`Processor`].
///
/// `process_record` must be pure when [`MapProcessorConfig::max_workers`]
/// is `>= 2`: no observable mutation of processor state, no reliance on
/// external mutable context. In serial mode it may mutate `self` across
/// records (e.g. a running counter).
pub trait MapProcessor: Send {
    /// Human-readable processor name.
    fn name(&self) -> &str;

    /// Transform one input record into zero or more output entries.
    fn process_record(&mut self, record: Record) -> Vec<DataEntry>;

    /// Parallelism/chunking configuration. Default: serial, chunk 10000.
    fn config(&self) -> MapProcessorConfig {
        MapProcessorConfig::default()
    }

    /// Optional self-test cases, checked once in `prepare`.
    fn test_cases(&self) -> &[TestCase] {
        &[]
    }

    /// Called once after all records have been processed, with the run's
    /// stats and every metrics record carried by a [`DataEntry`] along the
    /// way, present or dropped (spec.md §8 "metrics are observable by a
    /// finalize hook"). Default no-op.
    fn finalize(&mut self, _stats: &RunStats, _metrics: &[Record]) -> Result<(), BoxedError> {
        Ok(())
    }
}

/// A recipe for producing a fresh, independent [`MapProcessor`] instance.
///
/// The parallel engine reconstructs the processor once per worker from
/// this factory instead of sharing or transferring the original instance
/// across threads (spec.md §4.4, §9 "Worker isolation") — a processor
/// author only needs its params to be reconstructible, not its instance
/// to be `Sync`.
pub type MapProcessorFactory = dyn Fn() -> Box<dyn MapProcessor> + Send + Sync;

/// The three params spec.md §4.3's table recognizes on *every*
/// `MapProcessor`, regardless of what processor-specific fields share
/// the same `params` object.
///
/// Parsed independently of a processor's own params struct, so a
/// built-in's `Deserialize` impl never needs to know about these three
/// keys — it simply ignores them as unrecognized extra fields.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommonMapParams {
    /// Overrides [`MapProcessor::config`]'s `max_workers`, if set.
    pub max_workers: Option<usize>,
    /// Overrides [`MapProcessor::config`]'s `in_memory_chunksize`, if set.
    pub in_memory_chunksize: Option<usize>,
    /// Overrides [`MapProcessor::test_cases`], if set.
    pub test_cases: Option<Vec<TestCase>>,
}

impl CommonMapParams {
    /// Parse the three common fields out of a step's raw `params`,
    /// ignoring any processor-specific fields alongside them.
    pub fn parse(params: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(params.clone())
    }

    fn resolve_config(&self, default: MapProcessorConfig) -> MapProcessorConfig {
        MapProcessorConfig {
            max_workers: self.max_workers.unwrap_or(default.max_workers),
            in_memory_chunksize: self
                .in_memory_chunksize
                .unwrap_or(default.in_memory_chunksize),
        }
    }
}

/// Wraps a [`MapProcessor`] with a [`MapProcessorConfig`]/test-case
/// override resolved from a recipe step's params (spec.md §4.3 table),
/// independent of whatever defaults the wrapped processor compiles in.
pub struct ConfiguredMapProcessor {
    inner: Box<dyn MapProcessor>,
    config: MapProcessorConfig,
    test_cases: Vec<TestCase>,
}

impl ConfiguredMapProcessor {
    /// Wrap `inner`, resolving `common`'s overrides against `inner`'s own
    /// compiled-in config and test cases.
    pub fn new(inner: Box<dyn MapProcessor>, common: &CommonMapParams) -> Self {
        let config = common.resolve_config(inner.config());
        let test_cases = common
            .test_cases
            .clone()
            .unwrap_or_else(|| inner.test_cases().to_vec());
        Self {
            inner,
            config,
            test_cases,
        }
    }
}

impl MapProcessor for ConfiguredMapProcessor {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
        self.inner.process_record(record)
    }

    fn config(&self) -> MapProcessorConfig {
        self.config
    }

    fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    fn finalize(&mut self, stats: &RunStats, metrics: &[Record]) -> Result<(), BoxedError> {
        self.inner.finalize(stats, metrics)
    }
}

/// Adapts any [`MapProcessor`] into the general [`Processor`] contract by
/// implementing `process` as the serial-or-parallel streaming engine
/// described in spec.md §4.4.
pub struct MapProcessorAdapter {
    name: String,
    instance: Box<dyn MapProcessor>,
    factory: Box<MapProcessorFactory>,
    last_metrics: Vec<Record>,
}

impl MapProcessorAdapter {
    /// Wrap `instance` (used directly in serial mode, and for self-test
    /// verification) together with `factory` (used to build one fresh
    /// instance per parallel worker).
    pub fn new(instance: Box<dyn MapProcessor>, factory: Box<MapProcessorFactory>) -> Self {
        let name = instance.name().to_owned();
        Self {
            name,
            instance,
            factory,
            last_metrics: Vec::new(),
        }
    }
}

impl Processor for MapProcessorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self, _ctx: &RunContext) -> Result<(), BoxedError> {
        for case in self.instance.test_cases().to_vec() {
            let got: Vec<Record> = self
                .instance
                .process_record(case.input.clone())
                .into_iter()
                .filter_map(|entry| entry.data.into_record())
                .collect();

            if got != case.output {
                return Err(Box::new(TestCaseMismatch {
                    processor: self.name.clone(),
                    expected: case.output,
                    got,
                }));
            }
        }
        Ok(())
    }

    fn process(
        &mut self,
        ctx: &RunContext,
        cancel: &CancellationToken,
        input: &Path,
        output: &Path,
    ) -> Result<RunStats, BoxedError> {
        let start = Instant::now();
        let config = self.instance.config();

        let (mut stats, metrics) = if config.max_workers >= 2 {
            crate::parallel::run_parallel(cancel, input, output, &self.factory, config)?
        } else {
            crate::engine::run_serial(cancel, input, output, self.instance.as_mut())?
        };
        stats.time = start.elapsed();
        self.last_metrics = metrics;
        let _ = ctx;
        Ok(stats)
    }

    fn finalize(&mut self, _ctx: &RunContext, stats: &RunStats) -> Result<(), BoxedError> {
        self.instance.finalize(stats, &self.last_metrics)
    }
}

#[derive(Debug, Clone)]
struct TestCaseMismatch {
    processor: String,
    expected: Vec<Record>,
    got: Vec<Record>,
}

impl std::fmt::Display for TestCaseMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processor {:?} failed self-test: expected {:?}, got {:?}",
            self.processor, self.expected, self.got
        )
    }
}

impl error::Error for TestCaseMismatch {}
