//! `SortManifest`: a non-streaming processor that loads the whole
//! manifest, sorts by one attribute, and writes it back out (spec.md
//! §4.7). The only built-in that reorders records.

use crate::params::parse;
use minidp_core::{
    BoxedError, CancellationToken, ManifestReader, ManifestWriter, Processor, Record, RunContext,
    RunStats,
};
use minidp_registry::ProcessorConstructionError;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;
use std::time::Instant;

fn default_descending() -> bool {
    false
}

/// Loads every record, sorts by `attribute_sort_by`, and writes the
/// result in sorted order.
///
/// A record missing `attribute_sort_by` sorts last in ascending order,
/// first in descending order.
#[derive(Clone, Debug, Deserialize)]
pub struct SortManifest {
    /// Field to sort by.
    pub attribute_sort_by: String,
    /// Sort descending instead of ascending. Default `false`.
    #[serde(default = "default_descending")]
    pub descending: bool,
}

impl SortManifest {
    /// Construct from a step's `params`.
    pub fn from_params(params: Value) -> Result<Self, ProcessorConstructionError> {
        parse("SortManifest", params)
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let key_a = a.get(&self.attribute_sort_by);
        let key_b = b.get(&self.attribute_sort_by);

        let ordering = match (key_a, key_b) {
            (Some(a), Some(b)) => compare_values(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

impl Processor for SortManifest {
    fn name(&self) -> &str {
        "SortManifest"
    }

    fn process(
        &mut self,
        _ctx: &RunContext,
        cancel: &CancellationToken,
        input: &Path,
        output: &Path,
    ) -> Result<RunStats, BoxedError> {
        let start = Instant::now();
        let mut records: Vec<Record> = Vec::new();
        for record in ManifestReader::open(input)? {
            if cancel.is_cancelled() {
                return Err(Box::new(minidp_core::CancelledError::new(
                    "cancelled while loading manifest to sort",
                )));
            }
            records.push(record?);
        }

        let mut stats = RunStats::default();
        stats.r#in = records.len() as u64;

        records.sort_by(|a, b| self.compare(a, b));

        if cancel.is_cancelled() {
            return Err(Box::new(minidp_core::CancelledError::new(
                "cancelled before writing sorted manifest",
            )));
        }

        let mut writer = ManifestWriter::create(output)?;
        for record in &records {
            writer.write_record(record)?;
        }
        writer.finish()?;

        stats.out = stats.r#in;
        stats.time = start.elapsed();
        Ok(stats)
    }
}
