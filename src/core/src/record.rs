//! The in-flight unit MiniDP streams through a pipeline, and the value a
//! [`crate::MapProcessor`] returns for each record it consumes.

use serde_json::{Map, Value};

/// A record is an unordered mapping from string keys to arbitrary JSON
/// values. Records are independent of one another: nothing in MiniDP lets
/// one record reference another.
pub type Record = Map<String, Value>;

/// The data half of a [`DataEntry`]: either a record, or the explicit
/// "dropped" sentinel.
///
/// `Dropped` is distinct from a processor emitting no `DataEntry` at all —
/// both count as a drop for [`crate::RunStats`] purposes, but only
/// `Dropped` can still carry `metrics` (see [`DataEntry`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    /// A live record to be written to the output manifest.
    Present(Record),
    /// The record was intentionally dropped.
    Dropped,
}

impl RecordData {
    /// Returns the underlying record, if present.
    pub fn into_record(self) -> Option<Record> {
        match self {
            RecordData::Present(record) => Some(record),
            RecordData::Dropped => None,
        }
    }

    /// True if this is the dropped sentinel.
    pub const fn is_dropped(&self) -> bool {
        matches!(self, RecordData::Dropped)
    }
}

/// The unit a [`crate::MapProcessor`] returns for each input record.
///
/// A processor that wants to drop a record but still report a metric emits
/// a single `DataEntry` with `data: RecordData::Dropped` and non-empty
/// `metrics`. A processor that wants to drop entirely emits an empty
/// `Vec<DataEntry>` for that input record. These two are distinguishable,
/// and the distinction drives the `dropped` vs. `expanded` stats counters
/// (see [`crate::RunStats`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataEntry {
    /// The record data, or the dropped sentinel.
    pub data: RecordData,
    /// Metrics preserved even when `data` is dropped.
    pub metrics: Option<Map<String, Value>>,
}

impl DataEntry {
    /// Construct an entry carrying a live record and no metrics.
    pub const fn record(record: Record) -> Self {
        Self {
            data: RecordData::Present(record),
            metrics: None,
        }
    }

    /// Construct a dropped entry carrying metrics.
    pub const fn dropped_with_metrics(metrics: Map<String, Value>) -> Self {
        Self {
            data: RecordData::Dropped,
            metrics: Some(metrics),
        }
    }
}
