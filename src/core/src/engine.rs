//! Serial execution of a [`crate::MapProcessor`]: one record at a time,
//! in order, with the instance free to mutate its own state across
//! records (spec.md §4.3, §4.4 "Serial mode").

use crate::processor::BoxedError;
use crate::{
    CancellationToken, ManifestReader, ManifestWriter, MapProcessor, ProcessorExecutionError,
    Record, RunStats,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Stream `input` through `processor.process_record`, writing non-dropped
/// entries to `output` in input order, and accumulating [`RunStats`] plus
/// any metrics carried on dropped entries (spec.md §8 "Drop vs
/// metrics-drop").
pub fn run_serial(
    cancel: &CancellationToken,
    input: &Path,
    output: &Path,
    processor: &mut dyn MapProcessor,
) -> Result<(RunStats, Vec<Record>), BoxedError> {
    let reader = ManifestReader::open(input)?;
    let mut writer = ManifestWriter::create(output)?;
    let mut stats = RunStats::default();
    let mut metrics = Vec::new();

    for (index, record) in reader.enumerate() {
        if cancel.is_cancelled() {
            return Err(Box::new(crate::CancelledError::new(
                "cancelled during serial processing",
            )));
        }

        let record = record?;
        let name = processor.name().to_owned();
        let entries = catch_unwind(AssertUnwindSafe(|| processor.process_record(record)))
            .map_err(|panic| ProcessorExecutionError::new(name, index, panic_message(&panic)))?;

        let written = entries.iter().filter(|entry| !entry.data.is_dropped()).count();
        stats.record_emission(written);

        for entry in entries {
            if let Some(m) = entry.metrics {
                metrics.push(m);
            }
            if let Some(record) = entry.data.into_record() {
                writer.write_record(&record)?;
            }
        }
    }

    writer.finish()?;
    Ok((stats, metrics))
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "processor panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataEntry, Record};
    use serde_json::json;

    struct PassThrough;
    impl MapProcessor for PassThrough {
        fn name(&self) -> &str {
            "PassThrough"
        }
        fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
            vec![DataEntry::record(record)]
        }
    }

    struct DropAll;
    impl MapProcessor for DropAll {
        fn name(&self) -> &str {
            "DropAll"
        }
        fn process_record(&mut self, _record: Record) -> Vec<DataEntry> {
            vec![]
        }
    }

    struct DropWithMetrics;
    impl MapProcessor for DropWithMetrics {
        fn name(&self) -> &str {
            "DropWithMetrics"
        }
        fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
            let mut metrics = Record::new();
            metrics.insert("reason".to_owned(), json!("filtered"));
            metrics.insert("id".to_owned(), record.get("id").cloned().unwrap_or(json!(null)));
            vec![DataEntry::dropped_with_metrics(metrics)]
        }
    }

    #[test]
    fn pass_through_preserves_order_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        std::fs::write(&input, "{\"a\":1}\n{\"a\":2}\n").unwrap();
        let output = dir.path().join("out.jsonl");

        let cancel = CancellationToken::new();
        let (stats, metrics) = run_serial(&cancel, &input, &output, &mut PassThrough).unwrap();

        assert_eq!(stats.r#in, 2);
        assert_eq!(stats.out, 2);
        assert_eq!(stats.dropped, 0);
        assert!(metrics.is_empty());
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "{\"a\":1}\n{\"a\":2}\n"
        );
    }

    #[test]
    fn drop_all_counts_dropped_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        std::fs::write(&input, "{\"a\":1}\n").unwrap();
        let output = dir.path().join("out.jsonl");

        let cancel = CancellationToken::new();
        let (stats, metrics) = run_serial(&cancel, &input, &output, &mut DropAll).unwrap();

        assert_eq!(stats.r#in, 1);
        assert_eq!(stats.out, 0);
        assert_eq!(stats.dropped, 1);
        assert!(metrics.is_empty());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[test]
    fn dropped_with_metrics_counts_as_dropped_and_surfaces_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        std::fs::write(&input, "{\"id\":1}\n{\"id\":2}\n").unwrap();
        let output = dir.path().join("out.jsonl");

        let cancel = CancellationToken::new();
        let (stats, metrics) =
            run_serial(&cancel, &input, &output, &mut DropWithMetrics).unwrap();

        // a dropped-with-metrics entry writes no data record...
        assert_eq!(stats.r#in, 2);
        assert_eq!(stats.out, 0);
        assert_eq!(stats.dropped, 2);
        assert!(stats.is_consistent());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");

        // ...but its metrics are preserved for a finalize hook to observe.
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].get("reason"), Some(&json!("filtered")));
        assert_eq!(metrics[0].get("id"), Some(&json!(1)));
        assert_eq!(metrics[1].get("id"), Some(&json!(2)));
    }
}
