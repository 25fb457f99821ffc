//! The parallel map engine (spec.md §4.4): a worker pool of
//! `max_workers` independent workers, each built fresh from a
//! [`crate::processor::MapProcessorFactory`], processing bounded chunks of
//! records while preserving input order on write.

use crate::engine::panic_message;
use crate::processor::{BoxedError, MapProcessorFactory};
use crate::{CancellationToken, DataEntry, ManifestReadError, ManifestReader, ManifestWriter, ProcessorExecutionError, Record, RunStats};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Duration;

struct Chunk {
    index: usize,
    records: Vec<(usize, Record)>,
}

struct ChunkResult {
    index: usize,
    entries: Vec<(usize, Vec<DataEntry>)>,
}

enum Outcome {
    Chunk(Result<ChunkResult, ProcessorExecutionError>),
    ReaderDone {
        total_chunks: usize,
        error: Option<ManifestReadError>,
    },
}

/// Run `input` through the worker pool described by `factory`/`config`,
/// writing to `output` in input order.
///
/// A permit semaphore (capacity `max_workers`) gates how many chunks the
/// reader may have dispatched but not yet seen flushed in order: the
/// reader acquires a permit before building each chunk, and the
/// coordinator returns one permit per chunk it removes from the
/// reordering buffer. This bounds the number of chunks simultaneously
/// queued, in a worker's hands, or stuck in the reordering buffer behind
/// a slow chunk to `max_workers`, so the engine never holds more than
/// `max_workers * in_memory_chunksize` records in memory at once.
pub fn run_parallel(
    cancel: &CancellationToken,
    input: &Path,
    output: &Path,
    factory: &MapProcessorFactory,
    config: crate::MapProcessorConfig,
) -> Result<(RunStats, Vec<Record>), BoxedError> {
    let max_workers = config.max_workers.max(2);
    let chunk_size = config.in_memory_chunksize.max(1);

    let (job_tx, job_rx) = bounded::<Chunk>(max_workers);
    let (res_tx, res_rx) = bounded::<Outcome>(max_workers * 2);
    let (permit_tx, permit_rx) = bounded::<()>(max_workers);
    for _ in 0..max_workers {
        permit_tx
            .send(())
            .expect("permit channel has room for its own capacity");
    }
    let stop = CancellationToken::new();

    let mut writer = ManifestWriter::create(output)?;
    let mut stats = RunStats::default();
    let mut metrics = Vec::new();
    let mut buffer: BTreeMap<usize, ChunkResult> = BTreeMap::new();
    let mut next_expected = 0usize;
    let mut total_chunks: Option<usize> = None;
    let mut received_chunks = 0usize;
    let mut first_error: Option<BoxedError> = None;

    std::thread::scope(|scope| {
        for _ in 0..max_workers {
            let job_rx: Receiver<Chunk> = job_rx.clone();
            let res_tx: Sender<Outcome> = res_tx.clone();
            let stop = stop.clone();
            let mut instance = factory();
            let name = instance.name().to_owned();

            scope.spawn(move || {
                while let Ok(chunk) = job_rx.recv() {
                    if stop.is_cancelled() || cancel.is_cancelled() {
                        break;
                    }

                    let mut entries = Vec::with_capacity(chunk.records.len());
                    let mut failed = false;
                    for (global_index, record) in chunk.records {
                        if stop.is_cancelled() || cancel.is_cancelled() {
                            break;
                        }
                        let name = name.clone();
                        match catch_unwind(AssertUnwindSafe(|| instance.process_record(record))) {
                            Ok(out) => entries.push((global_index, out)),
                            Err(panic) => {
                                stop.cancel();
                                let _ = res_tx.send(Outcome::Chunk(Err(ProcessorExecutionError::new(
                                    name,
                                    global_index,
                                    panic_message(&panic),
                                ))));
                                failed = true;
                                break;
                            }
                        }
                    }

                    if !failed {
                        let _ = res_tx.send(Outcome::Chunk(Ok(ChunkResult {
                            index: chunk.index,
                            entries,
                        })));
                    }
                }
            });
        }

        {
            let job_tx = job_tx;
            let res_tx = res_tx;
            let permit_rx = permit_rx.clone();
            let stop = stop.clone();
            let input = input.to_owned();

            scope.spawn(move || {
                let mut reader = match ManifestReader::open(input) {
                    Ok(r) => r,
                    Err(err) => {
                        let _ = res_tx.send(Outcome::ReaderDone {
                            total_chunks: 0,
                            error: Some(err),
                        });
                        return;
                    }
                };

                let mut chunk_index = 0usize;
                let mut global_index = 0usize;
                let mut read_error = None;

                'outer: loop {
                    if stop.is_cancelled() || cancel.is_cancelled() {
                        break;
                    }

                    // Backpressure: don't build the next chunk until the
                    // coordinator has flushed one of the chunks already
                    // dispatched, bounding in-flight + buffered chunks to
                    // `max_workers`.
                    loop {
                        match permit_rx.recv_timeout(Duration::from_millis(50)) {
                            Ok(()) => break,
                            Err(RecvTimeoutError::Timeout) => {
                                if stop.is_cancelled() || cancel.is_cancelled() {
                                    break 'outer;
                                }
                                continue;
                            }
                            Err(RecvTimeoutError::Disconnected) => break 'outer,
                        }
                    }

                    let mut records = Vec::with_capacity(chunk_size);
                    for _ in 0..chunk_size {
                        match reader.next() {
                            None => break,
                            Some(Ok(record)) => {
                                records.push((global_index, record));
                                global_index += 1;
                            }
                            Some(Err(err)) => {
                                read_error = Some(err);
                                break 'outer;
                            }
                        }
                    }

                    if records.is_empty() {
                        break;
                    }

                    let chunk = Chunk {
                        index: chunk_index,
                        records,
                    };
                    chunk_index += 1;

                    if job_tx.send(chunk).is_err() {
                        break;
                    }
                }

                if read_error.is_some() {
                    stop.cancel();
                }

                let _ = res_tx.send(Outcome::ReaderDone {
                    total_chunks: chunk_index,
                    error: read_error,
                });
            });
        }

        loop {
            let outcome = match res_rx.recv() {
                Ok(outcome) => outcome,
                Err(_) => break,
            };

            match outcome {
                Outcome::ReaderDone { total_chunks: t, error } => {
                    total_chunks = Some(t);
                    if let Some(err) = error {
                        stop.cancel();
                        first_error.get_or_insert_with(|| -> BoxedError { Box::new(err) });
                    }
                }
                Outcome::Chunk(Ok(result)) => {
                    received_chunks += 1;
                    buffer.insert(result.index, result);
                }
                Outcome::Chunk(Err(err)) => {
                    received_chunks += 1;
                    stop.cancel();
                    first_error.get_or_insert_with(|| -> BoxedError { Box::new(err) });
                    let _ = permit_tx.send(());
                }
            }

            while let Some(result) = buffer.remove(&next_expected) {
                next_expected += 1;
                if first_error.is_some() {
                    let _ = permit_tx.send(());
                    continue;
                }
                for (_, entries) in result.entries {
                    let written = entries.iter().filter(|entry| !entry.data.is_dropped()).count();
                    stats.record_emission(written);
                    for entry in entries {
                        if let Some(m) = entry.metrics {
                            metrics.push(m);
                        }
                        if let Some(record) = entry.data.into_record() {
                            if let Err(err) = writer.write_record(&record) {
                                first_error.get_or_insert_with(|| -> BoxedError { Box::new(err) });
                                stop.cancel();
                            }
                        }
                    }
                }
                let _ = permit_tx.send(());
            }

            if let Some(t) = total_chunks {
                if received_chunks >= t {
                    break;
                }
            }
        }

    });

    if cancel.is_cancelled() && first_error.is_none() {
        first_error = Some(Box::new(crate::CancelledError::new(
            "cancelled during parallel processing",
        )));
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    writer.finish()?;
    Ok((stats, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataEntry, MapProcessor, MapProcessorConfig, Record};
    use serde_json::json;

    #[derive(Clone)]
    struct Upper;
    impl MapProcessor for Upper {
        fn name(&self) -> &str {
            "Upper"
        }
        fn process_record(&mut self, mut record: Record) -> Vec<DataEntry> {
            if let Some(serde_json::Value::String(s)) = record.get("text").cloned() {
                record.insert("text".to_owned(), json!(s.to_uppercase()));
            }
            vec![DataEntry::record(record)]
        }
        fn config(&self) -> MapProcessorConfig {
            MapProcessorConfig {
                max_workers: 4,
                in_memory_chunksize: 3,
            }
        }
    }

    #[test]
    fn parallel_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        let mut contents = String::new();
        for i in 0..100 {
            contents.push_str(&format!("{{\"text\":\"r{}\"}}\n", i));
        }
        std::fs::write(&input, contents).unwrap();
        let output = dir.path().join("out.jsonl");

        let cancel = CancellationToken::new();
        let config = Upper.config();
        let (stats, _metrics) =
            run_parallel(&cancel, &input, &output, &|| Box::new(Upper), config).unwrap();

        assert_eq!(stats.r#in, 100);
        assert_eq!(stats.out, 100);

        let out = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 100);
        for (i, line) in lines.iter().enumerate() {
            let expected = format!("{{\"text\":\"R{}\"}}", i);
            assert_eq!(*line, expected);
        }
    }

    #[derive(Clone)]
    struct DropEveryOtherWithMetrics;
    impl MapProcessor for DropEveryOtherWithMetrics {
        fn name(&self) -> &str {
            "DropEveryOtherWithMetrics"
        }
        fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
            let n = record.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            if n % 2 == 0 {
                vec![DataEntry::record(record)]
            } else {
                let mut metrics = Record::new();
                metrics.insert("dropped_n".to_owned(), json!(n));
                vec![DataEntry::dropped_with_metrics(metrics)]
            }
        }
        fn config(&self) -> MapProcessorConfig {
            MapProcessorConfig {
                max_workers: 4,
                in_memory_chunksize: 3,
            }
        }
    }

    #[test]
    fn dropped_with_metrics_does_not_inflate_out_and_surfaces_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        let mut contents = String::new();
        for i in 0..10 {
            contents.push_str(&format!("{{\"n\":{}}}\n", i));
        }
        std::fs::write(&input, contents).unwrap();
        let output = dir.path().join("out.jsonl");

        let cancel = CancellationToken::new();
        let config = DropEveryOtherWithMetrics.config();
        let (stats, metrics) = run_parallel(
            &cancel,
            &input,
            &output,
            &|| Box::new(DropEveryOtherWithMetrics),
            config,
        )
        .unwrap();

        assert_eq!(stats.r#in, 10);
        assert_eq!(stats.out, 5);
        assert_eq!(stats.dropped, 5);
        assert!(stats.is_consistent());
        assert_eq!(metrics.len(), 5);
    }
}
