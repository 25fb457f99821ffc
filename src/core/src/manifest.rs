//! Streaming readers and writers for JSON-Lines manifest files, and the
//! path helper the runner uses to stitch intermediate manifests together.

use crate::Record;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::{error, fmt};

/// A lazy, single-pass iterator over the records in a JSONL manifest file.
///
/// Empty lines (after trimming) are skipped on read. Malformed JSON on any
/// non-empty line fails with [`ManifestReadError`] carrying the path and
/// 1-based line number. The reader is not restartable; once exhausted or
/// errored, create a new one to re-read the file.
#[derive(Debug)]
pub struct ManifestReader {
    path: PathBuf,
    lines: io::Lines<BufReader<File>>,
    line_no: usize,
    done: bool,
}

impl ManifestReader {
    /// Open `path` for streaming read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ManifestReadError> {
        let path = path.into();
        let file = File::open(&path).map_err(|err| ManifestReadError {
            path: path.clone(),
            line: 0,
            source: ManifestReadErrorKind::Io(err),
        })?;

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_no: 0,
            done: false,
        })
    }

    /// Path this reader was opened against.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for ManifestReader {
    type Item = Result<Record, ManifestReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    self.done = true;
                    self.line_no += 1;
                    return Some(Err(ManifestReadError {
                        path: self.path.clone(),
                        line: self.line_no,
                        source: ManifestReadErrorKind::Io(err),
                    }));
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str::<serde_json::Value>(&line)
                    .map_err(|err| ManifestReadError {
                        path: self.path.clone(),
                        line: self.line_no,
                        source: ManifestReadErrorKind::Json(err),
                    })
                    .and_then(|value| match value {
                        serde_json::Value::Object(map) => Ok(map),
                        _ => Err(ManifestReadError {
                            path: self.path.clone(),
                            line: self.line_no,
                            source: ManifestReadErrorKind::NotAnObject,
                        }),
                    }),
            );
        }
    }
}

/// A writer for JSONL manifest files.
///
/// Opens the path for truncating write, serializes each record as a single
/// compact JSON line with a trailing newline, and guarantees the
/// underlying file is flushed on [`ManifestWriter::finish`]. On an
/// uncaught error the partial file is left in place — MiniDP does not
/// write via tempfile+rename (spec.md §4.1).
#[derive(Debug)]
pub struct ManifestWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ManifestWriter {
    /// Create (truncating) the manifest file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ManifestWriteError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| ManifestWriteError {
                path: path.clone(),
                source: err,
            })?;
        }
        let file = File::create(&path).map_err(|err| ManifestWriteError {
            path: path.clone(),
            source: err,
        })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Write a single record as a JSON line.
    pub fn write_record(&mut self, record: &Record) -> Result<(), ManifestWriteError> {
        let err = |source| ManifestWriteError {
            path: self.path.clone(),
            source,
        };

        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        self.writer.write_all(b"\n").map_err(err)
    }

    /// Flush and close the writer. Must be called (or the writer dropped)
    /// to guarantee durability; a write error from `finish` indicates the
    /// manifest may be incomplete.
    pub fn finish(mut self) -> Result<PathBuf, ManifestWriteError> {
        self.writer.flush().map_err(|source| ManifestWriteError {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.path)
    }

    /// Path this writer targets.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Computes the runner's temp manifest path for a given step, per spec.md
/// §4.1: `{workspace}/.tmp/{run_id}/step_{index}.jsonl`.
pub fn temp_step_path(temp_dir: &Path, absolute_index: usize) -> PathBuf {
    temp_dir.join(format!("step_{}.jsonl", absolute_index))
}

/// A manifest read failed: malformed JSON, a non-object line, or an
/// underlying IO error, at a specific 1-based line number.
#[derive(Debug)]
pub struct ManifestReadError {
    /// Manifest path being read.
    pub path: PathBuf,
    /// 1-based line number the failure occurred at (0 if the file itself
    /// could not be opened).
    pub line: usize,
    source: ManifestReadErrorKind,
}

#[derive(Debug)]
enum ManifestReadErrorKind {
    Io(io::Error),
    Json(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for ManifestReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manifest read error in {} at line {}: ", self.path.display(), self.line)?;
        match &self.source {
            ManifestReadErrorKind::Io(err) => write!(f, "{}", err),
            ManifestReadErrorKind::Json(err) => write!(f, "invalid JSON: {}", err),
            ManifestReadErrorKind::NotAnObject => write!(f, "line is not a JSON object"),
        }
    }
}

impl error::Error for ManifestReadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.source {
            ManifestReadErrorKind::Io(err) => Some(err),
            ManifestReadErrorKind::Json(err) => Some(err),
            ManifestReadErrorKind::NotAnObject => None,
        }
    }
}

/// A manifest write failed, wrapping the underlying IO error.
#[derive(Debug)]
pub struct ManifestWriteError {
    /// Manifest path being written.
    pub path: PathBuf,
    source: io::Error,
}

impl fmt::Display for ManifestWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manifest write error in {}: {}", self.path.display(), self.source)
    }
}

impl error::Error for ManifestWriteError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_lines(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_records_skipping_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(dir.path(), "in.jsonl", "{\"a\":1}\n\n   \n{\"a\":2}\n");

        let records: Vec<Record> = ManifestReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("a"), Some(&json!(1)));
        assert_eq!(records[1].get("a"), Some(&json!(2)));
    }

    #[test]
    fn malformed_json_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(dir.path(), "in.jsonl", "{\"a\":1}\nnot json\n");

        let err = ManifestReader::open(&path)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();

        assert_eq!(err.line, 2);
    }

    #[test]
    fn writer_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");

        let mut writer = ManifestWriter::create(&path).unwrap();
        let mut record = Record::new();
        record.insert("a".to_owned(), json!(1));
        writer.write_record(&record).unwrap();
        writer.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\"a\":1}\n");
    }

    #[test]
    fn temp_step_path_is_namespaced() {
        let temp_dir = Path::new("/workspace/.tmp/abc123");
        assert_eq!(
            temp_step_path(temp_dir, 2),
            PathBuf::from("/workspace/.tmp/abc123/step_2.jsonl")
        );
    }
}
