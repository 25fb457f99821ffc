//! The [`RunContext`], created once per pipeline run and handed to every
//! processor in that run.

use rand::Rng;
use std::path::{Path, PathBuf};
use std::{error, fmt, io};
use tracing::Span;

/// A short random hex run id, used to namespace temp directories and to
/// prefix log lines (spec.md §6).
fn generate_run_id() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| format!("{:x}", rng.gen_range(0..16u8)))
        .collect()
}

/// Per-run immutable state shared across every step and processor in a
/// single pipeline run.
///
/// A `RunContext` is created at the start of a run and dropped at the end.
/// It is never mutated by processors; the workspace/temp paths it carries
/// are resolved once by the runner (spec.md §4.6 "Resolved paths are
/// locked before any step runs").
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    workspace_dir: PathBuf,
    temp_dir: PathBuf,
    span: Span,
}

impl RunContext {
    /// Create a new run context rooted at `workspace_dir`.
    ///
    /// The temp directory itself is not created here — it is allocated
    /// lazily on first use per spec.md §4.6 ("created lazily on first temp
    /// path allocation").
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        let run_id = generate_run_id();
        let workspace_dir = workspace_dir.into();
        let temp_dir = workspace_dir.join(".tmp").join(&run_id);
        let span = tracing::info_span!("run", run_id = %run_id);

        Self {
            run_id,
            workspace_dir,
            temp_dir,
            span,
        }
    }

    /// The run's short random hex id.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The run's active workspace directory.
    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// The run's temp directory (`{workspace}/.tmp/{run_id}`), creating it
    /// on disk if this is the first call.
    pub fn temp_dir(&self) -> Result<&Path, ContextError> {
        if !self.temp_dir.exists() {
            std::fs::create_dir_all(&self.temp_dir)?;
        }
        Ok(&self.temp_dir)
    }

    /// The tracing span every log line emitted for this run should nest
    /// under, so that `run_id` appears as a structured field.
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Remove the temp directory, if it was created. Called by the runner
    /// on successful completion unless `keep_temps` is set (spec.md §4.6).
    pub fn remove_temp_dir(&self) -> Result<(), ContextError> {
        if self.temp_dir.exists() {
            std::fs::remove_dir_all(&self.temp_dir)?;
        }
        Ok(())
    }
}

/// Represents the ways a [`RunContext`] operation can fail.
///
/// This type is not intended to be exhaustively matched; new variants may
/// be added in the future without a major version bump.
#[derive(Debug)]
pub enum ContextError {
    /// An error occurred during IO activities.
    Io(io::Error),

    #[doc(hidden)]
    __Unknown,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ContextError::Io(ref err) => write!(f, "IO error: {}", err),
            ContextError::__Unknown => unreachable!(),
        }
    }
}

impl error::Error for ContextError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ContextError::Io(ref err) => Some(err),
            ContextError::__Unknown => unreachable!(),
        }
    }
}

impl From<io::Error> for ContextError {
    fn from(err: io::Error) -> Self {
        ContextError::Io(err)
    }
}
