//! Recipe validation errors, and the top-level [`RunError`] every
//! `minidp-runner` operation can fail with (spec.md §7).

use minidp_core::{
    CancelledError, ContextError, ManifestReadError, ManifestWriteError, ProcessorExecutionError,
};
use minidp_registry::RegistryError;
use std::{error, fmt};

/// A recipe failed validation: a schema or slice-expression violation at a
/// specific JSON path (e.g. `steps[2].type`).
#[derive(Debug)]
pub struct RecipeValidationError {
    /// Path to the offending field, e.g. `"steps[2].type"`.
    pub path: String,
    /// Human-readable explanation.
    pub message: String,
}

impl RecipeValidationError {
    /// Construct a new validation error.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RecipeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid recipe at {:?}: {}", self.path, self.message)
    }
}

impl error::Error for RecipeValidationError {}

/// A processor's `process` (or `prepare`/`finalize`) returned an error that
/// is not one of the other typed kinds `minidp-core` already distinguishes.
#[derive(Debug)]
pub struct StepFailedError {
    /// The step's id (or `step_{index}` default).
    pub step_id: String,
    source: Box<dyn error::Error + Send + Sync>,
}

impl StepFailedError {
    /// Construct a new error naming the step and its underlying cause.
    pub fn new(step_id: impl Into<String>, source: Box<dyn error::Error + Send + Sync>) -> Self {
        Self {
            step_id: step_id.into(),
            source,
        }
    }
}

impl fmt::Display for StepFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {:?} failed: {}", self.step_id, self.source)
    }
}

impl error::Error for StepFailedError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Everything a pipeline run can fail with (spec.md §7).
///
/// Not intended to be exhaustively matched; new variants may be added
/// without a major version bump.
#[derive(Debug)]
pub enum RunError {
    /// See [`RecipeValidationError`].
    Validation(RecipeValidationError),
    /// The step's `type` could not be resolved, or its params were
    /// rejected; see [`RegistryError`].
    Registry(RegistryError),
    /// See [`minidp_core::ManifestReadError`].
    Read(ManifestReadError),
    /// See [`minidp_core::ManifestWriteError`].
    Write(ManifestWriteError),
    /// See [`minidp_core::ProcessorExecutionError`].
    Execution(ProcessorExecutionError),
    /// See [`minidp_core::CancelledError`].
    Cancelled(CancelledError),
    /// A step failed with some other boxed error (e.g. from a custom
    /// `prepare`/`finalize` hook, or a self-test mismatch).
    Step(StepFailedError),
    /// A run-context operation (temp directory creation/removal) failed.
    Context(ContextError),

    #[doc(hidden)]
    __Unknown,
}

impl RunError {
    /// Wrap a step's boxed process/prepare/finalize error, recovering one
    /// of the known kinds by downcasting where possible so callers can
    /// match on `RunError::Cancelled`/`RunError::Execution` without caring
    /// that the underlying error crossed an object-safe trait boundary.
    pub fn from_step_error(
        step_id: impl Into<String>,
        err: Box<dyn error::Error + Send + Sync>,
    ) -> Self {
        let err = match err.downcast::<ProcessorExecutionError>() {
            Ok(err) => return RunError::Execution(*err),
            Err(err) => err,
        };
        let err = match err.downcast::<CancelledError>() {
            Ok(err) => return RunError::Cancelled(*err),
            Err(err) => err,
        };
        let err = match err.downcast::<ManifestReadError>() {
            Ok(err) => return RunError::Read(*err),
            Err(err) => err,
        };
        let err = match err.downcast::<ManifestWriteError>() {
            Ok(err) => return RunError::Write(*err),
            Err(err) => err,
        };

        RunError::Step(StepFailedError::new(step_id, err))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Validation(err) => write!(f, "{}", err),
            RunError::Registry(err) => write!(f, "{}", err),
            RunError::Read(err) => write!(f, "{}", err),
            RunError::Write(err) => write!(f, "{}", err),
            RunError::Execution(err) => write!(f, "{}", err),
            RunError::Cancelled(err) => write!(f, "{}", err),
            RunError::Step(err) => write!(f, "{}", err),
            RunError::Context(err) => write!(f, "{}", err),
            RunError::__Unknown => unreachable!(),
        }
    }
}

impl error::Error for RunError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RunError::Validation(err) => Some(err),
            RunError::Registry(err) => Some(err),
            RunError::Read(err) => Some(err),
            RunError::Write(err) => Some(err),
            RunError::Execution(err) => Some(err),
            RunError::Cancelled(err) => Some(err),
            RunError::Step(err) => Some(err),
            RunError::Context(err) => Some(err),
            RunError::__Unknown => unreachable!(),
        }
    }
}

impl From<ContextError> for RunError {
    fn from(err: ContextError) -> Self {
        RunError::Context(err)
    }
}

impl From<RecipeValidationError> for RunError {
    fn from(err: RecipeValidationError) -> Self {
        RunError::Validation(err)
    }
}

impl From<RegistryError> for RunError {
    fn from(err: RegistryError) -> Self {
        RunError::Registry(err)
    }
}

impl From<ManifestReadError> for RunError {
    fn from(err: ManifestReadError) -> Self {
        RunError::Read(err)
    }
}

impl From<ManifestWriteError> for RunError {
    fn from(err: ManifestWriteError) -> Self {
        RunError::Write(err)
    }
}
