//! Error kinds owned by the registry: failing to find or construct a
//! processor for a recipe step's `type` (spec.md §7).

use std::{error, fmt};

/// A step's `type` resolved to nothing: neither a registered short name
/// nor, if dotted, an entry in the host-populated dotted-path registry.
#[derive(Debug)]
pub struct UnknownProcessorError {
    /// The unresolved `type` string.
    pub name: String,
}

impl UnknownProcessorError {
    /// Construct an error for the given unresolved name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for UnknownProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown processor type {:?}: neither registered nor importable",
            self.name
        )
    }
}

impl error::Error for UnknownProcessorError {}

/// A processor's constructor rejected the params a recipe step supplied.
#[derive(Debug)]
pub struct ProcessorConstructionError {
    /// The processor's name.
    pub processor: String,
    /// Path to the offending field within `params` (e.g. `fields_to_drop`).
    pub param_path: String,
    source: Box<dyn error::Error + Send + Sync>,
}

impl ProcessorConstructionError {
    /// Construct a new error naming the processor and offending param path.
    pub fn new(
        processor: impl Into<String>,
        param_path: impl Into<String>,
        source: impl Into<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            processor: processor.into(),
            param_path: param_path.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for ProcessorConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processor {:?} rejected params at {:?}: {}",
            self.processor, self.param_path, self.source
        )
    }
}

impl error::Error for ProcessorConstructionError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Everything [`crate::Registry::resolve`] can fail with.
///
/// Not intended to be exhaustively matched; new variants may be added
/// without a major version bump.
#[derive(Debug)]
pub enum RegistryError {
    /// See [`UnknownProcessorError`].
    Unknown(UnknownProcessorError),
    /// See [`ProcessorConstructionError`].
    Construction(ProcessorConstructionError),

    #[doc(hidden)]
    __Unknown,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Unknown(err) => write!(f, "{}", err),
            RegistryError::Construction(err) => write!(f, "{}", err),
            RegistryError::__Unknown => unreachable!(),
        }
    }
}

impl error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RegistryError::Unknown(err) => Some(err),
            RegistryError::Construction(err) => Some(err),
            RegistryError::__Unknown => unreachable!(),
        }
    }
}

impl From<UnknownProcessorError> for RegistryError {
    fn from(err: UnknownProcessorError) -> Self {
        RegistryError::Unknown(err)
    }
}

impl From<ProcessorConstructionError> for RegistryError {
    fn from(err: ProcessorConstructionError) -> Self {
        RegistryError::Construction(err)
    }
}
