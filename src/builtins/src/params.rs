//! Shared params-parsing helper for every built-in's constructor.

use minidp_registry::ProcessorConstructionError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize `params` into `T`, wrapping any failure into a
/// [`ProcessorConstructionError`] naming `processor`.
///
/// All of `minidp-processors`' built-ins accept a single flat params
/// object, so `"params"` is a precise enough path for every one of them;
/// a processor with nested/optional sub-fields could report a finer path
/// by handling its own `serde_json::from_value` call instead of using
/// this helper.
pub(crate) fn parse<T: DeserializeOwned>(
    processor: &str,
    params: Value,
) -> Result<T, ProcessorConstructionError> {
    serde_json::from_value(params)
        .map_err(|err| ProcessorConstructionError::new(processor, "params", err))
}
