//! The process-wide processor registry (spec.md §4.2): a name →
//! constructor map for built-ins, plus a second, host-populated map that
//! stands in for dotted import-path resolution.
//!
//! Rust has no runtime module loader, so the "dynamically resolve a
//! dotted path" fallback in spec.md §9 degrades to exactly what that
//! section allows: "look up the name in a secondary registry populated
//! by the host". By the time a run executes, all built-ins have been
//! registered under their short names by `minidp-processors`; a host
//! embedding MiniDP may additionally populate the dotted registry with
//! its own processors at startup.

#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;

pub use error::{ProcessorConstructionError, RegistryError, UnknownProcessorError};

use minidp_core::{
    CommonMapParams, ConfiguredMapProcessor, MapProcessor, MapProcessorAdapter,
    MapProcessorFactory, Processor,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Builds a [`Processor`] from a step's `params`, or fails with
/// [`ProcessorConstructionError`].
pub type Constructor =
    dyn Fn(Value) -> Result<Box<dyn Processor>, ProcessorConstructionError> + Send + Sync;

/// Builds a [`MapProcessor`] from a step's `params`.
pub type MapConstructor =
    dyn Fn(Value) -> Result<Box<dyn MapProcessor>, ProcessorConstructionError> + Send + Sync;

struct Entry {
    description: String,
    construct: Arc<Constructor>,
}

/// A process-wide processor registry (spec.md §4.2).
///
/// Lookup (`resolve`) needs no external synchronization. Registration
/// (`register`/`register_map_processor`/`register_dotted`) serializes
/// through an internal mutex (spec.md §5 "dynamic registrations
/// serialize with an internal mutex").
#[derive(Default)]
pub struct Registry {
    named: Mutex<HashMap<String, Entry>>,
    dotted: Mutex<HashMap<String, Entry>>,
}

impl Registry {
    /// An empty registry. Built-ins are not pre-registered; call
    /// `minidp_processors::register_builtins` (or equivalent) before
    /// resolving any recipe step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a general [`Processor`] constructor under a short name.
    /// A later call with the same `name` replaces the earlier one.
    pub fn register(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        construct: impl Fn(Value) -> Result<Box<dyn Processor>, ProcessorConstructionError>
            + Send
            + Sync
            + 'static,
    ) {
        self.named.lock().unwrap().insert(
            name.into(),
            Entry {
                description: description.into(),
                construct: Arc::new(construct),
            },
        );
    }

    /// Register a [`MapProcessor`] constructor under a short name,
    /// adapting it into a [`Processor`] via [`MapProcessorAdapter`].
    ///
    /// Before calling `construct`, the three params every `MapProcessor`
    /// recognizes (`max_workers`, `in_memory_chunksize`, `test_cases` --
    /// spec.md §4.3 table) are parsed out of the same raw `params` value
    /// and applied as a [`ConfiguredMapProcessor`] override, so
    /// `construct`'s own params struct never needs to know about them.
    ///
    /// The parallel engine reconstructs one fresh instance per worker
    /// (spec.md §4.4, §9 "Worker isolation") by calling `construct`
    /// again with the same params, so `construct` must be deterministic:
    /// it must succeed (or fail) the same way for a given `params` value
    /// every time it's called.
    pub fn register_map_processor(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        construct: impl Fn(Value) -> Result<Box<dyn MapProcessor>, ProcessorConstructionError>
            + Send
            + Sync
            + 'static,
    ) {
        let name: String = name.into();
        let construct: Arc<MapConstructor> = Arc::new(construct);
        let wrapped: Arc<Constructor> = {
            let construct = Arc::clone(&construct);
            let name = name.clone();
            Arc::new(move |params: Value| {
                let common = CommonMapParams::parse(&params)
                    .map_err(|err| ProcessorConstructionError::new(name.clone(), "params", err))?;
                let instance = construct(params.clone())?;
                let instance: Box<dyn MapProcessor> =
                    Box::new(ConfiguredMapProcessor::new(instance, &common));

                let construct = Arc::clone(&construct);
                let common_for_factory = common.clone();
                let factory: Box<MapProcessorFactory> = Box::new(move || {
                    let inner = construct(params.clone())
                        .expect("map processor constructor is deterministic over identical params");
                    Box::new(ConfiguredMapProcessor::new(inner, &common_for_factory))
                        as Box<dyn MapProcessor>
                });

                Ok(Box::new(MapProcessorAdapter::new(instance, factory)) as Box<dyn Processor>)
            })
        };

        self.named.lock().unwrap().insert(
            name,
            Entry {
                description: description.into(),
                construct: wrapped,
            },
        );
    }

    /// Register a constructor for a dotted import-path name, standing in
    /// for dynamic module resolution (spec.md §9).
    pub fn register_dotted(
        &self,
        path: impl Into<String>,
        description: impl Into<String>,
        construct: impl Fn(Value) -> Result<Box<dyn Processor>, ProcessorConstructionError>
            + Send
            + Sync
            + 'static,
    ) {
        self.dotted.lock().unwrap().insert(
            path.into(),
            Entry {
                description: description.into(),
                construct: Arc::new(construct),
            },
        );
    }

    /// Resolve `type_name` and construct it with `params`.
    ///
    /// Lookup order (spec.md §4.2): a registered short name wins first;
    /// if `type_name` contains a dot, the dotted registry is tried next;
    /// otherwise [`UnknownProcessorError`].
    pub fn resolve(
        &self,
        type_name: &str,
        params: Value,
    ) -> Result<Box<dyn Processor>, RegistryError> {
        if let Some(entry) = self.named.lock().unwrap().get(type_name) {
            return (entry.construct)(params).map_err(RegistryError::from);
        }

        if type_name.contains('.') {
            if let Some(entry) = self.dotted.lock().unwrap().get(type_name) {
                return (entry.construct)(params).map_err(RegistryError::from);
            }
        }

        Err(RegistryError::from(UnknownProcessorError::new(type_name)))
    }

    /// The registered short names and their one-line descriptions,
    /// sorted by name, for `list-processors` (see SPEC_FULL.md's
    /// supplemental CLI detail).
    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .named
            .lock()
            .unwrap()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.description.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minidp_core::{CancellationToken, DataEntry, Record, RunContext};
    use serde_json::{json, Value};
    use std::path::Path;

    struct Echo;
    impl MapProcessor for Echo {
        fn name(&self) -> &str {
            "Echo"
        }
        fn process_record(&mut self, record: Record) -> Vec<DataEntry> {
            vec![DataEntry::record(record)]
        }
    }

    fn run_with(
        processor: &mut dyn Processor,
        input_contents: &str,
    ) -> (minidp_core::RunStats, String) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        std::fs::write(&input, input_contents).unwrap();
        let output = dir.path().join("out.jsonl");
        let ctx = RunContext::new(dir.path());
        let cancel = CancellationToken::new();

        let stats = processor
            .process(&ctx, &cancel, &input, &output)
            .unwrap();
        let contents = std::fs::read_to_string(&output).unwrap();
        (stats, contents)
    }

    #[test]
    fn resolves_registered_short_name() {
        let registry = Registry::new();
        registry.register_map_processor("Echo", "passes records through unchanged", |_params| {
            Ok(Box::new(Echo) as Box<dyn MapProcessor>)
        });

        let mut processor = registry.resolve("Echo", json!({})).unwrap();
        let (stats, contents) = run_with(processor.as_mut(), "{\"a\":1}\n");
        assert_eq!(stats.r#in, 1);
        assert_eq!(contents, "{\"a\":1}\n");
    }

    #[test]
    fn unknown_name_fails() {
        let registry = Registry::new();
        let err = registry.resolve("NoSuchProcessor", json!({})).unwrap_err();
        assert!(matches!(err, RegistryError::Unknown(_)));
    }

    #[test]
    fn short_name_wins_over_colliding_dotted_path() {
        let registry = Registry::new();
        registry.register_map_processor("pkg.Echo", "short-name version", |_params| {
            Ok(Box::new(Echo) as Box<dyn MapProcessor>)
        });
        registry.register_dotted("pkg.Echo", "dotted version", |params| {
            struct Tagged(Value);
            impl Processor for Tagged {
                fn name(&self) -> &str {
                    "Tagged"
                }
                fn process(
                    &mut self,
                    _ctx: &RunContext,
                    _cancel: &CancellationToken,
                    _input: &Path,
                    _output: &Path,
                ) -> Result<minidp_core::RunStats, minidp_core::BoxedError> {
                    unreachable!("dotted constructor should not win over a colliding short name")
                }
            }
            Ok(Box::new(Tagged(params)) as Box<dyn Processor>)
        });

        let mut processor = registry.resolve("pkg.Echo", json!({})).unwrap();
        let (stats, _) = run_with(processor.as_mut(), "{\"a\":1}\n");
        assert_eq!(stats.r#in, 1);
    }

    #[test]
    fn dotted_path_resolves_when_not_shadowed() {
        let registry = Registry::new();
        registry.register_dotted("my_pkg.processors.Echo", "a host processor", |_params| {
            Ok(Box::new(Echo) as Box<dyn MapProcessor>)
        });

        registry
            .resolve("my_pkg.processors.Echo", json!({}))
            .unwrap();
        assert!(registry.resolve("my_pkg.processors.Missing", json!({})).is_err());
    }

    #[test]
    fn list_returns_sorted_descriptions() {
        let registry = Registry::new();
        registry.register_map_processor("Zeta", "last alphabetically", |_| {
            Ok(Box::new(Echo) as Box<dyn MapProcessor>)
        });
        registry.register_map_processor("Alpha", "first alphabetically", |_| {
            Ok(Box::new(Echo) as Box<dyn MapProcessor>)
        });

        let listed = registry.list();
        assert_eq!(
            listed,
            vec![
                ("Alpha".to_owned(), "first alphabetically".to_owned()),
                ("Zeta".to_owned(), "last alphabetically".to_owned()),
            ]
        );
    }
}
