//! A `tracing` layer that prints a tracing event's `stdout` field
//! verbatim to stdout, bypassing the env-filter/fmt layer entirely
//! (spec.md §6, SPEC_FULL.md "literal, user-facing log lines... written
//! directly to stdout by the CLI").

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Installed alongside the regular `fmt` layer. Only events carrying a
/// `stdout` field produce output here; everything else passes through
/// untouched for the `fmt` layer to format (or drop, per `RUST_LOG`).
pub struct StdoutLinesLayer;

impl<S: Subscriber> Layer<S> for StdoutLinesLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = StdoutFieldVisitor(None);
        event.record(&mut visitor);
        if let Some(line) = visitor.0 {
            println!("{}", line);
        }
    }
}

struct StdoutFieldVisitor(Option<String>);

impl Visit for StdoutFieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "stdout" {
            self.0 = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "stdout" && self.0.is_none() {
            self.0 = Some(format!("{:?}", value));
        }
    }
}
