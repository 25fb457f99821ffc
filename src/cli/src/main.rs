//! `minidp`: the run/preview/validate/list-processors command-line front
//! end (spec.md §6).

mod cli;
mod recipe_io;
mod stdout_layer;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command, PreviewArgs, RunArgs, ValidateArgs};
use minidp_core::CancellationToken;
use minidp_registry::Registry;
use minidp_runner::{PipelineRunner, RunOptions};
use std::process::ExitCode;
use stdout_layer::StdoutLinesLayer;
use tracing_subscriber::prelude::*;

fn main() -> ExitCode {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        );
    tracing_subscriber::registry()
        .with(StdoutLinesLayer)
        .with(fmt_layer)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Run(run_args) => cmd_run(run_args),
        Command::Preview(preview_args) => cmd_preview(preview_args),
        Command::Validate(validate_args) => cmd_validate(validate_args),
        Command::ListProcessors => cmd_list_processors(),
    };

    match result {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

fn registry() -> Registry {
    let registry = Registry::new();
    minidp_processors::register_builtins(&registry);
    registry
}

fn install_cancel_handler(cancel: CancellationToken) {
    let handler_token = cancel;
    // best-effort: if a handler is already installed (shouldn't happen in
    // the `minidp` binary) we just keep running without SIGINT support.
    let _ = ctrlc::set_handler(move || {
        tracing::warn!("received interrupt signal, cancelling the run");
        handler_token.cancel();
    });
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let recipe = recipe_io::load_recipe(&args.recipe)?;
    let registry = registry();
    let runner = PipelineRunner::new(&registry);

    let cancel = CancellationToken::new();
    install_cancel_handler(cancel.clone());

    let options = RunOptions {
        workspace_override: args.workspace,
        keep_temps: args.keep_temps,
        cancel,
    };

    let summary = runner.run(&recipe, &options)?;
    println!("Output: {}", summary.output.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> Result<()> {
    let recipe = recipe_io::load_recipe(&args.recipe)?;
    let registry = registry();
    let runner = PipelineRunner::new(&registry);

    let cancel = CancellationToken::new();
    install_cancel_handler(cancel.clone());

    let options = RunOptions {
        workspace_override: args.workspace,
        keep_temps: args.keep_temps,
        cancel,
    };

    let (summary, preview) = runner.preview_recipe(&recipe, args.n, &options)?;
    for record in &preview {
        println!("{}", serde_json::Value::Object(record.clone()));
    }
    println!("Output: {}", summary.output.display());
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let recipe = recipe_io::load_recipe(&args.recipe)?;
    recipe.validate()?;
    recipe.selected_range()?;
    println!("recipe is valid");
    Ok(())
}

fn cmd_list_processors() -> Result<()> {
    let registry = registry();
    for (name, description) in registry.list() {
        println!("{} - {}", name, description);
    }
    Ok(())
}
