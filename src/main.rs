//! tasktree - task hierarchy client CLI
//!
//! Shows the task list of a remote task API as a tree with status summaries,
//! and issues create, update and delete requests against it.

use clap::Parser;
use tasktree::cli::Cli;
use tasktree::output::emit_error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter from `RUST_LOG`; logging stays off when it is unset or unusable.
fn log_filter() -> EnvFilter {
    match std::env::var("RUST_LOG") {
        Ok(raw) if !raw.trim().is_empty() && raw.len() <= 4096 => {
            EnvFilter::try_new(raw.trim()).unwrap_or_else(|_| EnvFilter::new("off"))
        }
        _ => EnvFilter::new("off"),
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter())
        .init();

    let cli = Cli::parse();
    let command = cli.command.name();
    // Stdout belongs to the event stream when `--events -` is given.
    let json = cli.json && !cli.events_to_stdout();

    if let Err(err) = cli.run() {
        let _ = emit_error(command, &err, json);
        std::process::exit(err.exit_code());
    }
}
