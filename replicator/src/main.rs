//! Replicator binary.
//!
//! Applies change stream events from a file or from stdin to the configured destination table,
//! and runs backfills that make the change stream replay items written before the migration
//! started.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ::config::shared::ReplicatorConfig;
use telemetry::{init_metrics, init_tracing};
use tracing::{error, info};

use crate::config::load_replicator_config;
use crate::core::{EventSource, start_backfill_with_config, start_replicator_with_config};
use crate::error::{ReplicatorError, ReplicatorResult};

mod config;
mod core;
mod error;

#[derive(Parser)]
#[command(name = "replicator", about = "Migrates change stream events between tables")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a single stream event stored as JSON
    Apply {
        /// Path of the stream event file
        #[arg(long)]
        event: PathBuf,
    },
    /// Process newline-delimited stream events read from stdin
    Stream,
    /// Stamp source items so that the change stream replays them
    Backfill {
        /// `last_evaluated_key` printed by a previous backfill, as JSON
        #[arg(long)]
        start_key: Option<String>,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprint!("{}", err.render_report());
        std::process::exit(1);
    }
}

fn run(args: Args) -> ReplicatorResult<()> {
    let replicator_config = load_replicator_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(ReplicatorError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args.command, replicator_config))
}

async fn async_main(command: Command, replicator_config: ReplicatorConfig) -> ReplicatorResult<()> {
    // The exporter listener runs on the runtime.
    if let Some(port) = replicator_config.metrics_port {
        init_metrics(env!("CARGO_BIN_NAME"), port).map_err(ReplicatorError::config)?;
        info!(port, "metrics exporter listening");
    }

    let result = match command {
        Command::Apply { event } => {
            start_replicator_with_config(replicator_config, EventSource::File(event)).await
        }
        Command::Stream => {
            start_replicator_with_config(replicator_config, EventSource::Stdin).await
        }
        Command::Backfill { start_key } => {
            start_backfill_with_config(replicator_config, start_key).await
        }
    };

    if let Err(err) = &result {
        error!("{err}");
    }

    result
}
