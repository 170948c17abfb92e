//! `kubectl-db-restore`: restore a database inside Kubernetes from a backup.
//!
//! # Overview
//!
//! A restore is a short, fixed sequence of Kubernetes Jobs (for ClickHouse:
//! drop the database, create it again, restore it from S3).  Each job runs one
//! shell script to completion; the next job is created only after the previous
//! one succeeded.  The first failure stops the run.
//!
//! Installed on `PATH`, the binary is picked up by kubectl as a plugin:
//!
//! ```text
//! kubectl db-restore --engine clickhouse --backup-name nightly \
//!     --database events --service-name clickhouse -n data
//! kubectl db-restore ... --dry-run                  # print the plan only
//! kubectl db-restore ... --secret-ref CLICKHOUSE_PASSWORD=ch:password
//! kubectl db-restore engines                        # list engines
//! kubectl db-restore init                           # scaffold restore.toml
//! ```
//!
//! # Module layout
//!
//! | Module                   | Responsibility                                  |
//! |--------------------------|-------------------------------------------------|
//! | [`cli`]                  | Argument types parsed by clap                   |
//! | [`config`]               | `Config` + TOML loader with global/local merge  |
//! | [`error`]                | `RestoreError` taxonomy                         |
//! | [`secrets`]              | `--secret-ref` parsing, credential resolution   |
//! | [`registry`]             | Engine lookup by name                           |
//! | [`engine`]               | Engine trait, plans, ClickHouse and Postgres    |
//! | [`job`]                  | Job specs and their Kubernetes manifests        |
//! | [`cluster`]              | `JobBackend` trait and the kubectl backend      |
//! | [`wait`]                 | Cancellable poll loop with injectable clock     |
//! | [`orchestrator`]         | Submit, watch, run phases in order              |
//! | [`ui`]                   | Spinner, phase lines, failure banner            |
//! | [`commands`]             | `init`, `engines`, default restore              |

mod cli;
mod cluster;
mod commands;
mod config;
mod engine;
mod error;
mod job;
mod orchestrator;
mod registry;
mod secrets;
mod ui;
mod wait;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Subcommand};
use error::RestoreError;
use registry::EngineRegistry;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wait::CancelToken;

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| exit_on_usage_error(&e));
    init_logging(cli.verbose);

    match &cli.command {
        // ── init ──────────────────────────────────────────────────────────────
        Some(Subcommand::Init) => {
            commands::init::run(&cli.config)?;
        },

        // ── engines ───────────────────────────────────────────────────────────
        Some(Subcommand::Engines) => {
            let cfg = load_config(&cli)?;
            commands::engines::run(&EngineRegistry::builtin(&cfg.images));
        },

        // ── restore (default) ─────────────────────────────────────────────────
        None => {
            let cfg = load_config(&cli)?;

            if cli.print_config {
                println!("{cfg:#?}");
                return Ok(());
            }

            let registry = EngineRegistry::builtin(&cfg.images);
            if let Err(e) = commands::restore::run(&cli, &cfg, &registry, cancel_on_ctrl_c()) {
                match e.root() {
                    RestoreError::Cancelled { .. } | RestoreError::TimedOut { .. } => {
                        ui::print_failure(
                            "Restore interrupted; the current job may still be running in the cluster.",
                        );
                    },
                    _ => ui::print_failure("Restore failed."),
                }
                return Err(e.into());
            }
        },
    }

    Ok(())
}

/// Print clap's message and exit: 0 for `--help` and `--version`, 1 for any
/// usage error so every failure shares one exit code.
fn exit_on_usage_error(e: &clap::Error) -> ! {
    let _ = e.print();
    std::process::exit(if e.use_stderr() { 1 } else { 0 });
}

/// Global config, then `--config`, then command-line overrides.
fn load_config(cli: &Cli) -> Result<config::Config> {
    let global = config::global_config_path();
    config::load_merged(global.as_deref(), &cli.config, cli.config_overrides())
}

/// Logs go to stderr.  `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kubectl_db_restore={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// A token that Ctrl-C sets.  The run stops at the next poll or before the
/// next phase; a job already created keeps running in the cluster.
fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let handler = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        warn!("could not install Ctrl-C handler: {e}");
    }
    token
}
