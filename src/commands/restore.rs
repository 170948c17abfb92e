//! Default command: restore a database.
//!
//! # Steps
//!
//! | # | Step                | Fails with                                  |
//! |---|---------------------|---------------------------------------------|
//! | 1 | Validate flags      | missing flag, malformed `--secret-ref`      |
//! | 2 | Look up the engine  | unknown engine                              |
//! | 3 | Engine restore      | credentials, submission, job failure, ...   |
//!
//! Steps 1 and 2 never touch the cluster.  Step 3 is the engine's business:
//! it resolves credentials, builds its phases and either prints them
//! (`--dry-run`) or runs them one after another.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::{
    cli::{Cli, RestoreArgs},
    cluster::{JobBackend, Kubectl},
    config::Config,
    engine::{RestoreContext, RestoreOptions, RestoreTarget},
    error::Result,
    orchestrator::Orchestrator,
    registry::EngineRegistry,
    wait::{CancelToken, Clock, SystemClock},
};

/// Restore using the real cluster, wall clock and process environment.
pub fn run(cli: &Cli, cfg: &Config, registry: &EngineRegistry, cancel: CancelToken) -> Result<()> {
    let args = cli.restore_args()?;
    let backend = Kubectl::from_config(&cfg.cluster);
    let env = |name: &str| std::env::var(name).ok();

    run_with(
        &args,
        &cli.namespace,
        cli.dry_run,
        cfg,
        registry,
        Collaborators {
            backend: &backend,
            clock: &SystemClock,
            env: &env,
            cancel,
            run_id: run_timestamp(),
        },
    )
}

/// Everything a restore touches outside this process.
pub struct Collaborators<'a> {
    pub backend: &'a dyn JobBackend,
    pub clock: &'a dyn Clock,
    pub env: &'a dyn Fn(&str) -> Option<String>,
    pub cancel: CancelToken,
    pub run_id: u64,
}

pub fn run_with(
    args: &RestoreArgs,
    namespace: &str,
    dry_run: bool,
    cfg: &Config,
    registry: &EngineRegistry,
    with: Collaborators<'_>,
) -> Result<()> {
    let engine = registry.get(&args.engine)?;

    info!(
        engine = engine.name(),
        database = %args.database,
        backup = %args.backup_name,
        namespace,
        dry_run,
        "restoring database"
    );

    let target = RestoreTarget {
        backup_name: args.backup_name.clone(),
        database: args.database.clone(),
    };
    let opts = RestoreOptions {
        namespace: namespace.into(),
        service_name: args.service_name.clone(),
        dry_run,
        secret_refs: args.secret_refs.clone(),
    };
    let ctx = RestoreContext {
        orchestrator: Orchestrator::new(with.backend, with.clock, with.cancel, cfg.watch.policy()),
        env: with.env,
        run_id: with.run_id,
    };

    engine.restore(&target, &opts, &ctx)
}

/// Seconds since the epoch; the base of this run's job-name suffixes.
fn run_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
