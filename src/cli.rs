//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and then
//! passed (by reference) into the command handlers.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::{
    config::PartialConfig,
    error::{RestoreError, Result},
    secrets::SecretKeyRef,
};

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name    = "kubectl-db-restore",
    about   = "Restore a database from a backup by running sequential Kubernetes jobs",
    version,
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Cli {
    /// Path to the configuration file.
    ///
    /// Defaults to `restore.toml` in the current working directory; a missing
    /// file is fine.
    #[arg(short, long, default_value = "restore.toml")]
    pub config: PathBuf,

    /// Subcommand to run.  Omit to perform a restore.
    #[command(subcommand)]
    pub command: Option<Subcommand>,

    /// Database engine (clickhouse, postgres).
    #[arg(long)]
    pub engine: Option<String>,

    /// Name of the backup to restore from.
    #[arg(long)]
    pub backup_name: Option<String>,

    /// Database to drop, re-create and restore into.
    #[arg(long)]
    pub database: Option<String>,

    /// Kubernetes service name of the database server.
    #[arg(long)]
    pub service_name: Option<String>,

    /// Namespace the restore jobs are created in.
    #[arg(short, long, default_value = "default")]
    pub namespace: String,

    /// Resolve credentials and print the jobs that would run, without
    /// touching the cluster.
    #[arg(long)]
    pub dry_run: bool,

    /// Take a credential from a Kubernetes secret instead of the local
    /// environment: `VAR=secretName:key`.  Repeatable, or comma-separated.
    #[arg(long = "secret-ref", value_name = "VAR=SECRET:KEY", value_delimiter = ',')]
    pub secret_refs: Vec<String>,

    /// Give up on a job after this many seconds (default: wait forever).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between job status checks.
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// kubectl binary to use.
    #[arg(long)]
    pub kubectl: Option<String>,

    /// kubeconfig context to use.
    #[arg(long)]
    pub context: Option<String>,

    /// Path to the kubeconfig file.
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Print the merged configuration and exit.
    #[arg(long)]
    pub print_config: bool,

    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Explicit subcommands.
#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
pub enum Subcommand {
    /// Scaffold a `restore.toml` in the current directory.
    ///
    /// Exits with an error if the file already exists.
    Init,

    /// List the registered restore engines.
    Engines,
}

/// Validated restore arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreArgs {
    pub engine: String,
    pub backup_name: String,
    pub database: String,
    pub service_name: String,
    pub secret_refs: Vec<SecretKeyRef>,
}

impl Cli {
    /// Check the restore flags: all four required ones present and every
    /// `--secret-ref` well-formed.  Missing flags are reported together.
    pub fn restore_args(&self) -> Result<RestoreArgs> {
        let required = [
            ("--engine", &self.engine),
            ("--backup-name", &self.backup_name),
            ("--database", &self.database),
            ("--service-name", &self.service_name),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.as_deref().is_none_or(str::is_empty))
            .map(|(flag, _)| *flag)
            .collect();
        if !missing.is_empty() {
            return Err(RestoreError::configuration(format!(
                "missing required flag(s) to run restore: {}",
                missing.join(", ")
            )));
        }

        let secret_refs = self
            .secret_refs
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<SecretKeyRef>>>()?;

        Ok(RestoreArgs {
            engine: self.engine.clone().unwrap_or_default(),
            backup_name: self.backup_name.clone().unwrap_or_default(),
            database: self.database.clone().unwrap_or_default(),
            service_name: self.service_name.clone().unwrap_or_default(),
            secret_refs,
        })
    }

    /// Config overrides given on the command line.
    pub fn config_overrides(&self) -> PartialConfig {
        let mut p = PartialConfig::default();
        p.cluster.kubectl = self.kubectl.clone();
        p.cluster.context = self.context.clone();
        p.cluster.kubeconfig = self.kubeconfig.clone();
        p.watch.timeout_secs = self.timeout;
        p.watch.poll_interval_secs = self.poll_interval;
        p
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
