//! Restore engines: one per database technology.
//!
//! | Engine        | Status                                           |
//! |---------------|--------------------------------------------------|
//! | `clickhouse`  | drop → create → restore from S3                  |
//! | `postgres`    | placeholder, reports "not implemented"           |
//!
//! An engine declares the credentials its scripts read, builds an ordered
//! [`RestorePlan`] of shell jobs, and hands it to [`carry_out`], which either
//! prints the plan (dry run) or runs it through the orchestrator.

pub mod clickhouse;
pub mod postgres;

use tracing::info;

use crate::{
    error::{RestoreError, Result},
    job::JobSpec,
    orchestrator::Orchestrator,
    secrets::{self, Bindings, SecretKeyRef},
    ui,
};

pub use clickhouse::ClickhouseEngine;
pub use postgres::PostgresEngine;

// ─── Inputs ───────────────────────────────────────────────────────────────────

/// What to restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTarget {
    pub backup_name: String,
    pub database: String,
}

/// How and where to restore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub namespace: String,
    /// Cluster service the jobs connect to.
    pub service_name: String,
    pub dry_run: bool,
    pub secret_refs: Vec<SecretKeyRef>,
}

/// Environment lookup used for credentials not given as secret references.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Per-run collaborators shared by every engine.
pub struct RestoreContext<'a> {
    pub orchestrator: Orchestrator<'a>,
    pub env: EnvLookup<'a>,
    /// Base for job-name suffixes; phase `i` uses `run_id + i`.
    pub run_id: u64,
}

impl RestoreContext<'_> {
    /// Resolve `required` against `opts.secret_refs` and the environment.
    pub fn resolve(&self, required: &[&str], opts: &RestoreOptions) -> Result<Bindings> {
        secrets::resolve(required, &opts.secret_refs, &opts.namespace, |name| {
            (self.env)(name)
        })
    }
}

// ─── Engine trait ─────────────────────────────────────────────────────────────

pub trait Engine {
    /// Registry key, as typed after `--engine`.
    fn name(&self) -> &'static str;

    fn restore(
        &self,
        target: &RestoreTarget,
        opts: &RestoreOptions,
        ctx: &RestoreContext<'_>,
    ) -> Result<()>;
}

// ─── Plan ─────────────────────────────────────────────────────────────────────

/// One phase of a plan: the job plus a human description for dry runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub description: String,
    pub job: JobSpec,
}

/// Resolved credentials plus the ordered phases built from them.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub engine: &'static str,
    pub bindings: Bindings,
    pub phases: Vec<Phase>,
}

impl RestorePlan {
    pub fn jobs(&self) -> Vec<JobSpec> {
        self.phases.iter().map(|p| p.job.clone()).collect()
    }

    /// Lines describing what a real run would do.  Literal credential values
    /// are never included.
    pub fn dry_run_report(&self, target: &RestoreTarget, opts: &RestoreOptions) -> Vec<String> {
        let mut lines = vec![
            format!("Engine:          {}", self.engine),
            format!("Target database: {}", target.database),
            format!("Backup source:   {}", target.backup_name),
            format!("Service name:    {}", opts.service_name),
            format!("Namespace:       {}", opts.namespace),
            String::new(),
            "Credentials:".into(),
        ];
        for (name, binding) in &self.bindings {
            lines.push(format!("  {name}: {}", binding.describe()));
        }
        lines.push(String::new());
        lines.push(format!(
            "Would create {} sequential Kubernetes jobs:",
            self.phases.len()
        ));
        for (i, phase) in self.phases.iter().enumerate() {
            lines.push(format!(
                "  {}. {} ({})",
                i + 1,
                phase.description,
                phase.job.name
            ));
        }
        lines
    }
}

/// Print the plan on a dry run, otherwise run every phase in order.
pub fn carry_out(
    plan: &RestorePlan,
    target: &RestoreTarget,
    opts: &RestoreOptions,
    ctx: &RestoreContext<'_>,
) -> Result<()> {
    if opts.dry_run {
        info!(engine = plan.engine, phases = plan.phases.len(), "dry run, nothing submitted");
        ui::print_dry_run(&plan.dry_run_report(target, opts));
        return Ok(());
    }

    info!(
        engine = plan.engine,
        database = %target.database,
        backup = %target.backup_name,
        "starting restore sequence"
    );
    ctx.orchestrator.run_all(&plan.jobs())
}

/// Reject names that would break out of the quoting in generated scripts.
pub fn check_identifier(flag: &str, value: &str) -> Result<()> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
    if ok {
        Ok(())
    } else {
        Err(RestoreError::configuration(format!(
            "{flag} '{value}' may only contain letters, digits, '_', '-', '.' and '/'"
        )))
    }
}

// ─── Test helpers ─────────────────────────────────────────────────────────────


// ─── Tests ────────────────────────────────────────────────────────────────────
