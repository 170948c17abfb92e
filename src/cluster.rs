//! The cluster boundary: create a Job, read a Job's status.
//!
//! [`JobBackend`] is the seam the orchestrator talks through.  The production
//! implementation, [`Kubectl`], shells out to `kubectl` the same way the rest
//! of this tool runs external programs: arguments are built as plain vectors,
//! output is captured, and a non-zero exit turns into an error carrying
//! stderr.

use std::{
    io::Write,
    process::{Command, Stdio},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClusterConfig;

// ─── Status ───────────────────────────────────────────────────────────────────

/// The subset of `JobStatus` the orchestrator looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub active: u32,
    #[serde(default)]
    pub succeeded: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub conditions: Vec<JobCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl JobStatus {
    /// `"<reason> - <message>"` of the first active `Failed` condition.
    pub fn failure_reason(&self) -> Option<String> {
        self.conditions
            .iter()
            .find(|c| c.kind == "Failed" && c.status != "False")
            .map(|c| match (c.reason.is_empty(), c.message.is_empty()) {
                (false, false) => format!("{} - {}", c.reason, c.message),
                (false, true) => c.reason.clone(),
                (true, false) => c.message.clone(),
                (true, true) => "Failed".into(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct JobObject {
    #[serde(default)]
    status: JobStatus,
}

/// Parse the output of `kubectl get job -o json`.
pub fn parse_job_status(json: &str) -> Result<JobStatus> {
    let job: JobObject = serde_json::from_str(json).context("parsing job JSON")?;
    Ok(job.status)
}

// ─── Backend trait ────────────────────────────────────────────────────────────

/// Create and inspect Jobs.  Errors are reported as messages; the caller
/// attaches job identity.
pub trait JobBackend {
    fn create_job(&self, manifest: &Value) -> Result<()>;
    fn job_status(&self, namespace: &str, name: &str) -> Result<JobStatus>;
}

// ─── kubectl ──────────────────────────────────────────────────────────────────

/// [`JobBackend`] that drives the `kubectl` binary.
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
    context: Option<String>,
    kubeconfig: Option<String>,
}

impl Kubectl {
    pub fn from_config(cfg: &ClusterConfig) -> Self {
        Self {
            program: cfg.kubectl.clone(),
            context: cfg.context.clone(),
            kubeconfig: cfg.kubeconfig.clone(),
        }
    }

    /// Connection flags shared by every invocation.
    pub fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.extend(["--kubeconfig".into(), kubeconfig.clone()]);
        }
        if let Some(context) = &self.context {
            args.extend(["--context".into(), context.clone()]);
        }
        args
    }

    pub fn create_args(&self) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(["create".into(), "-f".into(), "-".into()]);
        args
    }

    pub fn get_args(&self, namespace: &str, name: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "get".into(),
            "job".into(),
            name.into(),
            "-n".into(),
            namespace.into(),
            "-o".into(),
            "json".into(),
        ]);
        args
    }

    /// Run kubectl with `args`, optionally feeding `stdin`, and return stdout.
    fn run(&self, args: &[String], stdin: Option<&[u8]>) -> Result<String> {
        debug!(program = %self.program, ?args, "running kubectl");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program))?;

        if let Some(input) = stdin {
            child
                .stdin
                .take()
                .context("kubectl stdin not captured")?
                .write_all(input)
                .context("writing manifest to kubectl")?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("waiting for {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl JobBackend for Kubectl {
    fn create_job(&self, manifest: &Value) -> Result<()> {
        let body = serde_json::to_vec(manifest).context("serialising job manifest")?;
        self.run(&self.create_args(), Some(body.as_slice()))?;
        Ok(())
    }

    fn job_status(&self, namespace: &str, name: &str) -> Result<JobStatus> {
        let out = self.run(&self.get_args(namespace, name), None)?;
        parse_job_status(&out)
    }
}

// ─── Test double ──────────────────────────────────────────────────────────────


// ─── Tests ────────────────────────────────────────────────────────────────────
