//! Job specifications and the Kubernetes manifest they render to.
//!
//! A [`JobSpec`] is one phase of a restore: a single container running a
//! single shell script to completion.  Specs are plain data; nothing here
//! talks to the cluster.

use serde_json::{Value, json};

use crate::secrets::{Binding, Bindings};

/// Label identifying jobs created by this tool.
pub const MANAGED_BY: &str = "kubectl-db-restore";

/// Fallback messages when an engine leaves them empty.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Job completed successfully";
pub const DEFAULT_FAILURE_HEADER: &str = "Kubernetes job failed";

/// One environment entry of the job container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub binding: Binding,
}

/// Everything needed to create one phase's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Logical phase name, e.g. `clickhouse-drop-db`.
    pub phase: String,
    /// Unique job name, `<phase>-<run timestamp + phase index>`.
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
    pub success_message: String,
    pub failure_header: String,
}

impl JobSpec {
    /// A `/bin/sh -c <script>` job named after `phase` and `suffix`.
    pub fn shell(
        phase: &str,
        suffix: u64,
        namespace: &str,
        image: &str,
        script: String,
        bindings: &Bindings,
    ) -> Self {
        Self {
            phase: phase.into(),
            name: job_name(phase, suffix),
            namespace: namespace.into(),
            image: image.into(),
            command: vec!["/bin/sh".into()],
            args: vec!["-c".into(), script],
            env: env_from(bindings),
            success_message: String::new(),
            failure_header: String::new(),
        }
    }

    pub fn with_messages(mut self, success: impl Into<String>, failure: impl Into<String>) -> Self {
        self.success_message = success.into();
        self.failure_header = failure.into();
        self
    }

    /// The script passed to the shell, if this is a [`JobSpec::shell`] job.
    pub fn script(&self) -> Option<&str> {
        match self.args.as_slice() {
            [flag, script] if flag == "-c" => Some(script),
            _ => None,
        }
    }

    pub fn success_message(&self) -> &str {
        non_empty_or(&self.success_message, DEFAULT_SUCCESS_MESSAGE)
    }

    pub fn failure_header(&self) -> &str {
        non_empty_or(&self.failure_header, DEFAULT_FAILURE_HEADER)
    }

    /// Render the `batch/v1` Job object.
    ///
    /// `backoffLimit` is 0 and the pod restart policy is `Never`, so a failing
    /// script is never re-run by the cluster.
    pub fn to_manifest(&self) -> Value {
        let env: Vec<Value> = self.env.iter().map(env_entry).collect();

        json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
                "labels": {
                    "app.kubernetes.io/managed-by": MANAGED_BY,
                    "db-restore/phase": self.phase,
                },
            },
            "spec": {
                "backoffLimit": 0,
                "template": {
                    "spec": {
                        "restartPolicy": "Never",
                        "containers": [{
                            "name": "task",
                            "image": self.image,
                            "command": self.command,
                            "args": self.args,
                            "env": env,
                        }],
                    },
                },
            },
        })
    }
}

/// `<phase>-<suffix>`.  Callers pass `run timestamp + phase index` as the
/// suffix so names differ across the phases of one run.
pub fn job_name(phase: &str, suffix: u64) -> String {
    format!("{phase}-{suffix}")
}

/// Container env list in name order.
pub fn env_from(bindings: &Bindings) -> Vec<EnvVar> {
    bindings
        .iter()
        .map(|(name, binding)| EnvVar {
            name: name.clone(),
            binding: binding.clone(),
        })
        .collect()
}

fn env_entry(var: &EnvVar) -> Value {
    match &var.binding {
        Binding::Literal(value) => json!({ "name": var.name, "value": value }),
        Binding::SecretRef { secret_name, key } => json!({
            "name": var.name,
            "valueFrom": { "secretKeyRef": { "name": secret_name, "key": key } },
        }),
    }
}

fn non_empty_or<'a>(s: &'a str, fallback: &'a str) -> &'a str {
    if s.is_empty() { fallback } else { s }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
