//! Error taxonomy for a restore run.
//!
//! Every layer returns the first error it meets, wrapped with whatever
//! context it owns (phase name, job name, namespace).  Nothing here is
//! retried; the top level prints the message and exits non-zero.

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the restore core.
pub type Result<T> = std::result::Result<T, RestoreError>;

#[derive(Debug, Error)]
pub enum RestoreError {
    /// Bad flags, malformed `--secret-ref`, unusable config values.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `--engine` names nothing in the registry.
    #[error("unknown engine: '{name}' (available: {available})")]
    UnknownEngine { name: String, available: String },

    /// A required credential is in neither `--secret-ref` nor the environment.
    #[error("missing required variable '{0}' (not in a secret reference nor the environment)")]
    Credential(String),

    /// The cluster refused to create the job.
    #[error("failed to create job '{job}' in namespace '{namespace}': {reason}")]
    Submission {
        job: String,
        namespace: String,
        reason: String,
    },

    /// The job reached its failed terminal state.
    #[error("{header}: job '{job}' in namespace '{namespace}' failed: {reason}")]
    Execution {
        job: String,
        namespace: String,
        header: String,
        reason: String,
    },

    /// Querying the job status failed.
    #[error("failed to get status of job '{job}' in namespace '{namespace}': {reason}")]
    Poll {
        job: String,
        namespace: String,
        reason: String,
    },

    #[error("cancelled while waiting for job '{job}'")]
    Cancelled { job: String },

    #[error("job '{job}' did not finish within {}s", waited.as_secs())]
    TimedOut { job: String, waited: Duration },

    /// An orchestrator error tagged with the phase that produced it.  The
    /// inner message is part of this one, not a separate cause.
    #[error("phase {index} ({phase}) failed: {inner}")]
    Phase {
        phase: String,
        index: usize,
        inner: Box<RestoreError>,
    },
}

impl RestoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wrap `self` with the 1-based phase position and name.
    pub fn in_phase(self, phase: impl Into<String>, index: usize) -> Self {
        Self::Phase {
            phase: phase.into(),
            index,
            inner: Box::new(self),
        }
    }

    /// The innermost error, skipping any [`RestoreError::Phase`] wrappers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Phase { inner, .. } => inner.root(),
            other => other,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
