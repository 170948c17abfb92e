//! Credential resolution.
//!
//! Every engine declares the variable names its scripts need.  Each name is
//! bound exactly once, either to a Kubernetes secret key (when the operator
//! passed `--secret-ref NAME=SECRET:KEY`) or to the value found in this
//! process's environment.
//!
//! Secret references are never dereferenced here: the reference itself is put
//! into the job's env list and the kubelet injects the value into the pod.
//! The secret therefore never passes through this process.

use std::{collections::BTreeMap, fmt, str::FromStr};

use tracing::debug;

use crate::error::{RestoreError, Result};

// ─── SecretKeyRef ─────────────────────────────────────────────────────────────

/// `NAME=SECRET:KEY`: bind variable `NAME` to key `KEY` of secret `SECRET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeyRef {
    pub env_var: String,
    pub secret_name: String,
    pub key: String,
}

impl FromStr for SecretKeyRef {
    type Err = RestoreError;

    /// Splits on the first `=`, then the first `:` of the remainder.  All
    /// three parts must be non-empty.
    fn from_str(s: &str) -> Result<Self> {
        let (env_var, target) = s.split_once('=').ok_or_else(|| {
            RestoreError::configuration(format!(
                "invalid --secret-ref format: '{s}' (expected NAME=SECRET:KEY)"
            ))
        })?;
        let (secret_name, key) = target.split_once(':').ok_or_else(|| {
            RestoreError::configuration(format!(
                "invalid secret/key in --secret-ref: '{s}' (expected NAME=SECRET:KEY)"
            ))
        })?;

        if env_var.is_empty() || secret_name.is_empty() || key.is_empty() {
            return Err(RestoreError::configuration(format!(
                "empty component in --secret-ref: '{s}' (expected NAME=SECRET:KEY)"
            )));
        }

        Ok(Self {
            env_var: env_var.into(),
            secret_name: secret_name.into(),
            key: key.into(),
        })
    }
}

impl fmt::Display for SecretKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.env_var, self.secret_name, self.key)
    }
}

// ─── Binding ──────────────────────────────────────────────────────────────────

/// The resolved form of one required credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Binding {
    /// Value read from the local environment, sent inline in the job spec.
    Literal(String),
    /// Reference the cluster resolves when it starts the pod.
    SecretRef { secret_name: String, key: String },
}

impl Binding {
    /// Short label for reports; never includes a literal value.
    pub fn describe(&self) -> String {
        match self {
            Self::Literal(_) => "literal from environment (masked)".into(),
            Self::SecretRef { secret_name, key } => format!("secret {secret_name}:{key}"),
        }
    }
}

// Literal values are credentials: keep them out of `{:?}` output and logs.
impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(_) => f.write_str("Literal(***)"),
            Self::SecretRef { secret_name, key } => f
                .debug_struct("SecretRef")
                .field("secret_name", secret_name)
                .field("key", key)
                .finish(),
        }
    }
}

/// Resolved credentials keyed by variable name.
pub type Bindings = BTreeMap<String, Binding>;

// ─── Resolver ─────────────────────────────────────────────────────────────────

/// Resolve `required` against explicit references, then `lookup` (the
/// process environment in production).
///
/// Fails on the first name found in neither source; no further names are
/// looked up.  An empty environment value counts as absent.  When several
/// references name the same variable the last one wins.
pub fn resolve<F>(
    required: &[&str],
    refs: &[SecretKeyRef],
    namespace: &str,
    mut lookup: F,
) -> Result<Bindings>
where
    F: FnMut(&str) -> Option<String>,
{
    let by_name: BTreeMap<&str, &SecretKeyRef> =
        refs.iter().map(|r| (r.env_var.as_str(), r)).collect();

    let mut bindings = Bindings::new();
    for &name in required {
        let binding = if let Some(r) = by_name.get(name) {
            Binding::SecretRef {
                secret_name: r.secret_name.clone(),
                key: r.key.clone(),
            }
        } else {
            match lookup(name) {
                Some(value) if !value.is_empty() => Binding::Literal(value),
                _ => return Err(RestoreError::Credential(name.into())),
            }
        };
        debug!(var = name, namespace, source = %binding.describe(), "resolved credential");
        bindings.insert(name.into(), binding);
    }

    Ok(bindings)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
