//! Configuration types and loading logic.
//!
//! Nothing here is required: with no config file at all the tool talks to the
//! current kubectl context, polls every three seconds, waits forever, and uses
//! the stock database images.  Two files are read when present and merged
//! field by field, the local one winning:
//!
//! 1. `~/.config/kubectl-db-restore/config.toml`
//! 2. `./restore.toml` (or the path given with `--config`)
//!
//! # File format
//!
//! ```toml
//! [cluster]
//! kubectl    = "kubectl"        # program to run
//! context    = "prod-eu"        # optional --context
//! kubeconfig = "/etc/kube/cfg"  # optional --kubeconfig
//!
//! [watch]
//! poll_interval_secs = 3
//! timeout_secs       = 3600     # omit to wait indefinitely
//!
//! [images]
//! clickhouse = "clickhouse/clickhouse-server:25.5-alpine"
//! postgres   = "postgres:16-alpine"
//! ```

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::wait::WaitPolicy;

// ─── Resolved config ──────────────────────────────────────────────────────────

/// Fully-defaulted configuration, ready to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub watch: WatchConfig,
    pub images: ImageConfig,
}

/// How to reach the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Program used for every cluster call.
    pub kubectl: String,
    pub context: Option<String>,
    pub kubeconfig: Option<String>,
}

/// Job polling behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    /// `None` waits for a terminal state indefinitely.
    pub timeout_secs: Option<u64>,
}

impl WatchConfig {
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Container image per engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    pub clickhouse: String,
    pub postgres: String,
}

impl Default for Config {
    fn default() -> Self {
        PartialConfig::default().resolve()
    }
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_KUBECTL: &str = "kubectl";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_CLICKHOUSE_IMAGE: &str = "clickhouse/clickhouse-server:25.5-alpine";
pub const DEFAULT_POSTGRES_IMAGE: &str = "postgres:16-alpine";

// ─── Partial config (one file) ────────────────────────────────────────────────

/// One config file as written: every field optional so two files can be
/// layered before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    pub cluster: PartialCluster,
    pub watch: PartialWatch,
    pub images: PartialImages,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialCluster {
    pub kubectl: Option<String>,
    pub context: Option<String>,
    pub kubeconfig: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialWatch {
    pub poll_interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialImages {
    pub clickhouse: Option<String>,
    pub postgres: Option<String>,
}

impl PartialConfig {
    /// Layer `over` on top of `self`; fields set in `over` win.
    pub fn merge(self, over: Self) -> Self {
        Self {
            cluster: PartialCluster {
                kubectl: over.cluster.kubectl.or(self.cluster.kubectl),
                context: over.cluster.context.or(self.cluster.context),
                kubeconfig: over.cluster.kubeconfig.or(self.cluster.kubeconfig),
            },
            watch: PartialWatch {
                poll_interval_secs: over
                    .watch
                    .poll_interval_secs
                    .or(self.watch.poll_interval_secs),
                timeout_secs: over.watch.timeout_secs.or(self.watch.timeout_secs),
            },
            images: PartialImages {
                clickhouse: over.images.clickhouse.or(self.images.clickhouse),
                postgres: over.images.postgres.or(self.images.postgres),
            },
        }
    }

    /// Fill every unset field with its default.
    pub fn resolve(self) -> Config {
        Config {
            cluster: ClusterConfig {
                kubectl: self.cluster.kubectl.unwrap_or_else(|| DEFAULT_KUBECTL.into()),
                context: self.cluster.context,
                kubeconfig: self.cluster.kubeconfig,
            },
            watch: WatchConfig {
                poll_interval_secs: self
                    .watch
                    .poll_interval_secs
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
                timeout_secs: self.watch.timeout_secs,
            },
            images: ImageConfig {
                clickhouse: self
                    .images
                    .clickhouse
                    .unwrap_or_else(|| DEFAULT_CLICKHOUSE_IMAGE.into()),
                postgres: self
                    .images
                    .postgres
                    .unwrap_or_else(|| DEFAULT_POSTGRES_IMAGE.into()),
            },
        }
    }
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Read one config file.  `Ok(None)` when it does not exist; an error when it
/// exists but cannot be read or is not valid TOML.
pub fn parse_partial(path: &Path) -> Result<Option<PartialConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let cfg = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}

/// `~/.config/kubectl-db-restore/config.toml`, when a config dir exists.
pub fn global_config_path() -> Option<std::path::PathBuf> {
    dirs_next::config_dir().map(|d| d.join("kubectl-db-restore").join("config.toml"))
}

/// Merge the global file (if any), `local_path` (if present) and `overrides`,
/// in that order of increasing precedence.
///
/// A broken global file is ignored with a warning rather than blocking every
/// restore; a broken local file is an error.
pub fn load_merged(
    global_path: Option<&Path>,
    local_path: &Path,
    overrides: PartialConfig,
) -> Result<Config> {
    let global = match global_path.map(parse_partial).transpose() {
        Ok(found) => found.flatten().unwrap_or_default(),
        Err(e) => {
            tracing::warn!("ignoring global config: {e:#}");
            PartialConfig::default()
        },
    };

    let local = parse_partial(local_path)?.unwrap_or_default();

    Ok(global.merge(local).merge(overrides).resolve())
}

/// Commented starter file written by `kubectl-db-restore init`.
pub fn starter_toml() -> String {
    format!(
        r#"# kubectl-db-restore configuration.
# Every setting is optional; delete what you do not need.

[cluster]
kubectl = "{DEFAULT_KUBECTL}"
# context    = "my-cluster"
# kubeconfig = "/path/to/kubeconfig"

[watch]
poll_interval_secs = {DEFAULT_POLL_INTERVAL_SECS}
# timeout_secs     = 3600

[images]
clickhouse = "{DEFAULT_CLICKHOUSE_IMAGE}"
postgres   = "{DEFAULT_POSTGRES_IMAGE}"
"#
    )
}

// ─── Tests ────────────────────────────────────────────────────────────────────
