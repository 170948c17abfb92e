//! PostgreSQL placeholder.
//!
//! Registered so `--engine postgres` is recognised, but restoring is not
//! implemented yet: it warns and succeeds without resolving credentials or
//! touching the cluster.

use tracing::warn;

use super::{Engine, RestoreContext, RestoreOptions, RestoreTarget};
use crate::{error::Result, ui};

#[derive(Debug, Clone)]
pub struct PostgresEngine {
    image: String,
}

impl PostgresEngine {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }
}

impl Engine for PostgresEngine {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn restore(
        &self,
        target: &RestoreTarget,
        opts: &RestoreOptions,
        _ctx: &RestoreContext<'_>,
    ) -> Result<()> {
        warn!(
            image = %self.image,
            database = %target.database,
            namespace = %opts.namespace,
            "postgres restore is not implemented yet"
        );
        ui::print_notice("PostgreSQL restore is not implemented yet; nothing was done.");
        Ok(())
    }
}
