//! `kubectl-db-restore init`: write a starter `restore.toml`.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::{config::starter_toml, ui};

/// Write the starter config to `path`, refusing to overwrite anything.
pub fn run(path: &Path) -> Result<()> {
    if path.exists() {
        ui::print_failure(&format!("{} already exists", path.display()));
        bail!("refusing to overwrite {}", path.display());
    }

    std::fs::write(path, starter_toml())
        .with_context(|| format!("writing {}", path.display()))?;
    ui::phase_ok(&format!("Wrote {}", path.display()));
    Ok(())
}
