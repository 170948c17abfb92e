//! Subcommand handlers.
//!
//! Each file in this module corresponds to one user-facing command:
//!
//! | File          | Invocation                         | Description                  |
//! |---------------|------------------------------------|------------------------------|
//! | `init.rs`     | `kubectl-db-restore init`          | Scaffold a `restore.toml`    |
//! | `engines.rs`  | `kubectl-db-restore engines`       | List registered engines      |
//! | `restore.rs`  | `kubectl-db-restore --engine ...`  | Run a restore (default)      |

pub mod engines;
pub mod init;
pub mod restore;
