//! `kubectl-db-restore engines`: list what `--engine` accepts.

use crate::registry::EngineRegistry;

pub fn render(registry: &EngineRegistry) -> String {
    registry.names().join("\n")
}

pub fn run(registry: &EngineRegistry) {
    println!("{}", render(registry));
}
