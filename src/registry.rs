//! Engine lookup by name.
//!
//! Built once in `main` and passed down by reference; nothing mutates it
//! while a restore runs.

use std::collections::BTreeMap;

use crate::{
    config::ImageConfig,
    engine::{ClickhouseEngine, Engine, PostgresEngine},
    error::{RestoreError, Result},
};

#[derive(Default)]
pub struct EngineRegistry {
    engines: BTreeMap<&'static str, Box<dyn Engine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every engine shipped with this tool, using images from config.
    pub fn builtin(images: &ImageConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ClickhouseEngine::new(&images.clickhouse)));
        registry.register(Box::new(PostgresEngine::new(&images.postgres)));
        registry
    }

    /// Insert `engine` under its name; a later registration replaces an
    /// earlier one with the same name.
    pub fn register(&mut self, engine: Box<dyn Engine>) {
        self.engines.insert(engine.name(), engine);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Engine> {
        self.engines
            .get(name)
            .map(|e| e.as_ref())
            .ok_or_else(|| RestoreError::UnknownEngine {
                name: name.into(),
                available: self.names().join(", "),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.engines.keys().copied().collect()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::{
        cluster::testing::FakeBackend,
        config::Config,
        engine::{
            RestoreContext, RestoreOptions, RestoreTarget,
            testing::{context, options, target},
        },
        wait::testing::ManualClock,
    };

    /// Engine that only counts how often it was called.
    struct Dummy {
        calls: Rc<Cell<u32>>,
    }

    impl Dummy {
        fn boxed(calls: &Rc<Cell<u32>>) -> Box<Self> {
            Box::new(Self {
                calls: Rc::clone(calls),
            })
        }
    }

    impl Engine for Dummy {
        fn name(&self) -> &'static str {
            "dummy"
        }

        fn restore(
            &self,
            _target: &RestoreTarget,
            _opts: &RestoreOptions,
            _ctx: &RestoreContext<'_>,
        ) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn builtin_registers_clickhouse_and_postgres() {
        let r = EngineRegistry::builtin(&Config::default().images);
        assert_eq!(r.names(), vec!["clickhouse", "postgres"]);
        assert_eq!(r.get("clickhouse").unwrap().name(), "clickhouse");
    }

    #[test]
    fn last_registration_wins() {
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let mut r = EngineRegistry::new();
        r.register(Dummy::boxed(&first));
        r.register(Dummy::boxed(&second));
        assert_eq!(r.names(), vec!["dummy"]);

        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let env = |_: &str| -> Option<String> { None };
        r.get("dummy")
            .unwrap()
            .restore(&target(), &options(false, &[]), &context(&backend, &clock, &env))
            .unwrap();

        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn unknown_engine_is_not_found_and_lists_alternatives() {
        let r = EngineRegistry::builtin(&Config::default().images);
        let err = r.get("mysql").err().unwrap();
        assert!(matches!(err, RestoreError::UnknownEngine { ref name, .. } if name == "mysql"));
        assert!(err.to_string().contains("clickhouse, postgres"));
    }

    #[test]
    fn empty_registry_finds_nothing() {
        assert!(EngineRegistry::new().get("clickhouse").is_err());
    }
}
