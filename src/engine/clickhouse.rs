//! ClickHouse restore: drop, re-create, then `RESTORE ... FROM S3(...)`.
//!
//! Every phase runs `clickhouse-client` against the cluster service given with
//! `--service-name`.  Credentials are read by the shell inside the job from
//! its own environment (`$CLICKHOUSE_USER`, ...), so the rendered scripts
//! never contain a secret.

use tracing::info;

use super::{
    Engine, Phase, RestoreContext, RestoreOptions, RestorePlan, RestoreTarget, carry_out,
    check_identifier,
};
use crate::{error::Result, job::JobSpec, secrets::Bindings, ui};

/// Variables every ClickHouse phase needs in its environment.
pub const REQUIRED_VARS: &[&str] = &[
    "CLICKHOUSE_USER",
    "CLICKHOUSE_PASSWORD",
    "CLICKHOUSE_AWS_S3_ENDPOINT_URL_BACKUP",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
];

#[derive(Debug, Clone)]
pub struct ClickhouseEngine {
    image: String,
}

impl ClickhouseEngine {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    /// Build the three phases.  Pure: no cluster access.
    pub fn plan(
        &self,
        target: &RestoreTarget,
        opts: &RestoreOptions,
        bindings: Bindings,
        run_id: u64,
    ) -> Result<RestorePlan> {
        check_identifier("--database", &target.database)?;
        check_identifier("--backup-name", &target.backup_name)?;
        check_identifier("--service-name", &opts.service_name)?;

        let db = &target.database;
        let backup = &target.backup_name;
        let host = &opts.service_name;

        let steps = [
            (
                "clickhouse-drop-db",
                format!("Drop database '{db}' (if it exists)"),
                client_script(host, &format!("DROP DATABASE IF EXISTS {db} ON CLUSTER default SYNC")),
                format!("Dropped database '{db}' (if it existed)"),
                "Failed to drop existing database",
            ),
            (
                "clickhouse-create-db",
                format!("Create new database '{db}'"),
                client_script(host, &format!("CREATE DATABASE {db} ON CLUSTER default")),
                format!("Created database '{db}'"),
                "Failed to create new database",
            ),
            (
                "clickhouse-restore",
                format!(
                    "Restore database '{db}' from '$CLICKHOUSE_AWS_S3_ENDPOINT_URL_BACKUP/{backup}'"
                ),
                client_script(
                    host,
                    &format!(
                        "RESTORE DATABASE {db} FROM S3('$CLICKHOUSE_AWS_S3_ENDPOINT_URL_BACKUP/{backup}', \
                         '$AWS_ACCESS_KEY_ID', '$AWS_SECRET_ACCESS_KEY')"
                    ),
                ),
                format!("Restored database '{db}' from backup '{backup}'"),
                "ClickHouse restore job failed",
            ),
        ];

        let phases = steps
            .into_iter()
            .zip(0u64..)
            .map(|((phase, description, script, ok, failed), i)| Phase {
                description,
                job: JobSpec::shell(phase, run_id + i, &opts.namespace, &self.image, script, &bindings)
                    .with_messages(ok, failed),
            })
            .collect();

        Ok(RestorePlan {
            engine: self.name(),
            bindings,
            phases,
        })
    }
}

/// `clickhouse-client` invocation running `query` against `host`.
fn client_script(host: &str, query: &str) -> String {
    format!(
        "clickhouse-client --host {host} \\\n\
         --user \"$CLICKHOUSE_USER\" --password \"$CLICKHOUSE_PASSWORD\" \\\n\
         --query \"{query}\""
    )
}

impl Engine for ClickhouseEngine {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn restore(
        &self,
        target: &RestoreTarget,
        opts: &RestoreOptions,
        ctx: &RestoreContext<'_>,
    ) -> Result<()> {
        let bindings = ctx.resolve(REQUIRED_VARS, opts)?;
        let plan = self.plan(target, opts, bindings, ctx.run_id)?;

        carry_out(&plan, target, opts, ctx)?;

        if !opts.dry_run {
            info!(database = %target.database, "clickhouse restore finished");
            ui::print_success("All jobs for the ClickHouse restore sequence completed successfully.");
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cluster::testing::{FakeBackend, failed},
        config::DEFAULT_CLICKHOUSE_IMAGE,
        engine::testing::{context, env_of, options, target},
        error::RestoreError,
        wait::testing::ManualClock,
    };

    fn full_env() -> std::collections::HashMap<String, String> {
        env_of(&[
            ("CLICKHOUSE_USER", "default"),
            ("CLICKHOUSE_PASSWORD", "p4ss-value"),
            ("CLICKHOUSE_AWS_S3_ENDPOINT_URL_BACKUP", "http://s3.example.com/backups"),
            ("AWS_ACCESS_KEY_ID", "AKIA-value"),
            ("AWS_SECRET_ACCESS_KEY", "s3cr3t-value"),
        ])
    }

    fn engine() -> ClickhouseEngine {
        ClickhouseEngine::new(DEFAULT_CLICKHOUSE_IMAGE)
    }

    fn test_plan() -> RestorePlan {
        let vars = full_env();
        let bindings = crate::secrets::resolve(REQUIRED_VARS, &[], "db", |n| {
            vars.get(n).cloned()
        })
        .unwrap();
        engine().plan(&target(), &options(false, &[]), bindings, 1_700_000_000).unwrap()
    }

    // ── plan ──────────────────────────────────────────────────────────────────

    #[test]
    fn name_is_clickhouse() {
        assert_eq!(engine().name(), "clickhouse");
    }

    #[test]
    fn plan_has_drop_create_restore_in_order() {
        let phases: Vec<String> = test_plan().jobs().into_iter().map(|j| j.phase).collect();
        assert_eq!(phases, vec![
            "clickhouse-drop-db",
            "clickhouse-create-db",
            "clickhouse-restore"
        ]);
    }

    #[test]
    fn job_names_are_pairwise_distinct() {
        let names: Vec<String> = test_plan().jobs().into_iter().map(|j| j.name).collect();
        assert_eq!(names, vec![
            "clickhouse-drop-db-1700000000",
            "clickhouse-create-db-1700000001",
            "clickhouse-restore-1700000002"
        ]);
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn every_job_carries_every_credential_and_the_image() {
        for job in test_plan().jobs() {
            assert_eq!(job.image, DEFAULT_CLICKHOUSE_IMAGE);
            assert_eq!(job.namespace, "db");
            let names: Vec<&str> = job.env.iter().map(|e| e.name.as_str()).collect();
            for var in REQUIRED_VARS {
                assert!(names.contains(var), "{} lacks {var}", job.name);
            }
        }
    }

    #[test]
    fn scripts_never_inline_credentials() {
        for job in test_plan().jobs() {
            let script = job.script().unwrap();
            for value in ["p4ss-value", "AKIA-value", "s3cr3t-value", "s3.example.com"] {
                assert!(!script.contains(value), "{script}");
            }
        }
    }

    #[test]
    fn snapshot_drop_script() {
        let jobs = test_plan().jobs();
        insta::assert_snapshot!(jobs[0].script().unwrap(), @r#"
        clickhouse-client --host clickhouse-svc \
        --user "$CLICKHOUSE_USER" --password "$CLICKHOUSE_PASSWORD" \
        --query "DROP DATABASE IF EXISTS analytics ON CLUSTER default SYNC"
        "#);
    }

    #[test]
    fn snapshot_restore_script() {
        let jobs = test_plan().jobs();
        insta::assert_snapshot!(jobs[2].script().unwrap(), @r#"
        clickhouse-client --host clickhouse-svc \
        --user "$CLICKHOUSE_USER" --password "$CLICKHOUSE_PASSWORD" \
        --query "RESTORE DATABASE analytics FROM S3('$CLICKHOUSE_AWS_S3_ENDPOINT_URL_BACKUP/daily-2024-05-01', '$AWS_ACCESS_KEY_ID', '$AWS_SECRET_ACCESS_KEY')"
        "#);
    }

    #[test]
    fn plan_rejects_unsafe_database_name() {
        let err = engine()
            .plan(
                &RestoreTarget {
                    backup_name: "b".into(),
                    database: "x\"; rm -rf /".into(),
                },
                &options(false, &[]),
                Bindings::new(),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, RestoreError::Configuration(_)));
    }

    // ── restore ───────────────────────────────────────────────────────────────

    #[test]
    fn dry_run_never_contacts_the_cluster() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let vars = full_env();
        let env = |n: &str| vars.get(n).cloned();

        engine()
            .restore(&target(), &options(true, &[]), &context(&backend, &clock, &env))
            .unwrap();
        assert!(backend.created_names().is_empty());
        assert!(backend.status_calls.borrow().is_empty());
    }

    #[test]
    fn dry_run_with_secret_refs_only_succeeds() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let env = |_: &str| -> Option<String> { None };
        let refs = [
            "CLICKHOUSE_USER=ch:user",
            "CLICKHOUSE_PASSWORD=ch:password",
            "CLICKHOUSE_AWS_S3_ENDPOINT_URL_BACKUP=s3:url",
            "AWS_ACCESS_KEY_ID=s3:id",
            "AWS_SECRET_ACCESS_KEY=s3:key",
        ];
        engine()
            .restore(&target(), &options(true, &refs), &context(&backend, &clock, &env))
            .unwrap();
        assert!(backend.created_names().is_empty());
    }

    #[test]
    fn missing_credential_creates_no_job() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let mut vars = full_env();
        vars.remove("AWS_SECRET_ACCESS_KEY");
        let env = |n: &str| vars.get(n).cloned();

        for dry_run in [true, false] {
            let err = engine()
                .restore(&target(), &options(dry_run, &[]), &context(&backend, &clock, &env))
                .unwrap_err();
            assert!(matches!(err, RestoreError::Credential(ref n) if n == "AWS_SECRET_ACCESS_KEY"));
        }
        assert!(backend.created_names().is_empty());
    }

    #[test]
    fn restore_runs_all_three_phases() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let vars = full_env();
        let env = |n: &str| vars.get(n).cloned();

        engine()
            .restore(&target(), &options(false, &[]), &context(&backend, &clock, &env))
            .unwrap();
        assert_eq!(backend.created_names(), vec![
            "clickhouse-drop-db-1700000000",
            "clickhouse-create-db-1700000001",
            "clickhouse-restore-1700000002"
        ]);
    }

    #[test]
    fn failed_create_phase_skips_restore() {
        let backend = FakeBackend::new();
        backend.script("clickhouse-create-db", vec![Ok(failed("Error", "replica unavailable"))]);
        let clock = ManualClock::new();
        let vars = full_env();
        let env = |n: &str| vars.get(n).cloned();

        let err = engine()
            .restore(&target(), &options(false, &[]), &context(&backend, &clock, &env))
            .unwrap_err();

        assert_eq!(backend.created_names(), vec![
            "clickhouse-drop-db-1700000000",
            "clickhouse-create-db-1700000001"
        ]);
        let msg = err.to_string();
        assert!(msg.contains("clickhouse-create-db"), "{msg}");
        assert!(msg.contains("replica unavailable"), "{msg}");
    }

    #[test]
    fn secret_refs_reach_the_manifest_as_references() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let mut vars = full_env();
        vars.remove("CLICKHOUSE_PASSWORD");
        let env = |n: &str| vars.get(n).cloned();

        engine()
            .restore(
                &target(),
                &options(false, &["CLICKHOUSE_PASSWORD=ch-secret:password"]),
                &context(&backend, &clock, &env),
            )
            .unwrap();

        let created = backend.created.borrow();
        let env = created[0]["spec"]["template"]["spec"]["containers"][0]["env"]
            .as_array()
            .unwrap();
        let password = env
            .iter()
            .find(|e| e["name"] == "CLICKHOUSE_PASSWORD")
            .unwrap();
        assert_eq!(password["valueFrom"]["secretKeyRef"]["name"], "ch-secret");
        assert!(password.get("value").is_none());
    }
}
