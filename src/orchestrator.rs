//! Submit one job, watch it to a terminal state, and run phases in order.
//!
//! # Job lifecycle
//!
//! ```text
//! Submitted ─► Running ─┬─► Succeeded
//!                       └─► Failed(reason)
//! ```
//!
//! There is no retry and no restart: the job is created with `backoffLimit: 0`
//! and `restartPolicy: Never`, and the first failed phase ends the run.

use tracing::{debug, info};

use crate::{
    cluster::{JobBackend, JobStatus},
    error::{RestoreError, Result},
    job::JobSpec,
    ui,
    wait::{CancelToken, Clock, WaitError, WaitPolicy, wait_until},
};

/// Reason used when a failed job carries no `Failed` condition.
pub const UNKNOWN_FAILURE: &str = "job failed for an unknown reason";

/// A job that has been accepted by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub name: String,
    pub namespace: String,
    failure_header: String,
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Succeeded,
    Failed(String),
}

impl JobResult {
    /// `None` while the job is still running.
    pub fn from_status(status: &JobStatus) -> Option<Self> {
        if status.succeeded > 0 {
            Some(Self::Succeeded)
        } else if status.failed > 0 {
            Some(Self::Failed(
                status
                    .failure_reason()
                    .unwrap_or_else(|| UNKNOWN_FAILURE.into()),
            ))
        } else {
            None
        }
    }
}

pub struct Orchestrator<'a> {
    backend: &'a dyn JobBackend,
    clock: &'a dyn Clock,
    cancel: CancelToken,
    policy: WaitPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        backend: &'a dyn JobBackend,
        clock: &'a dyn Clock,
        cancel: CancelToken,
        policy: WaitPolicy,
    ) -> Self {
        Self {
            backend,
            clock,
            cancel,
            policy,
        }
    }

    /// Create the job.  Refuses to start anything once cancellation was
    /// requested.
    pub fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        if self.cancel.is_cancelled() {
            return Err(RestoreError::Cancelled {
                job: spec.name.clone(),
            });
        }
        debug!(
            job = %spec.name,
            image = %spec.image,
            script = spec.script().unwrap_or_default(),
            "submitting job"
        );

        self.backend
            .create_job(&spec.to_manifest())
            .map_err(|e| RestoreError::Submission {
                job: spec.name.clone(),
                namespace: spec.namespace.clone(),
                reason: format!("{e:#}"),
            })?;

        info!(job = %spec.name, namespace = %spec.namespace, "created job");
        Ok(JobHandle {
            name: spec.name.clone(),
            namespace: spec.namespace.clone(),
            failure_header: spec.failure_header().to_string(),
        })
    }

    /// Poll until the job succeeds or fails.
    ///
    /// A failed job becomes [`RestoreError::Execution`] carrying the reason
    /// from its `Failed` condition.  A status query error aborts immediately.
    pub fn watch(&self, handle: &JobHandle) -> Result<()> {
        let outcome = wait_until(self.clock, &self.cancel, self.policy, || {
            let status = self.backend.job_status(&handle.namespace, &handle.name)?;
            debug!(
                job = %handle.name,
                active = status.active,
                succeeded = status.succeeded,
                failed = status.failed,
                "polled job"
            );
            Ok::<_, anyhow::Error>(JobResult::from_status(&status))
        });

        match outcome {
            Ok(JobResult::Succeeded) => Ok(()),
            Ok(JobResult::Failed(reason)) => Err(RestoreError::Execution {
                job: handle.name.clone(),
                namespace: handle.namespace.clone(),
                header: handle.failure_header.clone(),
                reason,
            }),
            Err(WaitError::Poll(e)) => Err(RestoreError::Poll {
                job: handle.name.clone(),
                namespace: handle.namespace.clone(),
                reason: format!("{e:#}"),
            }),
            Err(WaitError::Cancelled) => Err(RestoreError::Cancelled {
                job: handle.name.clone(),
            }),
            Err(WaitError::TimedOut(waited)) => Err(RestoreError::TimedOut {
                job: handle.name.clone(),
                waited,
            }),
        }
    }

    /// Submit and watch one phase, reporting progress on the terminal.
    pub fn run(&self, spec: &JobSpec) -> Result<()> {
        let handle = self.submit(spec)?;
        ui::job_created(&handle.name, &handle.namespace);

        let spinner = ui::make_spinner(&format!("Waiting for job {}", handle.name));
        let result = self.watch(&handle);
        spinner.finish_and_clear();

        match &result {
            Ok(()) => ui::phase_ok(spec.success_message()),
            Err(RestoreError::Execution {
                header, reason, ..
            }) => ui::failure_banner(header, &handle.name, &handle.namespace, reason),
            Err(e) => ui::phase_err(&spec.phase, &e.to_string()),
        }
        result
    }

    /// Run `phases` strictly in order, stopping at the first failure.
    pub fn run_all(&self, phases: &[JobSpec]) -> Result<()> {
        for (i, spec) in phases.iter().enumerate() {
            info!(phase = %spec.phase, index = i + 1, total = phases.len(), "starting phase");
            self.run(spec).map_err(|e| e.in_phase(&spec.phase, i + 1))?;
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        cluster::testing::{FakeBackend, failed, running, succeeded},
        secrets::Bindings,
        wait::testing::ManualClock,
    };

    fn spec(phase: &str, suffix: u64) -> JobSpec {
        JobSpec::shell(phase, suffix, "db", "alpine", "true".into(), &Bindings::new())
            .with_messages(format!("{phase} done"), format!("{phase} broke"))
    }

    fn orchestrator<'a>(backend: &'a FakeBackend, clock: &'a ManualClock) -> Orchestrator<'a> {
        Orchestrator::new(backend, clock, CancelToken::new(), WaitPolicy::default())
    }

    // ── JobResult::from_status ────────────────────────────────────────────────

    #[test]
    fn running_status_is_not_terminal() {
        assert_eq!(JobResult::from_status(&running()), None);
    }

    #[test]
    fn failed_without_condition_uses_generic_reason() {
        let status = JobStatus {
            failed: 1,
            ..JobStatus::default()
        };
        assert_eq!(
            JobResult::from_status(&status),
            Some(JobResult::Failed(UNKNOWN_FAILURE.into()))
        );
    }

    // ── submit ────────────────────────────────────────────────────────────────

    #[test]
    fn submit_creates_one_job() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let handle = orchestrator(&backend, &clock).submit(&spec("drop", 1)).unwrap();
        assert_eq!(handle.name, "drop-1");
        assert_eq!(handle.namespace, "db");
        assert_eq!(backend.created_names(), vec!["drop-1"]);
    }

    #[test]
    fn rejected_creation_is_a_submission_error() {
        let backend = FakeBackend::new();
        backend.reject("drop", "jobs.batch \"drop-1\" already exists");
        let clock = ManualClock::new();
        let err = orchestrator(&backend, &clock).submit(&spec("drop", 1)).unwrap_err();
        assert!(matches!(err, RestoreError::Submission { ref job, .. } if job == "drop-1"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn submit_after_cancel_creates_nothing() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let orch = Orchestrator::new(&backend, &clock, cancel, WaitPolicy::default());
        assert!(matches!(
            orch.submit(&spec("drop", 1)),
            Err(RestoreError::Cancelled { .. })
        ));
        assert!(backend.created_names().is_empty());
    }

    // ── watch ─────────────────────────────────────────────────────────────────

    #[test]
    fn watch_returns_ok_on_success() {
        let backend = FakeBackend::new();
        backend.script("drop", vec![Ok(running()), Ok(running()), Ok(succeeded())]);
        let clock = ManualClock::new();
        let orch = orchestrator(&backend, &clock);
        let handle = orch.submit(&spec("drop", 1)).unwrap();

        orch.watch(&handle).unwrap();
        assert_eq!(backend.status_calls.borrow().len(), 3);
        assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_secs(3); 2]);
    }

    #[test]
    fn watch_reports_condition_message_and_job_name() {
        let backend = FakeBackend::new();
        backend.script("restore", vec![Ok(running()), Ok(failed("BackoffLimitExceeded", "disk full"))]);
        let clock = ManualClock::new();
        let orch = orchestrator(&backend, &clock);
        let handle = orch.submit(&spec("restore", 7)).unwrap();

        let err = orch.watch(&handle).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("disk full"), "{msg}");
        assert!(msg.contains("restore-7"), "{msg}");
        assert!(msg.contains("restore broke"), "{msg}");
    }

    #[test]
    fn watch_poll_error_is_fatal() {
        let backend = FakeBackend::new();
        backend.script("drop", vec![Err("connection refused".into()), Ok(succeeded())]);
        let clock = ManualClock::new();
        let orch = orchestrator(&backend, &clock);
        let handle = orch.submit(&spec("drop", 1)).unwrap();

        let err = orch.watch(&handle).unwrap_err();
        assert!(matches!(err, RestoreError::Poll { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(backend.status_calls.borrow().len(), 1);
    }

    #[test]
    fn watch_times_out_when_configured() {
        let backend = FakeBackend::new();
        backend.script("drop", vec![Ok(running())]);
        let clock = ManualClock::new();
        let orch = Orchestrator::new(&backend, &clock, CancelToken::new(), WaitPolicy {
            interval: Duration::from_secs(3),
            timeout: Some(Duration::from_secs(9)),
        });
        let handle = orch.submit(&spec("drop", 1)).unwrap();
        assert!(matches!(orch.watch(&handle), Err(RestoreError::TimedOut { .. })));
    }

    // ── run_all ───────────────────────────────────────────────────────────────

    #[test]
    fn run_all_executes_in_declared_order() {
        let backend = FakeBackend::new();
        let clock = ManualClock::new();
        let phases = vec![spec("drop", 10), spec("create", 11), spec("restore", 12)];

        orchestrator(&backend, &clock).run_all(&phases).unwrap();
        assert_eq!(backend.created_names(), vec!["drop-10", "create-11", "restore-12"]);
    }

    #[test]
    fn run_all_stops_at_first_failed_phase() {
        let backend = FakeBackend::new();
        backend.script("create", vec![Ok(failed("Error", "database exists"))]);
        let clock = ManualClock::new();
        let phases = vec![spec("drop", 10), spec("create", 11), spec("restore", 12)];

        let err = orchestrator(&backend, &clock).run_all(&phases).unwrap_err();
        assert_eq!(backend.created_names(), vec!["drop-10", "create-11"]);
        assert!(matches!(err, RestoreError::Phase { index: 2, ref phase, .. } if phase == "create"));
        assert!(matches!(err.root(), RestoreError::Execution { .. }));
    }

    #[test]
    fn run_all_stops_when_submission_fails() {
        let backend = FakeBackend::new();
        backend.reject("create", "forbidden");
        let clock = ManualClock::new();
        let phases = vec![spec("drop", 10), spec("create", 11), spec("restore", 12)];

        let err = orchestrator(&backend, &clock).run_all(&phases).unwrap_err();
        assert_eq!(backend.created_names(), vec!["drop-10"]);
        assert!(matches!(err.root(), RestoreError::Submission { .. }));
    }
}
