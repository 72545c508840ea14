//! The cycle runner: create a snapshot for the current bucket, then prune
//! everything the calculator says has aged out.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::error::{BackupError, Result, ServiceError};
use crate::service::{Snapshot, SnapshotId, SnapshotService};

use super::Policy;
use super::bucket::snapshot_name;
use super::retention::stale_snapshot_names;

/// Extra rows requested past `keep_count` when listing remote snapshots, so a
/// single page covers the retention window plus a pruning backlog.
pub const LIST_MARGIN: u32 = 10;

/// One delete that did not go through. Sibling deletions are unaffected.
#[derive(Debug)]
pub struct DeleteFailure {
    pub snapshot: Snapshot,
    pub error: ServiceError,
}

/// What one policy cycle did.
#[derive(Debug)]
pub struct RunOutcome {
    /// Name given to the snapshot created this cycle.
    pub snapshot_name: String,
    /// Snapshots created. Always 1 on a completed cycle; a failed create
    /// surfaces as an error, not a zeroed outcome.
    pub created: usize,
    /// Stale snapshots successfully deleted.
    pub deleted: usize,
    /// Stale snapshots that could not be deleted.
    pub delete_failures: Vec<DeleteFailure>,
    /// Set when pruning was skipped because the snapshot list could not be
    /// fetched. The bounded lookback picks the backlog up next cycle.
    pub prune_skipped: Option<String>,
}

/// Result of the prune phase alone.
#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub deleted: usize,
    pub failures: Vec<DeleteFailure>,
}

/// Executes policy cycles against a remote snapshot service.
///
/// Run at most once per `policy.time_unit`; a faster cadence lands repeat
/// creates on the same bucket name.
pub struct PolicyRunner {
    service: Arc<dyn SnapshotService>,
}

impl PolicyRunner {
    pub fn new(service: Arc<dyn SnapshotService>) -> Self {
        Self { service }
    }

    /// One full cycle at the current wall clock.
    ///
    /// A failed create aborts the cycle before any pruning, so a run that
    /// could not add a backup can never remove the existing ones. List
    /// failures degrade to a created-but-unpruned cycle instead of an error.
    pub async fn run(&self, policy: &Policy) -> Result<RunOutcome> {
        let name = snapshot_name(policy, &Local::now());
        self.create_snapshot(policy, &name).await?;
        // Creation can sit in the provider's queue for a while; prune from
        // where the clock actually is.
        let reference = Local::now();
        Ok(self.prune_into_outcome(policy, name, &reference).await)
    }

    /// [`run`](Self::run) with an explicit reference instant standing in for
    /// the wall clock. The snapshot name and the stale scan both derive from
    /// `reference`.
    pub async fn run_at<Tz: TimeZone>(
        &self,
        policy: &Policy,
        reference: DateTime<Tz>,
    ) -> Result<RunOutcome> {
        let name = snapshot_name(policy, &reference);
        self.create_snapshot(policy, &name).await?;
        Ok(self.prune_into_outcome(policy, name, &reference).await)
    }

    /// Takes a single snapshot under an explicit name, outside any retention
    /// policy. Nothing is pruned.
    pub async fn take_snapshot(&self, resource_id: &str, name: &str) -> Result<SnapshotId> {
        info!(snapshot = %name, resource = %resource_id, "taking snapshot");
        let id = self
            .service
            .create_snapshot(resource_id, name)
            .await
            .map_err(BackupError::Create)?;
        info!(snapshot = %name, "snapshot taken");
        Ok(id)
    }

    /// Deletes every remote snapshot whose name fell out of the retention
    /// window at `reference`.
    ///
    /// Deletes run concurrently and independently: the call settles only
    /// after every delete settles, and one failure never stops the rest.
    /// Errors only when the snapshot list itself cannot be fetched.
    pub async fn prune_stale<Tz: TimeZone>(
        &self,
        policy: &Policy,
        reference: &DateTime<Tz>,
    ) -> std::result::Result<PruneOutcome, ServiceError> {
        let per_page = policy.keep_count.saturating_add(LIST_MARGIN);
        let snapshots = self
            .service
            .list_snapshots(&policy.resource_id, 1, per_page)
            .await?;

        let stale = stale_snapshot_names(policy, reference);
        let doomed: Vec<Snapshot> = snapshots
            .into_iter()
            .filter(|snapshot| stale.contains(&snapshot.name))
            .collect();

        let deletions = doomed.into_iter().map(|snapshot| async move {
            info!(snapshot = %snapshot.name, "deleting stale snapshot");
            let outcome = self.service.delete_snapshot(&snapshot.id).await;
            (snapshot, outcome)
        });

        let mut result = PruneOutcome::default();
        for (snapshot, outcome) in join_all(deletions).await {
            match outcome {
                Ok(()) => result.deleted += 1,
                Err(error) => {
                    warn!(snapshot = %snapshot.name, error = %error, "failed to delete stale snapshot");
                    result.failures.push(DeleteFailure { snapshot, error });
                }
            }
        }
        info!(deleted = result.deleted, failed = result.failures.len(), "prune finished");
        Ok(result)
    }

    async fn create_snapshot(&self, policy: &Policy, name: &str) -> Result<SnapshotId> {
        info!(snapshot = %name, resource = %policy.resource_id, "creating snapshot");
        let id = self
            .service
            .create_snapshot(&policy.resource_id, name)
            .await
            .map_err(BackupError::Create)?;
        info!(snapshot = %name, "snapshot created");
        Ok(id)
    }

    async fn prune_into_outcome<Tz: TimeZone>(
        &self,
        policy: &Policy,
        name: String,
        reference: &DateTime<Tz>,
    ) -> RunOutcome {
        match self.prune_stale(policy, reference).await {
            Ok(prune) => RunOutcome {
                snapshot_name: name,
                created: 1,
                deleted: prune.deleted,
                delete_failures: prune.failures,
                prune_skipped: None,
            },
            Err(err) => {
                warn!(error = %err, "snapshot list failed; skipping pruning this cycle");
                RunOutcome {
                    snapshot_name: name,
                    created: 1,
                    deleted: 0,
                    delete_failures: Vec::new(),
                    prune_skipped: Some(err.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TimeUnit;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory service with scriptable failures, recording every call.
    #[derive(Default)]
    struct ScriptedService {
        fail_create: bool,
        fail_list: bool,
        fail_delete_ids: Vec<String>,
        snapshots: Vec<Snapshot>,
        created: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
        list_calls: AtomicUsize,
        delete_attempts: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotService for ScriptedService {
        async fn create_snapshot(
            &self,
            _resource_id: &str,
            name: &str,
        ) -> std::result::Result<SnapshotId, ServiceError> {
            if self.fail_create {
                return Err(ServiceError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            self.created.lock().unwrap().push(name.to_string());
            Ok(SnapshotId::new("act-1"))
        }

        async fn list_snapshots(
            &self,
            _resource_id: &str,
            _page: u32,
            _per_page: u32,
        ) -> std::result::Result<Vec<Snapshot>, ServiceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list {
                return Err(ServiceError::Transport("connection reset".into()));
            }
            Ok(self.snapshots.clone())
        }

        async fn delete_snapshot(
            &self,
            id: &SnapshotId,
        ) -> std::result::Result<(), ServiceError> {
            self.delete_attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete_ids.iter().any(|blocked| blocked == id.as_str()) {
                return Err(ServiceError::Api {
                    status: 409,
                    message: "snapshot locked".into(),
                });
            }
            self.deleted.lock().unwrap().push(id.as_str().to_string());
            Ok(())
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn daily_policy() -> Policy {
        Policy::new("web-01", "1234", 7, TimeUnit::DAY).unwrap()
    }

    fn snapshot_aged(policy: &Policy, id: &str, units_ago: i64) -> Snapshot {
        let ms = policy.time_unit.as_millis() as i64;
        let at = noon() - Duration::milliseconds(units_ago * ms);
        Snapshot {
            id: SnapshotId::new(id),
            name: snapshot_name(policy, &at),
        }
    }

    fn runner_over(service: &Arc<ScriptedService>) -> PolicyRunner {
        PolicyRunner::new(Arc::clone(service) as Arc<dyn SnapshotService>)
    }

    // ── Full cycles ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn prunes_exactly_the_snapshots_past_the_window() {
        let policy = daily_policy();
        let service = Arc::new(ScriptedService {
            // Eleven dailies: ages 0..=7 are inside or on the retention
            // edge, 8..=10 have aged out.
            snapshots: (0..=10)
                .map(|age| snapshot_aged(&policy, &format!("s{age}"), age))
                .collect(),
            ..Default::default()
        });

        let outcome = runner_over(&service)
            .run_at(&policy, noon())
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.snapshot_name, snapshot_aged(&policy, "_", 0).name);
        assert_eq!(outcome.deleted, 3);
        assert!(outcome.delete_failures.is_empty());
        assert!(outcome.prune_skipped.is_none());

        let mut deleted = service.deleted.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, ["s10", "s8", "s9"]);
    }

    #[tokio::test]
    async fn failed_create_never_reaches_pruning() {
        let policy = daily_policy();
        let service = Arc::new(ScriptedService {
            fail_create: true,
            snapshots: vec![snapshot_aged(&policy, "old", 9)],
            ..Default::default()
        });

        let err = runner_over(&service)
            .run_at(&policy, noon())
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Create(_)));
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.delete_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_locked_snapshot_does_not_stop_the_others() {
        let policy = daily_policy();
        let service = Arc::new(ScriptedService {
            fail_delete_ids: vec!["s9".into()],
            snapshots: (8..=10)
                .map(|age| snapshot_aged(&policy, &format!("s{age}"), age))
                .collect(),
            ..Default::default()
        });

        let outcome = runner_over(&service)
            .run_at(&policy, noon())
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.delete_failures.len(), 1);
        assert_eq!(outcome.delete_failures[0].snapshot.id.as_str(), "s9");

        let mut deleted = service.deleted.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, ["s10", "s8"]);
    }

    #[tokio::test]
    async fn in_window_snapshot_is_left_alone() {
        let policy = Policy::new("db", "99", 1, TimeUnit::HOUR).unwrap();
        let service = Arc::new(ScriptedService {
            snapshots: vec![snapshot_aged(&policy, "fresh", 0)],
            ..Default::default()
        });

        let outcome = runner_over(&service)
            .run_at(&policy, noon())
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.deleted, 0);
        assert_eq!(service.delete_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_failure_skips_pruning_but_keeps_the_cycle() {
        let policy = daily_policy();
        let service = Arc::new(ScriptedService {
            fail_list: true,
            ..Default::default()
        });

        let outcome = runner_over(&service)
            .run_at(&policy, noon())
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.deleted, 0);
        assert!(outcome.prune_skipped.is_some());
        assert_eq!(service.delete_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_names_the_snapshot_for_the_current_bucket() {
        let policy = daily_policy();
        let service = Arc::new(ScriptedService::default());

        let outcome = runner_over(&service).run(&policy).await.unwrap();

        assert!(outcome.snapshot_name.starts_with("web-01-"));
        assert_eq!(service.created.lock().unwrap().len(), 1);
    }

    // ── Secondary entry ──────────────────────────────────────────────────

    #[tokio::test]
    async fn take_snapshot_only_creates() {
        let service = Arc::new(ScriptedService::default());

        let id = runner_over(&service)
            .take_snapshot("1234", "pre-upgrade")
            .await
            .unwrap();

        assert_eq!(id.as_str(), "act-1");
        assert_eq!(*service.created.lock().unwrap(), ["pre-upgrade"]);
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.delete_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn take_snapshot_surfaces_create_failure() {
        let service = Arc::new(ScriptedService {
            fail_create: true,
            ..Default::default()
        });

        let err = runner_over(&service)
            .take_snapshot("1234", "pre-upgrade")
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Create(ServiceError::Api { status: 500, .. })));
    }
}
