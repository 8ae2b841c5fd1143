//! Reconciliation engine.
//!
//! Applies a directory snapshot to a [`GroupStore`]. Records are processed
//! one at a time, each to completion (group write, then mapping
//! reconciliation) before the next is read. In destructive mode a second
//! pass then deletes managed groups whose directory id was not seen.

use std::collections::HashSet;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use dirsync_core::{
    DirectoryGroupRecord, Group, ManagedGroupRef, MalformedRecordError, SnapshotError,
    SnapshotItem,
};
use dirsync_db::GroupStore;

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, RunFailed, RunPhase};
use crate::summary::{RunSummary, RunTracker};
use crate::sync::apply_record;

/// Outcome of reconciling one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Created,
    Updated,
}

/// Reconciles directory snapshots into a group store.
///
/// The engine assumes it is the only writer for the duration of a run;
/// callers serialize runs (see `PgGroupStore::try_acquire_run_lock`).
pub struct ReconciliationEngine<S: GroupStore + ?Sized> {
    store: Arc<S>,
    config: ReconcileConfig,
    stop: Arc<AtomicBool>,
}

impl<S: GroupStore + ?Sized> ReconciliationEngine<S> {
    /// Create an engine with default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ReconcileConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(store: Arc<S>, config: ReconcileConfig) -> Self {
        Self {
            store,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a shared stop flag. Setting it stops the run at the next record
    /// boundary.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Get the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one reconciliation pass over `snapshot`.
    ///
    /// Malformed records are logged and skipped. Any store failure, a
    /// directory source failure, a mapping invariant violation or an
    /// interruption ends the run; the returned [`RunFailed`] carries the
    /// counters reached so far.
    #[instrument(skip(self, snapshot))]
    pub async fn run<St>(&self, snapshot: St, destructive: bool) -> Result<RunSummary, RunFailed>
    where
        St: Stream<Item = SnapshotItem> + Send,
    {
        let mut tracker = RunTracker::start();
        info!(destructive, "Starting reconciliation run");

        let result = self.execute(snapshot, destructive, &mut tracker).await;
        if matches!(result, Err(ReconcileError::Interrupted { .. })) {
            tracker.mark_interrupted();
        }
        let summary = tracker.finish();

        match result {
            Ok(()) => {
                info!(
                    processed = summary.processed_count,
                    created = summary.created_count,
                    updated = summary.updated_count,
                    deleted = summary.deleted_count,
                    skipped = summary.skipped_count,
                    mappings_created = summary.mappings_created,
                    mappings_deleted = summary.mappings_deleted,
                    duration_seconds = summary.duration_seconds,
                    "Reconciliation run complete"
                );
                Ok(summary)
            }
            Err(error) => {
                error!(
                    error = %error,
                    code = error.error_code(),
                    phase = ?error.phase(),
                    directory_id = error.directory_id(),
                    processed = summary.processed_count,
                    created = summary.created_count,
                    updated = summary.updated_count,
                    deleted = summary.deleted_count,
                    skipped = summary.skipped_count,
                    duration_seconds = summary.duration_seconds,
                    "Reconciliation run failed"
                );
                Err(RunFailed { summary, error })
            }
        }
    }

    async fn execute<St>(
        &self,
        snapshot: St,
        destructive: bool,
        tracker: &mut RunTracker,
    ) -> Result<(), ReconcileError>
    where
        St: Stream<Item = SnapshotItem> + Send,
    {
        let mut snapshot = pin!(snapshot);
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            self.check_interrupt(RunPhase::Sync, tracker)?;

            let Some(item) = snapshot.next().await else {
                break;
            };

            let record = match item.and_then(|record| {
                record.validate()?;
                Ok(record)
            }) {
                Ok(record) => record,
                Err(SnapshotError::Malformed(err)) => {
                    self.skip_malformed(&err, destructive, &mut seen);
                    tracker.record_skipped();
                    continue;
                }
                Err(SnapshotError::Source { message }) => {
                    return Err(ReconcileError::Directory { message });
                }
            };

            if destructive {
                seen.insert(record.directory_id.clone());
            }

            match self.reconcile_record(&record, tracker).await? {
                RecordOutcome::Created => tracker.record_created(),
                RecordOutcome::Updated => tracker.record_updated(),
            }

            let processed = tracker.current().processed_count;
            if self.config.progress_log_interval > 0
                && processed % self.config.progress_log_interval == 0
            {
                let current = tracker.current();
                info!(
                    processed,
                    created = current.created_count,
                    updated = current.updated_count,
                    skipped = current.skipped_count,
                    "Reconciliation progress"
                );
            }
        }

        if destructive {
            self.delete_missing(&seen, tracker).await?;
        }

        Ok(())
    }

    fn skip_malformed(
        &self,
        err: &MalformedRecordError,
        destructive: bool,
        seen: &mut HashSet<String>,
    ) {
        warn!(
            directory_id = err.directory_id.as_deref(),
            account_name = err.account_name.as_deref(),
            dn = err.distinguished_name.as_deref(),
            reason = %err.reason,
            "Skipping malformed directory record"
        );

        // The group still exists in the directory; keep the destructive pass off it.
        if destructive {
            if let Some(directory_id) = err.directory_id.as_deref() {
                seen.insert(directory_id.to_string());
            }
        }
    }

    /// Field sync followed by mapping reconciliation for one record.
    async fn reconcile_record(
        &self,
        record: &DirectoryGroupRecord,
        tracker: &mut RunTracker,
    ) -> Result<RecordOutcome, ReconcileError> {
        let directory_id = record.directory_id.as_str();
        let persistence =
            |e| ReconcileError::persistence(RunPhase::Sync, Some(directory_id.to_string()), e);

        let existing = self
            .store
            .find_group_by_directory_id(directory_id)
            .await
            .map_err(persistence)?;

        let (mut group, outcome) = match existing {
            Some(group) if group.is_directory_managed => (group, RecordOutcome::Updated),
            Some(local) => {
                warn!(
                    directory_id = %directory_id,
                    group_id = %local.id,
                    "Directory id is carried by a group that is not directory-managed; leaving it untouched"
                );
                (self.store.create_group(directory_id), RecordOutcome::Created)
            }
            None => (self.store.create_group(directory_id), RecordOutcome::Created),
        };

        let changed = apply_record(&mut group, record, Utc::now());
        self.store.save_group(&group).await.map_err(persistence)?;

        match outcome {
            RecordOutcome::Created => info!(
                directory_id = %directory_id,
                account_name = %record.account_name,
                group_id = %group.id,
                dn = %record.distinguished_name,
                "Created directory group"
            ),
            RecordOutcome::Updated if changed => info!(
                directory_id = %directory_id,
                account_name = %record.account_name,
                group_id = %group.id,
                dn = %record.distinguished_name,
                "Updated directory group"
            ),
            RecordOutcome::Updated => debug!(
                directory_id = %directory_id,
                group_id = %group.id,
                "Directory group unchanged"
            ),
        }

        self.reconcile_mappings(&group, record, tracker).await?;

        Ok(outcome)
    }

    /// Leave `group` with exactly one mapping, for the record's DN.
    async fn reconcile_mappings(
        &self,
        group: &Group,
        record: &DirectoryGroupRecord,
        tracker: &mut RunTracker,
    ) -> Result<(), ReconcileError> {
        let directory_id = record.directory_id.as_str();
        let dn = record.distinguished_name.as_str();
        let persistence =
            |e| ReconcileError::persistence(RunPhase::Sync, Some(directory_id.to_string()), e);

        let mappings = self
            .store
            .list_mappings(group.id)
            .await
            .map_err(persistence)?;

        let mut kept = false;
        for mapping in mappings {
            if !kept && mapping.matches(dn) {
                kept = true;
                continue;
            }

            self.store
                .delete_mapping(&mapping)
                .await
                .map_err(persistence)?;
            tracker.record_mapping_deleted();
            info!(
                directory_id = %directory_id,
                group_id = %group.id,
                mapping_id = %mapping.id,
                dn = %mapping.distinguished_name,
                "Removed group mapping"
            );
        }

        if !kept {
            let mapping = self.store.create_mapping(dn);
            let mapping = self
                .store
                .attach_mapping(group, mapping)
                .await
                .map_err(persistence)?;
            tracker.record_mapping_created();
            info!(
                directory_id = %directory_id,
                group_id = %group.id,
                mapping_id = %mapping.id,
                dn = %dn,
                "Added group mapping"
            );
        }

        if self.config.verify_mapping_invariant {
            let mappings = self
                .store
                .list_mappings(group.id)
                .await
                .map_err(persistence)?;
            let matching = mappings.iter().filter(|m| m.matches(dn)).count();
            if matching != 1 || mappings.len() != 1 {
                return Err(ReconcileError::MappingInvariantViolation {
                    directory_id: directory_id.to_string(),
                    group_id: group.id,
                    distinguished_name: dn.to_string(),
                    matching,
                    total: mappings.len(),
                });
            }
        }

        Ok(())
    }

    /// Delete managed groups whose directory id is not in `seen`.
    async fn delete_missing(
        &self,
        seen: &HashSet<String>,
        tracker: &mut RunTracker,
    ) -> Result<(), ReconcileError> {
        info!(snapshot_ids = seen.len(), "Starting destructive pass");

        let mut managed = self.store.stream_directory_managed_groups();
        loop {
            self.check_interrupt(RunPhase::DestructiveDelete, tracker)?;

            let Some(item) = managed.next().await else {
                break;
            };
            let group = item.map_err(|e| {
                ReconcileError::persistence(RunPhase::DestructiveDelete, None, e)
            })?;

            if seen.contains(&group.directory_id) {
                continue;
            }

            self.delete_group(&group, tracker).await?;
        }

        Ok(())
    }

    async fn delete_group(
        &self,
        group: &ManagedGroupRef,
        tracker: &mut RunTracker,
    ) -> Result<(), ReconcileError> {
        let persistence = |e| {
            ReconcileError::persistence(
                RunPhase::DestructiveDelete,
                Some(group.directory_id.clone()),
                e,
            )
        };

        let mappings = self
            .store
            .list_mappings(group.id)
            .await
            .map_err(persistence)?;
        for mapping in &mappings {
            self.store
                .delete_mapping(mapping)
                .await
                .map_err(persistence)?;
            tracker.record_mapping_deleted();
        }

        self.store
            .delete_group(group.id)
            .await
            .map_err(persistence)?;
        tracker.record_deleted();

        info!(
            directory_id = %group.directory_id,
            group_id = %group.id,
            mappings_removed = mappings.len(),
            "Deleted directory group missing from snapshot"
        );
        Ok(())
    }

    fn check_interrupt(&self, phase: RunPhase, tracker: &RunTracker) -> Result<(), ReconcileError> {
        if self.stop.load(Ordering::SeqCst) {
            return Err(ReconcileError::Interrupted {
                phase,
                reason: "stop requested".to_string(),
            });
        }

        if let Some(limit) = self.config.max_run_duration() {
            if tracker.elapsed() >= limit {
                return Err(ReconcileError::Interrupted {
                    phase,
                    reason: format!("run exceeded {}s deadline", limit.as_secs()),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_db::InMemoryGroupStore;
    use futures_util::stream;

    fn records(records: Vec<DirectoryGroupRecord>) -> impl Stream<Item = SnapshotItem> + Send {
        stream::iter(records.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let store = Arc::new(InMemoryGroupStore::new());
        let engine = ReconciliationEngine::new(Arc::clone(&store));

        let record = DirectoryGroupRecord::new("g1", "eng", "CN=Engineering,OU=Groups")
            .with_display_name("Engineering");
        let summary = engine.run(records(vec![record]), true).await.unwrap();

        assert_eq!(summary.processed_count, 1);
        assert_eq!(summary.created_count, 1);
        assert_eq!(summary.updated_count, 0);
        assert_eq!(summary.deleted_count, 0);

        let groups = store.groups().await;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "Engineering");
        assert_eq!(groups[0].code, "eng");
        let mappings = store.mappings_for(groups[0].id).await;
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].distinguished_name, "CN=Engineering,OU=Groups");
    }

    #[tokio::test]
    async fn test_stop_flag_set_before_run() {
        let store = Arc::new(InMemoryGroupStore::new());
        let stop = Arc::new(AtomicBool::new(true));
        let engine = ReconciliationEngine::new(Arc::clone(&store)).with_stop_signal(stop);

        let failed = engine
            .run(records(vec![DirectoryGroupRecord::new("g1", "eng", "CN=E")]), false)
            .await
            .unwrap_err();
        assert!(matches!(failed.error, ReconcileError::Interrupted { phase: RunPhase::Sync, .. }));
        assert!(failed.summary.interrupted);
        assert_eq!(failed.summary.processed_count, 0);
        assert!(store.groups().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_deadline_interrupts() {
        let store = Arc::new(InMemoryGroupStore::new());
        let config = ReconcileConfig::default().with_max_run_duration(0);
        let engine = ReconciliationEngine::with_config(store, config);

        let failed = engine.run(records(Vec::new()), false).await.unwrap_err();
        assert!(failed.error.to_string().contains("deadline"));
    }
}
