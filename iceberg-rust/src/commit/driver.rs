/*!
Drives the optimistic-concurrency commit loop: assemble, attempt to
commit, retry on conflict, clean up on loss, give up on anything else
(§4.6, §7).
*/

use std::sync::Arc;
use std::time::Instant;

use iceberg_rust_spec::snapshot::{Snapshot, SnapshotReference, SnapshotRetention};
use object_store::ObjectStore;
use tracing::{debug, info, warn};

use crate::catalog::commit::{TableOperations, TableRequirement, TableUpdate};
use crate::commit::assembler::CommitAssembler;
use crate::commit::report::{CommitListener, CommitMetrics, CommitReport, MetricsReporter};
use crate::commit::retry::RetryPolicy;
use crate::commit::summary::EnvironmentContext;
use crate::error::Error;
use crate::producer::SnapshotProducer;

/// Drives commit attempts for a single table, retrying on conflict per
/// its [`RetryPolicy`].
pub struct CommitDriver<'a, O: TableOperations> {
    ops: &'a O,
    assembler: CommitAssembler,
    retry_policy: RetryPolicy,
    environment: Option<EnvironmentContext>,
    listener: Option<&'a dyn CommitListener>,
    metrics: Option<&'a dyn MetricsReporter>,
}

impl<'a, O: TableOperations> CommitDriver<'a, O> {
    /// Build a driver over `ops`, reading the retry policy from its
    /// current table metadata.
    pub fn new(ops: &'a O, worker_count: usize) -> Self {
        Self::with_environment(ops, worker_count, None)
    }

    /// Build a driver that stamps every snapshot summary with `environment`.
    pub fn with_environment(ops: &'a O, worker_count: usize, environment: Option<EnvironmentContext>) -> Self {
        let retry_policy = RetryPolicy::from_table_metadata(&ops.current());
        let assembler = CommitAssembler::new(ops.io(), environment.clone(), worker_count);
        CommitDriver {
            ops,
            assembler,
            retry_policy,
            environment,
            listener: None,
            metrics: None,
        }
    }

    /// Attach a commit listener, called once with the terminal outcome.
    pub fn with_listener(mut self, listener: &'a dyn CommitListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Attach a metrics reporter, called at finer granularity as the
    /// commit progresses.
    pub fn with_metrics(mut self, metrics: &'a dyn MetricsReporter) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run `producer` to completion: assemble a snapshot, attempt to
    /// commit it, retry on conflict up to the retry policy's bounds.
    ///
    /// If `producer.target_snapshot_id()` names a snapshot already
    /// present in the table (a rollback), the branch is repointed at it
    /// directly and no new snapshot is added. Otherwise, if `stage_only`
    /// is set, the new snapshot is added but no branch is moved to it.
    /// In both cases this attempt's manifest-list never becomes
    /// reachable from any ref (for rollback) or from any *other* commit's
    /// follow-up read path until a later non-staged commit adopts it, so
    /// it is cleaned up as an orphan immediately after a successful CAS.
    ///
    /// Errors that aren't [`Error::is_retryable`] are returned
    /// immediately. On any terminal error whose
    /// [`Error::is_cleanable`] is true, the losing attempt's
    /// manifest-list and manifests are deleted before the error is
    /// returned, unless `ops.requires_strict_cleanup()` says otherwise.
    /// `producer.clean_uncommitted()` is called once the outcome is
    /// known, naming whichever manifests actually ended up reachable
    /// from the committed ref (none, for a rollback or a failure).
    pub async fn commit(&self, producer: &dyn SnapshotProducer, branch: Option<&str>, stage_only: bool) -> Result<Snapshot, Error> {
        let started = Instant::now();
        let backoff = self.retry_policy.backoff();
        let mut attempt = 0u32;
        let mut base = self.ops.current();
        let mut last_retryable: Option<Error> = None;

        loop {
            if started.elapsed() > self.retry_policy.total_retry_time {
                let err = last_retryable
                    .unwrap_or_else(|| Error::Conflict("commit retry budget exhausted before any attempt completed".to_owned()));
                self.report_failure(producer, attempt, started, &err, 0);
                return Err(err);
            }

            let commit_uuid = uuid::Uuid::new_v4();
            let snapshot_id = producer
                .target_snapshot_id()
                .unwrap_or_else(|| unique_snapshot_id(&base, self.ops));
            let rolls_back_to_existing = base.contains_snapshot(snapshot_id);

            let assembled = self
                .assembler
                .apply(producer, &base, branch, snapshot_id, commit_uuid, attempt)
                .await;

            let assembled = match assembled {
                Ok(assembled) => assembled,
                Err(err) => {
                    self.report_failure(producer, attempt, started, &err, 0);
                    return Err(err);
                }
            };

            let branch_name = branch.unwrap_or("main").to_owned();
            let requirement = base
                .current_snapshot(branch)
                .ok()
                .flatten()
                .map(|s| TableRequirement::AssertRefSnapshotId {
                    r#ref: branch_name.clone(),
                    snapshot_id: *s.snapshot_id(),
                });

            let set_ref = TableUpdate::SetSnapshotRef {
                ref_name: branch_name,
                snapshot_reference: SnapshotReference {
                    snapshot_id,
                    retention: SnapshotRetention::default(),
                },
            };
            let updates = if rolls_back_to_existing {
                vec![set_ref]
            } else if stage_only {
                vec![TableUpdate::AddSnapshot {
                    snapshot: assembled.snapshot.clone(),
                }]
            } else {
                vec![
                    TableUpdate::AddSnapshot {
                        snapshot: assembled.snapshot.clone(),
                    },
                    set_ref,
                ]
            };

            match self.ops.commit(&base, requirement, updates).await {
                Ok(_) => {
                    let manifests_written = assembled.written_manifests.len();
                    if rolls_back_to_existing || stage_only {
                        // nothing new is reachable from the moved branch in
                        // either case: rollback reuses an existing
                        // snapshot, stageOnly doesn't move the branch at all
                        self.cleanup_attempt(&assembled.manifest_list_location, &assembled.written_manifests)
                            .await;
                        producer.clean_uncommitted(&[]);
                    } else {
                        producer.clean_uncommitted(&assembled.written_manifests);
                    }
                    if let Some(metrics) = self.metrics {
                        metrics.on_manifests_written(manifests_written);
                    }
                    let result_snapshot = if rolls_back_to_existing {
                        base.snapshot(snapshot_id)
                            .cloned()
                            .expect("rolls_back_to_existing implies base.contains_snapshot(snapshot_id)")
                    } else {
                        assembled.snapshot
                    };
                    self.report_success(producer, &result_snapshot, attempt + 1, started, manifests_written);
                    return Ok(result_snapshot);
                }
                Err(err) if err.is_retryable() => {
                    self.cleanup_attempt(&assembled.manifest_list_location, &assembled.written_manifests)
                        .await;
                    if attempt >= self.retry_policy.num_retries {
                        self.report_failure(producer, attempt, started, &err, 0);
                        return Err(err);
                    }
                    let wait = backoff.wait_for(attempt);
                    warn!(attempt, ?wait, "commit lost the optimistic-concurrency race, retrying");
                    if let Some(metrics) = self.metrics {
                        metrics.on_retry(attempt, wait);
                    }
                    last_retryable = Some(err);
                    tokio::time::sleep(wait).await;
                    base = match self.ops.refresh().await {
                        Ok(refreshed) => refreshed,
                        Err(err) => {
                            self.report_failure(producer, attempt, started, &err, 0);
                            return Err(err);
                        }
                    };
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_cleanable() && !self.ops.requires_strict_cleanup() {
                        self.cleanup_attempt(&assembled.manifest_list_location, &assembled.written_manifests)
                            .await;
                        producer.clean_uncommitted(&[]);
                    }
                    self.report_failure(producer, attempt, started, &err, 0);
                    return Err(err);
                }
            }
        }
    }

    async fn cleanup_attempt(&self, manifest_list: &str, manifests: &[String]) {
        let object_store = self.ops.io();
        let mut locations: Vec<&str> = manifests.iter().map(String::as_str).collect();
        locations.push(manifest_list);
        for location in locations {
            let path = crate::util::object_store_path(location);
            if let Err(err) = object_store.delete(&path).await {
                debug!(location, ?err, "failed to clean up orphaned attempt file");
            }
        }
    }

    fn report_success(
        &self,
        producer: &dyn SnapshotProducer,
        snapshot: &Snapshot,
        attempts: u32,
        started: Instant,
        manifests_written: usize,
    ) {
        info!(snapshot_id = *snapshot.snapshot_id(), attempts, "commit succeeded");
        if let Some(listener) = self.listener {
            listener.on_commit(&CommitReport {
                table_location: self.ops.current().location.clone(),
                snapshot_id: Some(*snapshot.snapshot_id()),
                operation: producer.operation(),
                sequence_number: Some(*snapshot.sequence_number()),
                environment: self.environment.clone(),
                succeeded: true,
                metrics: CommitMetrics {
                    attempts,
                    total_duration: Some(started.elapsed()),
                    manifests_written,
                },
            });
        }
    }

    fn report_failure(
        &self,
        producer: &dyn SnapshotProducer,
        attempt: u32,
        started: Instant,
        err: &Error,
        manifests_written: usize,
    ) {
        warn!(?err, attempt, "commit failed");
        if let Some(listener) = self.listener {
            listener.on_commit(&CommitReport {
                table_location: self.ops.current().location.clone(),
                snapshot_id: None,
                operation: producer.operation(),
                sequence_number: None,
                environment: self.environment.clone(),
                succeeded: false,
                metrics: CommitMetrics {
                    attempts: attempt + 1,
                    total_duration: Some(started.elapsed()),
                    manifests_written,
                },
            });
        }
    }
}

fn unique_snapshot_id(base: &iceberg_rust_spec::table_metadata::TableMetadata, ops: &impl TableOperations) -> i64 {
    let mut id = ops.new_snapshot_id();
    while base.contains_snapshot(id) {
        id = ops.new_snapshot_id();
    }
    id
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use iceberg_rust_spec::manifest::{Content, DataFile, ManifestEntry, Status};
    use iceberg_rust_spec::partition::{PartitionField, PartitionSpec, Transform};
    use iceberg_rust_spec::table_metadata::{FormatVersion, TableMetadata};
    use iceberg_rust_spec::values::Struct;
    use object_store::memory::InMemory;

    use super::*;
    use crate::producer::AppendProducer;

    /// An in-memory [`TableOperations`] that fails the first
    /// `conflicts_remaining` commits with [`Error::Conflict`] before
    /// accepting, simulating another committer winning the race.
    struct MockTableOperations {
        metadata: Mutex<TableMetadata>,
        object_store: Arc<dyn ObjectStore>,
        conflicts_remaining: AtomicU32,
    }

    impl MockTableOperations {
        fn new(conflicts_remaining: u32) -> Self {
            Self::new_with_properties(conflicts_remaining, HashMap::new())
        }

        fn new_with_properties(conflicts_remaining: u32, properties: HashMap<String, String>) -> Self {
            let mut partition_specs = HashMap::new();
            partition_specs.insert(0, PartitionSpec::new(0, vec![PartitionField::new(1, 1000, "id", Transform::Identity)]));
            let metadata = TableMetadata {
                format_version: FormatVersion::V2,
                table_uuid: uuid::Uuid::new_v4(),
                location: "s3://bucket/table".to_owned(),
                last_sequence_number: 0,
                current_schema_id: 0,
                schemas: HashMap::new(),
                default_spec_id: 0,
                partition_specs,
                properties,
                current_snapshot_id: None,
                snapshots: HashMap::new(),
                refs: HashMap::new(),
                next_row_id: None,
            };
            MockTableOperations {
                metadata: Mutex::new(metadata),
                object_store: Arc::new(InMemory::new()),
                conflicts_remaining: AtomicU32::new(conflicts_remaining),
            }
        }
    }

    #[async_trait::async_trait]
    impl TableOperations for MockTableOperations {
        fn current(&self) -> TableMetadata {
            self.metadata.lock().unwrap().clone()
        }

        async fn refresh(&self) -> Result<TableMetadata, Error> {
            Ok(self.metadata.lock().unwrap().clone())
        }

        async fn commit(
            &self,
            _base: &TableMetadata,
            _requirement: Option<TableRequirement>,
            updates: Vec<TableUpdate>,
        ) -> Result<TableMetadata, Error> {
            if self.conflicts_remaining.load(Ordering::SeqCst) > 0 {
                self.conflicts_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Conflict("lost the race".to_owned()));
            }
            let mut metadata = self.metadata.lock().unwrap();
            for update in updates {
                match update {
                    TableUpdate::AddSnapshot { snapshot } => {
                        metadata.last_sequence_number = *snapshot.sequence_number();
                        metadata.snapshots.insert(*snapshot.snapshot_id(), snapshot);
                    }
                    TableUpdate::SetSnapshotRef {
                        ref_name,
                        snapshot_reference,
                    } => {
                        metadata.current_snapshot_id = Some(snapshot_reference.snapshot_id);
                        metadata.refs.insert(ref_name, snapshot_reference);
                    }
                    _ => {}
                }
            }
            Ok(metadata.clone())
        }

        fn io(&self) -> Arc<dyn ObjectStore> {
            self.object_store.clone()
        }
    }

    fn sample_entries() -> Vec<ManifestEntry> {
        vec![ManifestEntry::builder()
            .with_format_version(FormatVersion::V2)
            .with_status(Status::Added)
            .with_data_file(
                DataFile::builder()
                    .with_content(Content::Data)
                    .with_file_path("s3://bucket/data/a.parquet".to_owned())
                    .with_file_format("parquet".to_owned())
                    .with_partition(Struct::default())
                    .with_record_count(10)
                    .with_file_size_in_bytes(100)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()]
    }

    #[tokio::test]
    async fn a_clean_append_commits_on_the_first_attempt() {
        let ops = MockTableOperations::new(0);
        let driver = CommitDriver::new(&ops, 2);
        let producer = AppendProducer::new(sample_entries());

        let snapshot = driver.commit(&producer, None, false).await.unwrap();
        assert_eq!(*snapshot.sequence_number(), 1);
        assert!(ops.metadata.lock().unwrap().contains_snapshot(*snapshot.snapshot_id()));
    }

    #[tokio::test]
    async fn a_losing_attempt_retries_and_eventually_commits() {
        let ops = MockTableOperations::new(2);
        let driver = CommitDriver::new(&ops, 2);
        let producer = AppendProducer::new(sample_entries());

        let snapshot = driver.commit(&producer, None, false).await.unwrap();
        assert!(ops.metadata.lock().unwrap().contains_snapshot(*snapshot.snapshot_id()));
    }

    #[tokio::test]
    async fn exhausting_retries_surfaces_the_conflict() {
        let ops = MockTableOperations::new(100);
        let driver = CommitDriver::new(&ops, 2);
        let producer = AppendProducer::new(sample_entries());

        let result = driver.commit(&producer, None, false).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn exhausting_the_total_retry_time_budget_surfaces_the_underlying_conflict() {
        let mut properties = HashMap::new();
        properties.insert("commit.retry.num-retries".to_owned(), "1000".to_owned());
        properties.insert("commit.retry.min-wait-ms".to_owned(), "1".to_owned());
        properties.insert("commit.retry.max-wait-ms".to_owned(), "1".to_owned());
        properties.insert("commit.retry.total-timeout-ms".to_owned(), "1".to_owned());
        let ops = MockTableOperations::new_with_properties(1000, properties);
        let driver = CommitDriver::new(&ops, 2);
        let producer = AppendProducer::new(sample_entries());

        let result = driver.commit(&producer, None, false).await;
        // the budget is reported via the real conflict that kept losing, not
        // a fabricated CommitStateUnknown - this keeps it cleanable and
        // distinguishes "gave up waiting" from "the remote call itself was
        // ambiguous"
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn a_rollback_against_a_nonexistent_snapshot_is_rejected_before_any_manifest_is_written() {
        use crate::producer::RollbackProducer;

        let ops = MockTableOperations::new(0);
        let driver = CommitDriver::new(&ops, 2);
        let producer = RollbackProducer::new(999);

        let result = driver.commit(&producer, None, false).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn a_rollback_to_an_existing_snapshot_repoints_the_branch_without_adding_a_new_one() {
        use crate::producer::RollbackProducer;

        let ops = MockTableOperations::new(0);
        let driver = CommitDriver::new(&ops, 2);

        let first = driver
            .commit(&AppendProducer::new(sample_entries()), None, false)
            .await
            .unwrap();
        let second = driver
            .commit(&AppendProducer::new(sample_entries()), None, false)
            .await
            .unwrap();
        assert_ne!(*first.snapshot_id(), *second.snapshot_id());

        let snapshot_count_before = ops.metadata.lock().unwrap().snapshots.len();
        let producer = RollbackProducer::new(*first.snapshot_id());
        let rolled_back = driver.commit(&producer, None, false).await.unwrap();

        assert_eq!(*rolled_back.snapshot_id(), *first.snapshot_id());
        let metadata = ops.metadata.lock().unwrap();
        assert_eq!(metadata.current_snapshot_id, Some(*first.snapshot_id()));
        // no new snapshot was registered, only the branch ref moved
        assert_eq!(metadata.snapshots.len(), snapshot_count_before);
    }

    #[tokio::test]
    async fn staging_a_commit_adds_the_snapshot_without_moving_the_branch() {
        let ops = MockTableOperations::new(0);
        let driver = CommitDriver::new(&ops, 2);
        let producer = AppendProducer::new(sample_entries());

        let snapshot = driver.commit(&producer, None, true).await.unwrap();

        let metadata = ops.metadata.lock().unwrap();
        assert!(metadata.contains_snapshot(*snapshot.snapshot_id()));
        assert_ne!(metadata.current_snapshot_id, Some(*snapshot.snapshot_id()));
    }
}
