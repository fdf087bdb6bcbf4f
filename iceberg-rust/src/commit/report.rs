/*!
Best-effort observability hooks the commit driver calls around each
attempt (§6).

Neither trait is required to do anything meaningful; a no-op
implementation is always valid. Failures returned by these hooks are
logged and otherwise ignored - a broken metrics sink must never fail a
commit.
*/

use std::time::Duration;

use iceberg_rust_spec::snapshot::Operation;

use crate::commit::summary::EnvironmentContext;

/// Counters describing one commit attempt, successful or not.
#[derive(Debug, Clone, Default)]
pub struct CommitMetrics {
    /// How many attempts were made before this outcome, including this one
    pub attempts: u32,
    /// Total wall-clock time spent across all attempts, including backoff
    pub total_duration: Option<Duration>,
    /// Number of manifests written in the winning attempt
    pub manifests_written: usize,
}

/// The terminal outcome of a commit, reported once per `commit()` call.
#[derive(Debug, Clone)]
pub struct CommitReport {
    /// Table location the commit targeted
    pub table_location: String,
    /// Snapshot id produced, if the commit succeeded
    pub snapshot_id: Option<i64>,
    /// Kind of change this commit represents
    pub operation: Operation,
    /// Sequence number assigned to the produced snapshot, if the commit
    /// succeeded and one was assigned (a pure ref repoint on rollback
    /// reuses an existing snapshot rather than assigning a new one)
    pub sequence_number: Option<i64>,
    /// Engine identity stamped on the snapshot's summary, if configured
    pub environment: Option<EnvironmentContext>,
    /// Whether the commit ultimately succeeded
    pub succeeded: bool,
    /// Attempt/timing counters
    pub metrics: CommitMetrics,
}

/// Receives the terminal [`CommitReport`] for a commit.
pub trait CommitListener: Send + Sync {
    /// Called once, after the driver has either committed or exhausted
    /// its retries.
    fn on_commit(&self, report: &CommitReport);
}

/// Receives fine-grained timing/count events as a commit progresses.
/// Distinct from [`CommitListener`] so a metrics backend (e.g.
/// Prometheus counters) doesn't need to parse a [`CommitReport`] to
/// extract per-attempt detail.
pub trait MetricsReporter: Send + Sync {
    /// One attempt was made and lost the optimistic-concurrency race.
    fn on_retry(&self, attempt: u32, wait: Duration) {
        let _ = (attempt, wait);
    }
    /// One attempt wrote `manifest_count` manifests.
    fn on_manifests_written(&self, manifest_count: usize) {
        let _ = manifest_count;
    }
}

/// A [`CommitListener`] and [`MetricsReporter`] that do nothing, used
/// when the caller doesn't care to observe commit internals.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl CommitListener for NoopReporter {
    fn on_commit(&self, _report: &CommitReport) {}
}

impl MetricsReporter for NoopReporter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_accepts_any_report() {
        let reporter = NoopReporter;
        reporter.on_commit(&CommitReport {
            table_location: "s3://bucket/table".to_owned(),
            snapshot_id: Some(1),
            operation: Operation::Append,
            sequence_number: Some(1),
            environment: None,
            succeeded: true,
            metrics: CommitMetrics::default(),
        });
        reporter.on_retry(1, Duration::from_millis(100));
    }
}
