/*!
Error type for the snapshot producer.
*/

use thiserror::Error;

#[derive(Error, Debug)]
/// Errors raised while assembling and committing a snapshot.
pub enum Error {
    /// Invalid format
    #[error("{0} doesn't have the right format")]
    InvalidFormat(String),
    /// Not found
    #[error("{0} {1} not found.")]
    NotFound(String, String),
    /// The REPLACE invariant `added_records <= deleted_records`, a
    /// producer's `validate()`, or a branch-vs-tag commit target check
    /// failed. Terminal - never retried, never cleaned up beyond the
    /// normal non-strict-cleanup path.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Lost the optimistic-concurrency race against another committer.
    /// Retried by the commit driver.
    #[error("commit conflict: {0}")]
    Conflict(String),
    /// The remote commit may or may not have succeeded. Never retried,
    /// never cleaned up - surfaced verbatim so the caller can reconcile
    /// out of band.
    #[error("commit state unknown: {0}")]
    CommitStateUnknown(String),
    /// A terminal failure for which attempted manifest-lists should still
    /// be cleaned up, absent `strictCleanup`.
    #[error("cleanable failure: {0}")]
    CleanableFailure(String),
    /// Spec-level error, e.g. malformed metadata or avro encoding
    #[error("spec error")]
    Spec(#[from] iceberg_rust_spec::error::Error),
    /// Io error
    #[error("io error")]
    IO(#[from] std::io::Error),
    /// Objectstore error
    #[error("object store error")]
    ObjectStore(#[from] object_store::Error),
    /// Avro error
    #[error("avro error")]
    Avro(#[from] apache_avro::Error),
    /// A spawned manifest-write or enrichment task panicked or was cancelled
    #[error("task join error")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the commit driver should retry the attempt that produced
    /// this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Whether this error should trigger cleanup of attempted
    /// manifest-lists before being rethrown. `CommitStateUnknown` is
    /// explicitly excluded: the commit may have actually succeeded, so
    /// deleting its manifest-list would corrupt a live snapshot.
    pub fn is_cleanable(&self) -> bool {
        !matches!(self, Error::CommitStateUnknown(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_is_retryable() {
        assert!(Error::Conflict("x".into()).is_retryable());
        assert!(!Error::Validation("x".into()).is_retryable());
        assert!(!Error::CommitStateUnknown("x".into()).is_retryable());
    }

    #[test]
    fn unknown_state_is_not_cleanable() {
        assert!(!Error::CommitStateUnknown("x".into()).is_cleanable());
        assert!(Error::Validation("x".into()).is_cleanable());
        assert!(Error::IO(std::io::Error::other("boom")).is_cleanable());
    }
}
