/*!
The producer contract: what a caller (an append, an overwrite, a
compaction, ...) must supply for the commit driver to assemble and
commit a snapshot (§4.7).

The teacher's `Operation` enum bundled dispatch and execution into one
large match; here dispatch (this module) and execution (the concrete
producer modules) are split, so new operations are added by implementing
[`SnapshotProducer`] rather than extending a central match.
*/

pub mod append;
pub mod overwrite;
pub mod replace;
pub mod rewrite;
pub mod rollback;

use iceberg_rust_spec::manifest::ManifestEntry;
use iceberg_rust_spec::snapshot::Operation;
use iceberg_rust_spec::table_metadata::TableMetadata;

use crate::commit::summary::SummaryDelta;
use crate::error::Error;

pub use append::AppendProducer;
pub use overwrite::OverwriteProducer;
pub use replace::ReplaceProducer;
pub use rewrite::RewriteProducer;
pub use rollback::RollbackProducer;

/// What a snapshot-producing operation contributes to a commit.
pub trait SnapshotProducer: Send + Sync {
    /// The kind of change this operation represents.
    fn operation(&self) -> Operation;

    /// New manifest entries (status `ADDED`/`DELETED`) this operation
    /// writes into fresh manifests. Empty for operations (e.g. rollback)
    /// that only repoint a ref.
    fn new_entries(&self) -> &[ManifestEntry];

    /// Locations of existing manifests that should be dropped from the
    /// new snapshot's manifest-list entirely, rather than carried over
    /// as `EXISTING`. Used by replace/rewrite to retire compacted input.
    fn manifests_to_remove(&self) -> &[String] {
        &[]
    }

    /// Per-attempt counters contributed to the snapshot summary.
    fn summary_delta(&self) -> SummaryDelta;

    /// Validate this operation's invariants against the table's current
    /// metadata before any manifest is written. Operation-specific: e.g.
    /// REPLACE requires `added_records <= deleted_records`.
    fn validate(&self, base: &TableMetadata) -> Result<(), Error>;

    /// The snapshot id this operation must land on, if it isn't minting a
    /// fresh one. `Some` means the commit driver repoints the branch at
    /// an already-existing snapshot instead of adding a new one (used by
    /// rollback). `None` (the default) means a new id is minted.
    fn target_snapshot_id(&self) -> Option<i64> {
        None
    }

    /// Called once after a commit attempt's outcome is known, naming the
    /// manifests that actually ended up reachable from the committed
    /// snapshot (empty on failure, or on a rollback that added no new
    /// snapshot). Lets a producer release any resources it was holding
    /// for manifests that didn't make it in. A no-op by default.
    fn clean_uncommitted(&self, _committed_manifests: &[String]) {}
}

/// Enum-dispatch wrapper over the concrete producer kinds, so the
/// commit driver can hold a single type without boxing a trait object
/// when the caller already knows which operation it's performing.
pub enum ProducerOperation {
    /// Add new data files
    Append(AppendProducer),
    /// Add and remove data files without changing the logical rows they
    /// replace (e.g. a merge-on-read compaction of equality deletes)
    Overwrite(OverwriteProducer),
    /// Replace a set of manifests with a logically equivalent compacted
    /// set (e.g. bin-packing)
    Replace(ReplaceProducer),
    /// Rewrite data files, producing new manifests for the same logical
    /// rows as the ones being removed
    Rewrite(RewriteProducer),
    /// Move a branch back to an earlier snapshot
    Rollback(RollbackProducer),
}

impl ProducerOperation {
    /// Borrow the concrete producer as a trait object.
    pub fn as_producer(&self) -> &dyn SnapshotProducer {
        match self {
            ProducerOperation::Append(p) => p,
            ProducerOperation::Overwrite(p) => p,
            ProducerOperation::Replace(p) => p,
            ProducerOperation::Rewrite(p) => p,
            ProducerOperation::Rollback(p) => p,
        }
    }
}
