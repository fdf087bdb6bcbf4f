/*!
Moves a branch back to an earlier snapshot, writing no new manifests.
Grounded on the teacher's commented-out `// ManageSnapshots` arm.
*/

use iceberg_rust_spec::manifest::ManifestEntry;
use iceberg_rust_spec::snapshot::Operation;
use iceberg_rust_spec::table_metadata::TableMetadata;

use crate::commit::summary::SummaryDelta;
use crate::error::Error;
use crate::producer::SnapshotProducer;

/// Repoints a branch at `target_snapshot_id`, which must already exist.
pub struct RollbackProducer {
    target_snapshot_id: i64,
}

impl RollbackProducer {
    /// Roll a branch back to a previously committed snapshot.
    pub fn new(target_snapshot_id: i64) -> Self {
        RollbackProducer { target_snapshot_id }
    }

    /// The snapshot the branch will be repointed at.
    pub fn target_snapshot_id(&self) -> i64 {
        self.target_snapshot_id
    }
}

impl SnapshotProducer for RollbackProducer {
    fn operation(&self) -> Operation {
        Operation::Replace
    }

    fn new_entries(&self) -> &[ManifestEntry] {
        &[]
    }

    fn summary_delta(&self) -> SummaryDelta {
        SummaryDelta::default()
    }

    fn validate(&self, base: &TableMetadata) -> Result<(), Error> {
        if !base.contains_snapshot(self.target_snapshot_id) {
            return Err(Error::Validation(format!(
                "rollback target {} does not exist",
                self.target_snapshot_id
            )));
        }
        Ok(())
    }

    fn target_snapshot_id(&self) -> Option<i64> {
        Some(self.target_snapshot_id)
    }
}
