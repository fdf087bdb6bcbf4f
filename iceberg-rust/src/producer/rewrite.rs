/*!
Rewrites the data files behind a group of manifests into new files,
without changing row counts. Distinct from [`crate::producer::replace`]
in that its inputs arrive pre-grouped for parallel writing (§4.3),
grounded on the teacher's `Operation::Rewrite` arm
(`stream::iter(...).then(...).try_for_each_concurrent`).
*/

use iceberg_rust_spec::manifest::ManifestEntry;
use iceberg_rust_spec::snapshot::Operation;
use iceberg_rust_spec::table_metadata::TableMetadata;

use crate::commit::summary::SummaryDelta;
use crate::error::Error;
use crate::producer::SnapshotProducer;

/// Rewrites `removed_manifests` into `entries`, written across however
/// many groups the parallel writer produced.
pub struct RewriteProducer {
    entries: Vec<ManifestEntry>,
    removed_manifests: Vec<String>,
}

impl RewriteProducer {
    /// Build a rewrite from its flattened, already-written entries and
    /// the manifests they replace.
    pub fn new(entries: Vec<ManifestEntry>, removed_manifests: Vec<String>) -> Self {
        RewriteProducer {
            entries,
            removed_manifests,
        }
    }
}

impl SnapshotProducer for RewriteProducer {
    fn operation(&self) -> Operation {
        Operation::Replace
    }

    fn new_entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    fn manifests_to_remove(&self) -> &[String] {
        &self.removed_manifests
    }

    fn summary_delta(&self) -> SummaryDelta {
        let added_records: i64 = self.entries.iter().map(|e| e.data_file().record_count()).sum();
        SummaryDelta {
            added_data_files: self.entries.len() as i64,
            added_records,
            deleted_records: added_records,
            ..Default::default()
        }
    }

    fn validate(&self, _base: &TableMetadata) -> Result<(), Error> {
        Ok(())
    }
}
