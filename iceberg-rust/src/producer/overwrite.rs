/*!
Adds and removes data files without changing the logical rows they
represent, e.g. applying a batch of equality deletes. Grounded on the
teacher's commented-out `// NewOverwrite` arm.
*/

use iceberg_rust_spec::manifest::ManifestEntry;
use iceberg_rust_spec::snapshot::Operation;
use iceberg_rust_spec::table_metadata::TableMetadata;

use crate::commit::summary::SummaryDelta;
use crate::error::Error;
use crate::producer::SnapshotProducer;

/// New entries to add and mark-deleted, bundled into one snapshot.
pub struct OverwriteProducer {
    entries: Vec<ManifestEntry>,
}

impl OverwriteProducer {
    /// Build an overwrite from its combined added/deleted entries.
    /// Entries must already carry the correct [`iceberg_rust_spec::manifest::Status`].
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        OverwriteProducer { entries }
    }
}

impl SnapshotProducer for OverwriteProducer {
    fn operation(&self) -> Operation {
        Operation::Overwrite
    }

    fn new_entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    fn summary_delta(&self) -> SummaryDelta {
        use iceberg_rust_spec::manifest::{Content, Status};
        let mut delta = SummaryDelta::default();
        for entry in &self.entries {
            let is_added = match entry.status() {
                Status::Added => true,
                Status::Deleted => false,
                Status::Existing => continue,
            };
            let rows = entry.data_file().record_count();
            match entry.data_file().content() {
                Content::Data => {
                    if is_added {
                        delta.added_data_files += 1;
                        delta.added_records += rows;
                    } else {
                        delta.deleted_data_files += 1;
                        delta.deleted_records += rows;
                    }
                }
                Content::PositionDeletes => {
                    if is_added {
                        delta.added_delete_files += 1;
                        delta.added_position_deletes += rows;
                    } else {
                        delta.removed_delete_files += 1;
                        delta.removed_position_deletes += rows;
                    }
                }
                Content::EqualityDeletes => {
                    if is_added {
                        delta.added_delete_files += 1;
                        delta.added_equality_deletes += rows;
                    } else {
                        delta.removed_delete_files += 1;
                        delta.removed_equality_deletes += rows;
                    }
                }
            }
        }
        delta
    }

    fn validate(&self, _base: &TableMetadata) -> Result<(), Error> {
        Ok(())
    }
}
