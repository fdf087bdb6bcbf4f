/*!
Replaces a set of manifests with a logically equivalent, compacted set.
The REPLACE invariant - added rows never exceed the rows being removed -
is enforced in [`ReplaceProducer::validate`].
*/

use iceberg_rust_spec::manifest::ManifestEntry;
use iceberg_rust_spec::snapshot::Operation;
use iceberg_rust_spec::table_metadata::TableMetadata;

use crate::commit::summary::SummaryDelta;
use crate::error::Error;
use crate::producer::SnapshotProducer;

/// Compacts `removed_manifests` into `entries`, which must carry the
/// same logical rows (same data, different file layout).
pub struct ReplaceProducer {
    entries: Vec<ManifestEntry>,
    removed_manifests: Vec<String>,
    removed_records: i64,
}

impl ReplaceProducer {
    /// Build a replace. `removed_records` is the row count carried by
    /// `removed_manifests`, used to enforce the REPLACE invariant.
    pub fn new(entries: Vec<ManifestEntry>, removed_manifests: Vec<String>, removed_records: i64) -> Self {
        ReplaceProducer {
            entries,
            removed_manifests,
            removed_records,
        }
    }
}

impl SnapshotProducer for ReplaceProducer {
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
            deleted_records: self.removed_records,
            ..Default::default()
        }
    }

    fn validate(&self, _base: &TableMetadata) -> Result<(), Error> {
        let added_records: i64 = self.entries.iter().map(|e| e.data_file().record_count()).sum();
        if added_records > self.removed_records {
            return Err(Error::Validation(format!(
                "replace would add {added_records} records but only removes {}",
                self.removed_records
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use iceberg_rust_spec::manifest::{Content, DataFile, Status};
    use iceberg_rust_spec::table_metadata::FormatVersion;
    use iceberg_rust_spec::values::Struct;

    use super::*;

    fn entry(record_count: i64) -> ManifestEntry {
        ManifestEntry::builder()
            .with_format_version(FormatVersion::V2)
            .with_status(Status::Added)
            .with_data_file(
                DataFile::builder()
                    .with_content(Content::Data)
                    .with_file_path("s3://bucket/data/a.parquet".to_owned())
                    .with_file_format("parquet".to_owned())
                    .with_partition(Struct::default())
                    .with_record_count(record_count)
                    .with_file_size_in_bytes(10)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn metadata() -> TableMetadata {
        use std::collections::HashMap;
        TableMetadata {
            format_version: FormatVersion::V2,
            table_uuid: uuid::Uuid::new_v4(),
            location: "s3://bucket/table".to_owned(),
            last_sequence_number: 0,
            current_schema_id: 0,
            schemas: HashMap::new(),
            default_spec_id: 0,
            partition_specs: HashMap::new(),
            properties: HashMap::new(),
            current_snapshot_id: None,
            snapshots: HashMap::new(),
            refs: HashMap::new(),
            next_row_id: None,
        }
    }

    #[test]
    fn rejects_a_replace_that_would_add_more_records_than_it_removes() {
        let producer = ReplaceProducer::new(vec![entry(100)], vec!["m1".to_owned()], 50);
        assert!(producer.validate(&metadata()).is_err());
    }

    #[test]
    fn accepts_a_replace_that_preserves_or_reduces_record_count() {
        let producer = ReplaceProducer::new(vec![entry(50)], vec!["m1".to_owned()], 50);
        assert!(producer.validate(&metadata()).is_ok());
    }
}
