/*!
Pure addition: new data files, no removals. Grounded on the teacher's
`Operation::Append` arm.
*/

use iceberg_rust_spec::manifest::ManifestEntry;
use iceberg_rust_spec::snapshot::Operation;
use iceberg_rust_spec::table_metadata::TableMetadata;

use crate::commit::summary::SummaryDelta;
use crate::error::Error;
use crate::producer::SnapshotProducer;

/// Adds `entries` (expected all `Status::Added`) as new manifests.
pub struct AppendProducer {
    entries: Vec<ManifestEntry>,
}

impl AppendProducer {
    /// Build an append from the entries to add.
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        AppendProducer { entries }
    }
}

impl SnapshotProducer for AppendProducer {
    fn operation(&self) -> Operation {
        Operation::Append
    }

    fn new_entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    fn summary_delta(&self) -> SummaryDelta {
        let mut delta = SummaryDelta::default();
        for entry in &self.entries {
            delta.added_data_files += 1;
            delta.added_records += entry.data_file().record_count();
        }
        delta
    }

    fn validate(&self, _base: &TableMetadata) -> Result<(), Error> {
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

    #[test]
    fn summary_delta_sums_added_rows_and_files() {
        let producer = AppendProducer::new(vec![entry(10), entry(5)]);
        let delta = producer.summary_delta();
        assert_eq!(delta.added_data_files, 2);
        assert_eq!(delta.added_records, 15);
    }
}
