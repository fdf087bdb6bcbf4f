/*!
Object-store-backed manifest writing, including the size-bounded rolling
writer used by the parallel group writer (§4.1).
*/

use std::sync::Arc;

use iceberg_rust_spec::manifest::{
    partition_value_schema, Content as EntryContent, ManifestEntry, ManifestWriter as AvroManifestWriter,
};
use iceberg_rust_spec::manifest_list::Content as ManifestListContent;
use iceberg_rust_spec::partition::PartitionField;
use iceberg_rust_spec::table_metadata::FormatVersion;
use object_store::{path::Path, ObjectStore};

use crate::error::Error;

/// Classify a manifest entry's file content as the coarser manifest-list
/// `Content` (data vs. either delete kind) a manifest as a whole carries.
fn manifest_list_content_of(content: &EntryContent) -> ManifestListContent {
    match content {
        EntryContent::Data => ManifestListContent::Data,
        EntryContent::PositionDeletes | EntryContent::EqualityDeletes => ManifestListContent::Deletes,
    }
}

/// Persists a single manifest's Avro bytes to an [`ObjectStore`] location.
pub struct ManifestWriter<'schema> {
    inner: AvroManifestWriter<'schema>,
    location: String,
    content: Option<ManifestListContent>,
}

impl<'schema> ManifestWriter<'schema> {
    /// Start a new manifest at `location`.
    pub fn new(location: String, schema: &'schema apache_avro::Schema) -> Self {
        ManifestWriter {
            inner: AvroManifestWriter::new(schema),
            location,
            content: None,
        }
    }

    /// Append one entry.
    pub fn append(&mut self, entry: &ManifestEntry) -> Result<(), Error> {
        self.inner.append_ser(entry)?;
        let classified = manifest_list_content_of(entry.data_file().content());
        self.content = Some(match self.content {
            Some(ManifestListContent::Deletes) => ManifestListContent::Deletes,
            _ => classified,
        });
        Ok(())
    }

    /// Whether anything has been appended.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Encoded byte length so far, forcing a block flush.
    pub fn size_estimate(&mut self) -> Result<usize, Error> {
        self.inner.flush()
    }

    /// Write the accumulated bytes to the object store, returning the
    /// manifest's final location, length and content kind.
    pub async fn finish(self, object_store: &dyn ObjectStore) -> Result<(String, i64, ManifestListContent), Error> {
        let content = self.content.unwrap_or(ManifestListContent::Data);
        let bytes = self.inner.into_inner()?;
        let len = bytes.len() as i64;
        let path: Path = crate::util::object_store_path(&self.location);
        object_store.put(&path, bytes.into()).await?;
        Ok((self.location, len, content))
    }
}

/// A finished manifest file, ready to be enriched and entered into a
/// manifest-list.
pub struct WrittenManifest {
    /// Location the manifest was written to
    pub location: String,
    /// Encoded length in bytes
    pub length: i64,
    /// Partition spec id the manifest's entries were written under
    pub partition_spec_id: i32,
    /// Data vs. delete content, derived from the entries actually written
    pub content: ManifestListContent,
}

/// Splits a stream of manifest entries across as many underlying Avro
/// manifests as needed to respect `target_size_bytes`, assigning a
/// monotonically increasing `next_row_id` across every roll.
///
/// `next_row_id` is never reset between rolled files: resetting it would
/// make the `assigned_rows` invariant (format ≥3) double count rows
/// across manifests produced by the same writer.
pub struct RollingManifestWriter<'schema> {
    object_store: Arc<dyn ObjectStore>,
    schema: &'schema apache_avro::Schema,
    location_prefix: String,
    commit_uuid: uuid::Uuid,
    partition_spec_id: i32,
    target_size_bytes: usize,
    manifest_index: usize,
    current: Option<ManifestWriter<'schema>>,
    next_row_id: i64,
    finished: Vec<WrittenManifest>,
}

impl<'schema> RollingManifestWriter<'schema> {
    /// Construct a rolling writer. `starting_row_id` seeds the monotonic
    /// row-id counter (format ≥3); pass `0` where row lineage isn't used.
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        schema: &'schema apache_avro::Schema,
        location_prefix: String,
        commit_uuid: uuid::Uuid,
        partition_spec_id: i32,
        target_size_bytes: usize,
        starting_row_id: i64,
    ) -> Self {
        RollingManifestWriter {
            object_store,
            schema,
            location_prefix,
            commit_uuid,
            partition_spec_id,
            target_size_bytes,
            manifest_index: 0,
            current: None,
            next_row_id: starting_row_id,
            finished: Vec::new(),
        }
    }

    fn next_location(&mut self) -> String {
        let loc = format!(
            "{}/{}-m{}.avro",
            self.location_prefix, self.commit_uuid, self.manifest_index
        );
        self.manifest_index += 1;
        loc
    }

    /// Row id this writer will assign next, without consuming it.
    pub fn peek_next_row_id(&self) -> i64 {
        self.next_row_id
    }

    /// Append one entry, rolling to a new manifest file first if the
    /// current one has reached its target size, and return the row id
    /// assigned to the entry's first row (format ≥3 row lineage).
    pub async fn append(&mut self, entry: ManifestEntry) -> Result<i64, Error> {
        if self.current.is_none() {
            let location = self.next_location();
            self.current = Some(ManifestWriter::new(location, self.schema));
        }

        if let Some(writer) = self.current.as_mut() {
            if !writer.is_empty() && writer.size_estimate()? >= self.target_size_bytes {
                self.roll().await?;
                let location = self.next_location();
                self.current = Some(ManifestWriter::new(location, self.schema));
            }
        }

        let row_id = self.next_row_id;
        self.next_row_id += entry.data_file().record_count();

        self.current
            .as_mut()
            .expect("rolled writer is always replaced before use")
            .append(&entry)?;
        Ok(row_id)
    }

    async fn roll(&mut self) -> Result<(), Error> {
        if let Some(writer) = self.current.take() {
            if !writer.is_empty() {
                let (location, length, content) = writer.finish(self.object_store.as_ref()).await?;
                self.finished.push(WrittenManifest {
                    location,
                    length,
                    partition_spec_id: self.partition_spec_id,
                    content,
                });
            }
        }
        Ok(())
    }

    /// Finish the writer, flushing any in-progress manifest and returning
    /// every written manifest plus the next unused row id.
    pub async fn finish(mut self) -> Result<(Vec<WrittenManifest>, i64), Error> {
        self.roll().await?;
        Ok((self.finished, self.next_row_id))
    }
}

/// Build the Avro schema a [`RollingManifestWriter`] should use for a
/// given partition spec and format version.
pub fn manifest_entry_schema(
    partition_fields: &[PartitionField],
    format_version: &FormatVersion,
) -> Result<apache_avro::Schema, Error> {
    let partition_schema = partition_value_schema(partition_fields)?;
    ManifestEntry::schema(&partition_schema, format_version).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use iceberg_rust_spec::manifest::{DataFile, Status};
    use iceberg_rust_spec::partition::Transform;
    use iceberg_rust_spec::values::Struct;
    use object_store::memory::InMemory;

    use super::*;

    fn entry(record_count: i64) -> ManifestEntry {
        ManifestEntry::builder()
            .with_format_version(FormatVersion::V2)
            .with_status(Status::Added)
            .with_snapshot_id(Some(1))
            .with_data_file(
                DataFile::builder()
                    .with_content(iceberg_rust_spec::manifest::Content::Data)
                    .with_file_path("s3://bucket/data/a.parquet".to_string())
                    .with_file_format("parquet".to_string())
                    .with_partition(Struct::default())
                    .with_record_count(record_count)
                    .with_file_size_in_bytes(100)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn row_ids_stay_monotonic_across_single_manifest() {
        let fields = vec![PartitionField::new(1, 1000, "id", Transform::Identity)];
        let schema = manifest_entry_schema(&fields, &FormatVersion::V2).unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let mut writer = RollingManifestWriter::new(
            store,
            &schema,
            "s3://bucket/metadata".to_string(),
            uuid::Uuid::new_v4(),
            0,
            8 * 1024 * 1024,
            0,
        );

        let first = writer.append(entry(10)).await.unwrap();
        let second = writer.append(entry(5)).await.unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 10);

        let (manifests, next_row_id) = writer.finish().await.unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(next_row_id, 15);
    }

    #[tokio::test]
    async fn rolling_to_a_new_manifest_keeps_row_ids_increasing() {
        let fields = vec![PartitionField::new(1, 1000, "id", Transform::Identity)];
        let schema = manifest_entry_schema(&fields, &FormatVersion::V2).unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        // target size of 1 byte forces a roll on every append after the first flush
        let mut writer = RollingManifestWriter::new(
            store,
            &schema,
            "s3://bucket/metadata".to_string(),
            uuid::Uuid::new_v4(),
            0,
            1,
            100,
        );

        writer.append(entry(1)).await.unwrap();
        writer.append(entry(2)).await.unwrap();
        let (manifests, next_row_id) = writer.finish().await.unwrap();

        assert_eq!(manifests.len(), 2);
        assert_eq!(next_row_id, 103);
    }
}
