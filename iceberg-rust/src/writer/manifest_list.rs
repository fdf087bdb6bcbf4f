/*!
Writes the manifest-list file for a single commit attempt (§3/§6).
*/

use apache_avro::Writer as AvroWriter;
use iceberg_rust_spec::manifest_list::ManifestListEntry;
use iceberg_rust_spec::table_metadata::FormatVersion;
use object_store::{path::Path, ObjectStore};

use crate::error::Error;

/// Accumulates [`ManifestListEntry`] rows and writes them out under the
/// `snap-<snapshotId>-<attempt>-<commitUUID>.avro` naming convention.
pub struct ManifestListWriter {
    entries: Vec<ManifestListEntry>,
    format_version: FormatVersion,
    location: String,
}

impl ManifestListWriter {
    /// Start a manifest-list for `snapshot_id` at the given commit
    /// `attempt` and `commit_uuid`.
    pub fn new(
        metadata_location: &str,
        snapshot_id: i64,
        attempt: u32,
        commit_uuid: uuid::Uuid,
        format_version: FormatVersion,
    ) -> Self {
        let location = format!(
            "{}/snap-{}-{}-{}.avro",
            metadata_location.trim_end_matches('/'),
            snapshot_id,
            attempt,
            commit_uuid
        );
        ManifestListWriter {
            entries: Vec::new(),
            format_version,
            location,
        }
    }

    /// Location this manifest-list will be written to.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Add one manifest-list entry.
    pub fn push(&mut self, entry: ManifestListEntry) {
        self.entries.push(entry);
    }

    /// Number of entries accumulated so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries have been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode and persist the manifest-list, returning its location.
    pub async fn finish(self, object_store: &dyn ObjectStore) -> Result<String, Error> {
        let schema = ManifestListEntry::schema(&self.format_version)?;
        let mut writer = AvroWriter::new(&schema, Vec::new());
        for entry in &self.entries {
            writer.append_ser(entry)?;
        }
        let bytes = writer.into_inner()?;
        let path: Path = crate::util::object_store_path(&self.location);
        object_store.put(&path, bytes.into()).await?;
        Ok(self.location)
    }
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use super::*;

    #[test]
    fn location_follows_naming_convention() {
        let commit_uuid = uuid::Uuid::new_v4();
        let writer = ManifestListWriter::new(
            "s3://bucket/table/metadata",
            42,
            1,
            commit_uuid,
            FormatVersion::V2,
        );
        assert_eq!(
            writer.location(),
            format!("s3://bucket/table/metadata/snap-42-1-{}.avro", commit_uuid)
        );
    }

    #[tokio::test]
    async fn empty_manifest_list_still_writes() {
        let store = InMemory::new();
        let writer = ManifestListWriter::new(
            "s3://bucket/table/metadata",
            1,
            0,
            uuid::Uuid::new_v4(),
            FormatVersion::V2,
        );
        assert!(writer.is_empty());
        let location = writer.finish(&store).await.unwrap();
        assert!(location.contains("snap-1-0-"));
    }
}
