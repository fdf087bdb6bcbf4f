/*!
Table metadata: the durable, catalog-owned pointer structure a snapshot
producer reads a base from and that `TableOperations` compare-and-swaps.
*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use uuid::Uuid;

use crate::error::Error;
use crate::partition::{PartitionField, PartitionSpec};
use crate::schema::Schema;
use crate::snapshot::{Snapshot, SnapshotReference, SnapshotRetention};

/// `write.object-storage.enabled` table property.
pub const WRITE_OBJECT_STORAGE_ENABLED: &str = "write.object-storage.enabled";
/// `write.parquet.compression-codec` table property.
pub const WRITE_PARQUET_COMPRESSION_CODEC: &str = "write.parquet.compression-codec";
/// `write.parquet.compression-level` table property.
pub const WRITE_PARQUET_COMPRESSION_LEVEL: &str = "write.parquet.compression-level";

/// `commit.retry.num-retries` table property - max optimistic retries.
pub const COMMIT_NUM_RETRIES: &str = "commit.retry.num-retries";
/// Default for [`COMMIT_NUM_RETRIES`].
pub const COMMIT_NUM_RETRIES_DEFAULT: u32 = 4;
/// `commit.retry.min-wait-ms` table property.
pub const COMMIT_MIN_RETRY_WAIT_MS: &str = "commit.retry.min-wait-ms";
/// Default for [`COMMIT_MIN_RETRY_WAIT_MS`].
pub const COMMIT_MIN_RETRY_WAIT_MS_DEFAULT: u64 = 100;
/// `commit.retry.max-wait-ms` table property.
pub const COMMIT_MAX_RETRY_WAIT_MS: &str = "commit.retry.max-wait-ms";
/// Default for [`COMMIT_MAX_RETRY_WAIT_MS`].
pub const COMMIT_MAX_RETRY_WAIT_MS_DEFAULT: u64 = 60_000;
/// `commit.retry.total-timeout-ms` table property.
pub const COMMIT_TOTAL_RETRY_TIME_MS: &str = "commit.retry.total-timeout-ms";
/// Default for [`COMMIT_TOTAL_RETRY_TIME_MS`].
pub const COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT: u64 = 30 * 60_000;
/// `commit.manifest.target-size-bytes` table property - manifest roll threshold.
pub const MANIFEST_TARGET_SIZE_BYTES: &str = "commit.manifest.target-size-bytes";
/// Default for [`MANIFEST_TARGET_SIZE_BYTES`] - 8 MiB.
pub const MANIFEST_TARGET_SIZE_BYTES_DEFAULT: u64 = 8 * 1024 * 1024;
/// `commit.manifest.snapshot-id-inheritance.enabled` table property.
pub const MANIFEST_SNAPSHOT_ID_INHERITANCE_ENABLED: &str =
    "commit.manifest.snapshot-id-inheritance.enabled";

/// Iceberg table-format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum FormatVersion {
    /// Format version 1
    V1 = 1,
    /// Format version 2
    V2 = 2,
    /// Format version 3, adds row lineage (`next_row_id`)
    V3 = 3,
}

impl FormatVersion {
    /// Manifest-list/manifest snapshot-id-inheritance is mandatory from v2
    /// on; v1 tables may opt in via [`MANIFEST_SNAPSHOT_ID_INHERITANCE_ENABLED`].
    pub fn snapshot_id_inheritance_always_enabled(&self) -> bool {
        !matches!(self, FormatVersion::V1)
    }
}

/// Durable, catalog-owned metadata for a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Format version this metadata was written under
    pub format_version: FormatVersion,
    /// Stable identifier for the table
    pub table_uuid: Uuid,
    /// Base location data/metadata files are written under
    pub location: String,
    /// Sequence number of the last committed snapshot, 0 if none
    pub last_sequence_number: i64,
    /// Highest schema id seen, used to allocate the next one
    pub current_schema_id: i32,
    /// All known schemas, keyed by id
    pub schemas: HashMap<i32, Schema>,
    /// Id of the partition spec used for new writes
    pub default_spec_id: i32,
    /// All known partition specs, keyed by id
    pub partition_specs: HashMap<i32, PartitionSpec>,
    /// Table properties
    pub properties: HashMap<String, String>,
    /// Snapshot the `main` branch currently points to, if any
    pub current_snapshot_id: Option<i64>,
    /// All live snapshots, keyed by id
    pub snapshots: HashMap<i64, Snapshot>,
    /// Named refs (branches and tags)
    pub refs: HashMap<String, SnapshotReference>,
    /// Next row id to assign, format version 3 only
    pub next_row_id: Option<i64>,
}

impl TableMetadata {
    /// Sequence number the next snapshot should carry.
    pub fn next_sequence_number(&self) -> i64 {
        self.last_sequence_number + 1
    }

    /// Current value of the row-id counter, format version 3 only.
    pub fn next_row_id(&self) -> Option<i64> {
        self.next_row_id
    }

    /// Look up a snapshot by id.
    pub fn snapshot(&self, snapshot_id: i64) -> Option<&Snapshot> {
        self.snapshots.get(&snapshot_id)
    }

    /// Whether `snapshot_id` already exists in this metadata.
    pub fn contains_snapshot(&self, snapshot_id: i64) -> bool {
        self.snapshots.contains_key(&snapshot_id)
    }

    /// Resolve a ref name to the snapshot it targets.
    ///
    /// `None` resolves to the conventional `main` branch. Returns
    /// [`Error::NotFound`] if the branch has never been created, and
    /// [`Error::InvalidFormat`] if the name resolves to a tag - tags can
    /// never be commit targets.
    pub fn current_snapshot(&self, branch: Option<&str>) -> Result<Option<&Snapshot>, Error> {
        let branch_name = branch.unwrap_or("main");
        match self.refs.get(branch_name) {
            Some(r) => {
                if !matches!(r.retention, SnapshotRetention::Branch { .. }) {
                    return Err(Error::InvalidFormat(format!(
                        "ref {branch_name} is a tag, not a branch"
                    )));
                }
                Ok(self.snapshots.get(&r.snapshot_id))
            }
            None => {
                if branch_name == "main" {
                    Ok(self.current_snapshot_id.and_then(|id| self.snapshots.get(&id)))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Whether `name` resolves to an existing tag (never a valid commit target).
    pub fn is_tag(&self, name: &str) -> bool {
        matches!(
            self.refs.get(name).map(|r| &r.retention),
            Some(SnapshotRetention::Tag { .. })
        )
    }

    /// The schema active on `branch` (defaulting to `main`).
    pub fn current_schema(&self, branch: Option<&str>) -> Result<&Schema, Error> {
        let schema_id = match self.current_snapshot(branch)? {
            Some(snapshot) => snapshot.schema_id().unwrap_or(self.current_schema_id),
            None => self.current_schema_id,
        };
        self.schemas
            .get(&schema_id)
            .ok_or_else(|| Error::NotFound("Schema".to_owned(), schema_id.to_string()))
    }

    /// The partition spec used for new writes.
    pub fn default_partition_spec(&self) -> Result<&PartitionSpec, Error> {
        self.partition_specs
            .get(&self.default_spec_id)
            .ok_or_else(|| Error::NotFound("PartitionSpec".to_owned(), self.default_spec_id.to_string()))
    }

    /// Partition fields of the default spec.
    pub fn current_partition_fields(&self, _branch: Option<&str>) -> Result<&[PartitionField], Error> {
        Ok(self.default_partition_spec()?.fields())
    }

    /// Read a table property as an integer, falling back to `default`.
    pub fn property_u64(&self, key: &str, default: u64) -> u64 {
        self.properties
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Read a table property as a boolean, falling back to `default`.
    pub fn property_bool(&self, key: &str, default: bool) -> bool {
        self.properties
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotRetention;

    fn empty_metadata() -> TableMetadata {
        TableMetadata {
            format_version: FormatVersion::V2,
            table_uuid: Uuid::new_v4(),
            location: "s3://bucket/warehouse/ns/table".to_owned(),
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
    fn main_branch_with_no_snapshots_resolves_to_none() {
        let metadata = empty_metadata();
        assert!(metadata.current_snapshot(None).unwrap().is_none());
    }

    #[test]
    fn unknown_non_main_branch_resolves_to_none() {
        let metadata = empty_metadata();
        assert!(metadata.current_snapshot(Some("dev")).unwrap().is_none());
    }

    #[test]
    fn tag_target_is_rejected() {
        let mut metadata = empty_metadata();
        metadata.refs.insert(
            "v1.0".to_owned(),
            SnapshotReference {
                snapshot_id: 1,
                retention: SnapshotRetention::Tag {
                    max_ref_age_ms: None,
                },
            },
        );
        assert!(metadata.current_snapshot(Some("v1.0")).is_err());
        assert!(metadata.is_tag("v1.0"));
    }

    #[test]
    fn property_defaults_apply_when_unset() {
        let metadata = empty_metadata();
        assert_eq!(
            metadata.property_u64(MANIFEST_TARGET_SIZE_BYTES, MANIFEST_TARGET_SIZE_BYTES_DEFAULT),
            MANIFEST_TARGET_SIZE_BYTES_DEFAULT
        );
    }
}
