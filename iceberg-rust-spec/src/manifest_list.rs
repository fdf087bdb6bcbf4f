/*!
The manifest-list entry (`ManifestFile`) and its Avro encoding.
*/

use std::sync::OnceLock;

use apache_avro::{from_value, types::Value as AvroValue, Schema as AvroSchema};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::Error;
use crate::table_metadata::{FormatVersion, TableMetadata};
use crate::values::Value;

/// What kind of entries a manifest contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum Content {
    /// Manifest lists data files
    Data = 0,
    /// Manifest lists delete files
    Deletes = 1,
}

/// Per-partition-field min/max/null/nan summary carried on a [`ManifestListEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    /// Whether any value in this field is null
    pub contains_null: bool,
    /// Whether any value in this field is NaN, if known
    pub contains_nan: Option<bool>,
    /// Smallest non-null value seen
    pub lower_bound: Option<Value>,
    /// Largest non-null value seen
    pub upper_bound: Option<Value>,
}

/// A row of the manifest-list file: metadata about one manifest.
///
/// `added_snapshot_id` is `None` until the [manifest metadata enricher]
/// (`crate::writer::enrich`) assigns owning-snapshot attribution; this
/// differs from the Iceberg binary format, where the field is always
/// populated, because this component models the attempt at which a
/// manifest has been written but not yet enriched. See DESIGN.md.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestListEntry {
    /// Format version this entry was produced under
    pub format_version: FormatVersion,
    /// Location of the manifest file
    pub manifest_path: String,
    /// Length in bytes of the manifest file
    pub manifest_length: i64,
    /// Id of the partition spec used to write this manifest
    pub partition_spec_id: i32,
    /// Whether this manifest contains data or delete files
    pub content: Content,
    /// Sequence number when this manifest was added
    pub sequence_number: i64,
    /// Lowest sequence number of any entry in this manifest
    pub min_sequence_number: i64,
    /// Snapshot that owns this manifest, assigned by enrichment
    pub added_snapshot_id: Option<i64>,
    /// Number of entries with status ADDED
    pub added_files_count: Option<i32>,
    /// Number of entries with status EXISTING
    pub existing_files_count: Option<i32>,
    /// Number of entries with status DELETED
    pub deleted_files_count: Option<i32>,
    /// Total record count of ADDED entries
    pub added_rows_count: Option<i64>,
    /// Total record count of EXISTING entries
    pub existing_rows_count: Option<i64>,
    /// Total record count of DELETED entries
    pub deleted_rows_count: Option<i64>,
    /// Per-partition-field summaries
    pub partitions: Option<Vec<FieldSummary>>,
    /// Implementation-specific key metadata for encryption
    #[serde(with = "serde_bytes", default)]
    pub key_metadata: Option<Vec<u8>>,
}

impl ManifestListEntry {
    /// Avro schema for a manifest-list file under the given format version.
    pub fn schema(format_version: &FormatVersion) -> Result<AvroSchema, Error> {
        match format_version {
            FormatVersion::V1 => Ok(manifest_list_schema_v1().clone()),
            FormatVersion::V2 | FormatVersion::V3 => Ok(manifest_list_schema_v2().clone()),
        }
    }

    /// Reconstruct a [`ManifestListEntry`] from the untagged avro-decoded
    /// enum, filling in defaults absent from the on-disk version.
    pub fn try_from_enum(
        entry: ManifestListEntryEnum,
        table_metadata: &TableMetadata,
    ) -> Result<Self, Error> {
        Ok(match entry {
            ManifestListEntryEnum::V1(v1) => ManifestListEntry {
                format_version: FormatVersion::V1,
                manifest_path: v1.manifest_path,
                manifest_length: v1.manifest_length,
                partition_spec_id: v1.partition_spec_id,
                content: Content::Data,
                sequence_number: 0,
                min_sequence_number: 0,
                added_snapshot_id: Some(v1.added_snapshot_id),
                added_files_count: v1.added_files_count,
                existing_files_count: v1.existing_files_count,
                deleted_files_count: v1.deleted_files_count,
                added_rows_count: v1.added_rows_count,
                existing_rows_count: v1.existing_rows_count,
                deleted_rows_count: v1.deleted_rows_count,
                partitions: v1.partitions,
                key_metadata: v1.key_metadata,
            },
            ManifestListEntryEnum::V2(v2) => ManifestListEntry {
                format_version: table_metadata.format_version,
                manifest_path: v2.manifest_path,
                manifest_length: v2.manifest_length,
                partition_spec_id: v2.partition_spec_id,
                content: v2.content,
                sequence_number: v2.sequence_number,
                min_sequence_number: v2.min_sequence_number,
                added_snapshot_id: Some(v2.added_snapshot_id),
                added_files_count: Some(v2.added_files_count),
                existing_files_count: Some(v2.existing_files_count),
                deleted_files_count: Some(v2.deleted_files_count),
                added_rows_count: Some(v2.added_rows_count),
                existing_rows_count: Some(v2.existing_rows_count),
                deleted_rows_count: Some(v2.deleted_rows_count),
                partitions: v2.partitions,
                key_metadata: v2.key_metadata,
            },
        })
    }
}

/// The on-disk v1 shape of a manifest-list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestListEntryV1 {
    pub manifest_path: String,
    pub manifest_length: i64,
    pub partition_spec_id: i32,
    pub added_snapshot_id: i64,
    #[serde(default)]
    pub added_files_count: Option<i32>,
    #[serde(default)]
    pub existing_files_count: Option<i32>,
    #[serde(default)]
    pub deleted_files_count: Option<i32>,
    #[serde(default)]
    pub added_rows_count: Option<i64>,
    #[serde(default)]
    pub existing_rows_count: Option<i64>,
    #[serde(default)]
    pub deleted_rows_count: Option<i64>,
    #[serde(default)]
    pub partitions: Option<Vec<FieldSummary>>,
    #[serde(with = "serde_bytes", default)]
    pub key_metadata: Option<Vec<u8>>,
}

/// The on-disk v2 shape of a manifest-list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestListEntryV2 {
    pub manifest_path: String,
    pub manifest_length: i64,
    pub partition_spec_id: i32,
    pub content: Content,
    pub sequence_number: i64,
    pub min_sequence_number: i64,
    pub added_snapshot_id: i64,
    pub added_files_count: i32,
    pub existing_files_count: i32,
    pub deleted_files_count: i32,
    pub added_rows_count: i64,
    pub existing_rows_count: i64,
    pub deleted_rows_count: i64,
    #[serde(default)]
    pub partitions: Option<Vec<FieldSummary>>,
    #[serde(with = "serde_bytes", default)]
    pub key_metadata: Option<Vec<u8>>,
}

/// Untagged union over the two on-disk manifest-list-entry shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestListEntryEnum {
    /// v1 manifest-list entry
    V1(ManifestListEntryV1),
    /// v2 (and v3) manifest-list entry
    V2(ManifestListEntryV2),
}

/// Convert one decoded avro value from a manifest-list reader into a
/// [`ManifestListEntry`], filling version-dependent defaults.
pub fn avro_value_to_manifest_list_entry(
    value: Result<AvroValue, apache_avro::Error>,
    table_metadata: &TableMetadata,
) -> Result<ManifestListEntry, Error> {
    let value = value?;
    let entry: ManifestListEntryEnum = from_value(&value)?;
    ManifestListEntry::try_from_enum(entry, table_metadata)
}

static MANIFEST_LIST_SCHEMA_V1: OnceLock<AvroSchema> = OnceLock::new();
static MANIFEST_LIST_SCHEMA_V2: OnceLock<AvroSchema> = OnceLock::new();

/// Avro schema for v1 manifest-list files.
pub fn manifest_list_schema_v1() -> &'static AvroSchema {
    MANIFEST_LIST_SCHEMA_V1.get_or_init(|| {
        AvroSchema::parse_str(MANIFEST_LIST_V1_SCHEMA_JSON).expect("static manifest-list v1 schema is valid avro")
    })
}

/// Avro schema for v2 (and v3) manifest-list files.
pub fn manifest_list_schema_v2() -> &'static AvroSchema {
    MANIFEST_LIST_SCHEMA_V2.get_or_init(|| {
        AvroSchema::parse_str(MANIFEST_LIST_V2_SCHEMA_JSON).expect("static manifest-list v2 schema is valid avro")
    })
}

const MANIFEST_LIST_V1_SCHEMA_JSON: &str = r#"{
  "type": "record",
  "name": "manifest_file",
  "fields": [
    {"name": "manifest_path", "type": "string"},
    {"name": "manifest_length", "type": "long"},
    {"name": "partition_spec_id", "type": "int"},
    {"name": "added_snapshot_id", "type": "long"},
    {"name": "added_files_count", "type": ["null", "int"], "default": null},
    {"name": "existing_files_count", "type": ["null", "int"], "default": null},
    {"name": "deleted_files_count", "type": ["null", "int"], "default": null},
    {"name": "added_rows_count", "type": ["null", "long"], "default": null},
    {"name": "existing_rows_count", "type": ["null", "long"], "default": null},
    {"name": "deleted_rows_count", "type": ["null", "long"], "default": null},
    {"name": "partitions", "type": ["null", {"type": "array", "items": {
      "type": "record", "name": "r508", "fields": [
        {"name": "contains_null", "type": "boolean"},
        {"name": "contains_nan", "type": ["null", "boolean"], "default": null},
        {"name": "lower_bound", "type": ["null", "bytes"], "default": null},
        {"name": "upper_bound", "type": ["null", "bytes"], "default": null}
      ]
    }}], "default": null},
    {"name": "key_metadata", "type": ["null", "bytes"], "default": null}
  ]
}"#;

const MANIFEST_LIST_V2_SCHEMA_JSON: &str = r#"{
  "type": "record",
  "name": "manifest_file",
  "fields": [
    {"name": "manifest_path", "type": "string"},
    {"name": "manifest_length", "type": "long"},
    {"name": "partition_spec_id", "type": "int"},
    {"name": "content", "type": "int", "default": 0},
    {"name": "sequence_number", "type": "long", "default": 0},
    {"name": "min_sequence_number", "type": "long", "default": 0},
    {"name": "added_snapshot_id", "type": "long"},
    {"name": "added_files_count", "type": "int"},
    {"name": "existing_files_count", "type": "int"},
    {"name": "deleted_files_count", "type": "int"},
    {"name": "added_rows_count", "type": "long"},
    {"name": "existing_rows_count", "type": "long"},
    {"name": "deleted_rows_count", "type": "long"},
    {"name": "partitions", "type": ["null", {"type": "array", "items": {
      "type": "record", "name": "r508", "fields": [
        {"name": "contains_null", "type": "boolean"},
        {"name": "contains_nan", "type": ["null", "boolean"], "default": null},
        {"name": "lower_bound", "type": ["null", "bytes"], "default": null},
        {"name": "upper_bound", "type": ["null", "bytes"], "default": null}
      ]
    }}], "default": null},
    {"name": "key_metadata", "type": ["null", "bytes"], "default": null}
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_parse() {
        manifest_list_schema_v1();
        manifest_list_schema_v2();
    }

    #[test]
    fn format_version_selects_schema() {
        assert!(ManifestListEntry::schema(&FormatVersion::V1).is_ok());
        assert!(ManifestListEntry::schema(&FormatVersion::V2).is_ok());
        assert!(ManifestListEntry::schema(&FormatVersion::V3).is_ok());
    }
}
