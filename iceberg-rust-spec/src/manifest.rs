/*!
Manifest entries (`ManifestEntry`) and the low-level Avro reader/writer
for a single manifest file.

The manifest-*list* entry ([`crate::manifest_list::ManifestListEntry`])
describes a manifest file as a whole; this module describes what's
inside it - one row per data or delete file.
*/

use std::io::Read;

use apache_avro::{types::Value as AvroValue, Reader as AvroReader, Schema as AvroSchema, Writer as AvroWriter};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::Error;
use crate::partition::PartitionField;
use crate::table_metadata::FormatVersion;
use crate::values::{Struct, Value};

/// Status of one entry within a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum Status {
    /// Present in a previous manifest, unchanged
    Existing = 0,
    /// Newly added by the snapshot that wrote this manifest
    Added = 1,
    /// Logically removed by the snapshot that wrote this manifest
    Deleted = 2,
}

/// What content a data/delete file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum Content {
    /// Ordinary data
    Data = 0,
    /// Position-based delete markers
    PositionDeletes = 1,
    /// Equality-based delete markers
    EqualityDeletes = 2,
}

/// One physical data or delete file, as referenced from a manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(prefix = "with"), build_fn(error = "crate::error::Error"))]
pub struct DataFile {
    /// What this file contains
    pub content: Content,
    /// Fully qualified path to the file
    pub file_path: String,
    /// File format, e.g. "parquet"
    pub file_format: String,
    /// Partition tuple this file belongs to
    pub partition: Struct,
    /// Number of rows in the file
    pub record_count: i64,
    /// Size of the file in bytes
    pub file_size_in_bytes: i64,
    /// Ids of the columns referenced by `equality_ids`, for equality deletes
    #[builder(default)]
    pub equality_ids: Option<Vec<i32>>,
}

impl DataFile {
    /// What this file contains.
    pub fn content(&self) -> &Content {
        &self.content
    }
    /// Path of the file.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }
    /// Partition tuple of the file.
    pub fn partition(&self) -> &Struct {
        &self.partition
    }
    /// Number of rows in the file.
    pub fn record_count(&self) -> i64 {
        self.record_count
    }
}

/// One row of a manifest file: a data/delete file plus the bookkeeping
/// Iceberg needs to reconstruct a table's file set at any snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(prefix = "with"), build_fn(error = "crate::error::Error"))]
pub struct ManifestEntry {
    /// Format version the entry was written under
    pub format_version: FormatVersion,
    /// ADDED / EXISTING / DELETED
    pub status: Status,
    /// Snapshot that produced this entry. `None` means "inherit from the
    /// containing manifest's owning snapshot", the v1 behavior.
    #[builder(default)]
    pub snapshot_id: Option<i64>,
    /// Sequence number of the entry. `None` means "inherit", as above.
    #[builder(default)]
    pub sequence_number: Option<i64>,
    /// File-level sequence number, distinct from the data sequence number
    /// for delete files written against an already-committed data file.
    #[builder(default)]
    pub file_sequence_number: Option<i64>,
    /// The referenced file
    pub data_file: DataFile,
}

impl ManifestEntry {
    /// Builder for a new entry.
    pub fn builder() -> ManifestEntryBuilder {
        ManifestEntryBuilder::default()
    }
    /// The referenced file.
    pub fn data_file(&self) -> &DataFile {
        &self.data_file
    }
    /// Entry status.
    pub fn status(&self) -> &Status {
        &self.status
    }
    /// Owning snapshot id, if already assigned.
    pub fn snapshot_id(&self) -> &Option<i64> {
        &self.snapshot_id
    }
    /// Sequence number, if already assigned.
    pub fn sequence_number(&self) -> &Option<i64> {
        &self.sequence_number
    }
    /// Mutable accessor used by readers that infer a missing sequence
    /// number from the containing snapshot.
    pub fn sequence_number_mut(&mut self) -> &mut Option<i64> {
        &mut self.sequence_number
    }

    /// Avro schema for a manifest file whose partition type is
    /// `partition_schema` under `format_version`.
    pub fn schema(partition_schema: &AvroSchema, format_version: &FormatVersion) -> Result<AvroSchema, Error> {
        let partition_json = partition_schema.canonical_form();
        let seq_default = match format_version {
            FormatVersion::V1 => r#", "default": null"#,
            FormatVersion::V2 | FormatVersion::V3 => "",
        };
        let json = format!(
            r#"{{
              "type": "record",
              "name": "manifest_entry",
              "fields": [
                {{"name": "status", "type": "int"}},
                {{"name": "snapshot_id", "type": ["null", "long"]{seq_default}}},
                {{"name": "sequence_number", "type": ["null", "long"]{seq_default}}},
                {{"name": "file_sequence_number", "type": ["null", "long"]{seq_default}}},
                {{"name": "data_file", "type": {{
                  "type": "record",
                  "name": "r2",
                  "fields": [
                    {{"name": "content", "type": "int", "default": 0}},
                    {{"name": "file_path", "type": "string"}},
                    {{"name": "file_format", "type": "string"}},
                    {{"name": "partition", "type": {partition_json}}},
                    {{"name": "record_count", "type": "long"}},
                    {{"name": "file_size_in_bytes", "type": "long"}},
                    {{"name": "equality_ids", "type": ["null", {{"type": "array", "items": "int"}}], "default": null}}
                  ]
                }}}}
              ]
            }}"#
        );
        AvroSchema::parse_str(&json).map_err(Error::from)
    }
}

/// Build the Avro record schema for a partition tuple from a partition
/// spec's fields. Every field is encoded as an optional, named union
/// member so unset partition values round-trip as avro null.
pub fn partition_value_schema(fields: &[PartitionField]) -> Result<AvroSchema, Error> {
    let field_json: Vec<String> = fields
        .iter()
        .map(|f| {
            format!(
                r#"{{"name": "{}", "type": ["null", "string"], "default": null}}"#,
                f.name()
            )
        })
        .collect();
    let json = format!(
        r#"{{"type": "record", "name": "r102", "fields": [{}]}}"#,
        field_json.join(",")
    );
    AvroSchema::parse_str(&json).map_err(Error::from)
}

/// Low-level, non-rolling Avro writer for a single manifest file.
///
/// [`crate`][`crate::manifest`] only knows how to serialize one file at a
/// time; size-bounded rolling across several files is a concern of the
/// `iceberg-rust` writer crate, not of this crate's types.
pub struct ManifestWriter<'schema> {
    inner: AvroWriter<'schema, Vec<u8>>,
    entries_appended: usize,
}

impl<'schema> ManifestWriter<'schema> {
    /// Create a new writer over an in-memory buffer.
    pub fn new(schema: &'schema AvroSchema) -> Self {
        ManifestWriter {
            inner: AvroWriter::new(schema, Vec::new()),
            entries_appended: 0,
        }
    }

    /// Serialize and append one entry.
    pub fn append_ser(&mut self, entry: &ManifestEntry) -> Result<usize, Error> {
        let written = self.inner.append_ser(entry)?;
        self.entries_appended += 1;
        Ok(written)
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.entries_appended == 0
    }

    /// Force the underlying Avro block to flush, returning the encoded
    /// byte length so far. Used by the rolling writer to decide whether
    /// the configured target size has been exceeded.
    pub fn flush(&mut self) -> Result<usize, Error> {
        self.inner.flush().map_err(Error::from)
    }

    /// Consume the writer, returning the encoded manifest bytes.
    pub fn into_inner(self) -> Result<Vec<u8>, Error> {
        self.inner.into_inner().map_err(Error::from)
    }
}

type ReaderIter<'a, R> = std::iter::Map<AvroReader<'a, R>, fn(Result<AvroValue, apache_avro::Error>) -> Result<ManifestEntry, Error>>;

/// Iterator over the entries of a manifest file.
pub struct ManifestReader<'a, R: Read> {
    reader: ReaderIter<'a, R>,
}

impl<'a, R: Read> Iterator for ManifestReader<'a, R> {
    type Item = Result<ManifestEntry, Error>;
    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next()
    }
}

impl<'a, R: Read> ManifestReader<'a, R> {
    /// Open a reader over manifest bytes, inferring the schema from the
    /// Avro file header written by [`ManifestWriter`].
    pub fn new(reader: R) -> Result<Self, Error> {
        fn decode(value: Result<AvroValue, apache_avro::Error>) -> Result<ManifestEntry, Error> {
            let value = value?;
            apache_avro::from_value(&value).map_err(Error::from)
        }
        Ok(ManifestReader {
            reader: AvroReader::new(reader)?.map(decode as _),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Transform;

    fn sample_entry(status: Status) -> ManifestEntry {
        ManifestEntry::builder()
            .with_format_version(FormatVersion::V2)
            .with_status(status)
            .with_snapshot_id(Some(1))
            .with_sequence_number(Some(1))
            .with_data_file(
                DataFile::builder()
                    .with_content(Content::Data)
                    .with_file_path("s3://bucket/data/a.parquet".to_string())
                    .with_file_format("parquet".to_string())
                    .with_partition(Struct::default())
                    .with_record_count(10)
                    .with_file_size_in_bytes(100)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn write_then_read_round_trips_status_and_counts() {
        let fields = vec![PartitionField::new(1, 1000, "id", Transform::Identity)];
        let schema = partition_value_schema(&fields).unwrap();
        let manifest_schema = ManifestEntry::schema(&schema, &FormatVersion::V2).unwrap();

        let mut writer = ManifestWriter::new(&manifest_schema);
        writer.append_ser(&sample_entry(Status::Added)).unwrap();
        writer.append_ser(&sample_entry(Status::Existing)).unwrap();
        let bytes = writer.into_inner().unwrap();

        let reader = ManifestReader::new(std::io::Cursor::new(bytes)).unwrap();
        let entries: Vec<ManifestEntry> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(*entries[0].status(), Status::Added);
        assert_eq!(*entries[1].status(), Status::Existing);
        assert_eq!(entries[0].data_file().record_count(), 10);
    }
}
