/*!
Partition spec types.
*/

use serde::{Deserialize, Serialize};

/// How a source column is transformed into a partition value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Value is used unmodified
    Identity,
    /// Value is bucketed into `n` buckets
    Bucket(u32),
    /// Value is truncated to `n` units
    Truncate(u32),
    /// Extract the year
    Year,
    /// Extract the month
    Month,
    /// Extract the day
    Day,
    /// Extract the hour
    Hour,
    /// Always null, used to keep a partition-spec id stable across evolutions
    Void,
}

/// A single partition field, binding a source column to a transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionField {
    source_id: i32,
    field_id: i32,
    name: String,
    transform: Transform,
}

impl PartitionField {
    /// Create a new partition field.
    pub fn new(source_id: i32, field_id: i32, name: impl Into<String>, transform: Transform) -> Self {
        PartitionField {
            source_id,
            field_id,
            name: name.into(),
            transform,
        }
    }
    /// Id of the source column this field is derived from.
    pub fn source_id(&self) -> i32 {
        self.source_id
    }
    /// Id of this partition field.
    pub fn field_id(&self) -> i32 {
        self.field_id
    }
    /// Name of the partition field.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Transform applied to the source column.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }
}

/// A named, ordered collection of partition fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    spec_id: i32,
    fields: Vec<PartitionField>,
}

impl PartitionSpec {
    /// Create a new partition spec.
    pub fn new(spec_id: i32, fields: Vec<PartitionField>) -> Self {
        PartitionSpec { spec_id, fields }
    }
    /// Id of this partition spec.
    pub fn spec_id(&self) -> i32 {
        self.spec_id
    }
    /// Ordered partition fields of this spec.
    pub fn fields(&self) -> &[PartitionField] {
        &self.fields
    }
}
