/*!
Minimal table-schema representation.

Schema evolution and full type resolution are out of scope for this
crate (see the top-level Non-goals) - only what the snapshot producer
needs to name a schema and look up a field by id/name is kept.
*/

use serde::{Deserialize, Serialize};

/// A single column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field id, stable across schema evolution
    pub id: i32,
    /// Field name
    pub name: String,
    /// Whether the field may be null
    pub required: bool,
}

/// A versioned set of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    schema_id: i32,
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Create a new schema.
    pub fn new(schema_id: i32, fields: Vec<SchemaField>) -> Self {
        Schema { schema_id, fields }
    }
    /// Id of this schema.
    pub fn schema_id(&self) -> &i32 {
        &self.schema_id
    }
    /// Ordered fields of this schema.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }
}
