/*!
Snapshots: the immutable, named states a table's file set can be in.
*/

use std::collections::HashMap;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The high-level kind of change a snapshot represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Only additions
    Append,
    /// Data compacted, same logical rows
    Replace,
    /// Files added and removed without changing the logical rows they replace
    Overwrite,
    /// Rows deleted
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Append => "append",
            Operation::Replace => "replace",
            Operation::Overwrite => "overwrite",
            Operation::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// The free-form and well-known keys attached to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// The operation this snapshot represents
    pub operation: Operation,
    /// Well-known and engine-specific summary keys, e.g.
    /// `added-data-files`, `total-records`
    #[serde(flatten)]
    pub other: HashMap<String, String>,
}

/// What kind of ref a [`SnapshotReference`] is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SnapshotRetention {
    /// A mutable pointer; the only valid commit target
    Branch {
        /// Minimum number of snapshots to keep
        #[serde(skip_serializing_if = "Option::is_none")]
        min_snapshots_to_keep: Option<i32>,
        /// Maximum age of a snapshot to keep, in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        max_snapshot_age_ms: Option<i64>,
        /// Maximum age of the ref itself, in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        max_ref_age_ms: Option<i64>,
    },
    /// An immutable pointer; never a valid commit target
    Tag {
        /// Maximum age of the ref itself, in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        max_ref_age_ms: Option<i64>,
    },
}

impl Default for SnapshotRetention {
    fn default() -> Self {
        SnapshotRetention::Branch {
            min_snapshots_to_keep: None,
            max_snapshot_age_ms: None,
            max_ref_age_ms: None,
        }
    }
}

/// A named pointer to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotReference {
    /// Snapshot this ref currently points to
    pub snapshot_id: i64,
    /// Branch or tag, and its retention policy
    #[serde(flatten)]
    pub retention: SnapshotRetention,
}

/// An immutable, named state of a table's file set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder, derive_getters::Getters)]
#[builder(setter(prefix = "with"), build_fn(error = "crate::error::Error"))]
pub struct Snapshot {
    /// Unique id of this snapshot
    snapshot_id: i64,
    /// Snapshot this one was committed on top of, `None` for the first
    /// snapshot on a branch
    #[builder(default)]
    parent_snapshot_id: Option<i64>,
    /// Monotonic sequence number of this snapshot
    sequence_number: i64,
    /// Wall-clock time this snapshot was created, in ms since epoch
    #[builder(default = "chrono::Utc::now().timestamp_millis()")]
    timestamp_ms: i64,
    /// Location of this snapshot's manifest-list file
    manifest_list: String,
    /// Operation and cumulative/delta counters
    summary: Summary,
    /// Schema id active when this snapshot was written
    #[builder(default)]
    schema_id: Option<i32>,
    /// Row-id counter after this snapshot, format version 3 only
    #[builder(default)]
    next_row_id: Option<i64>,
    /// Number of rows assigned by this snapshot, format version 3 only
    #[builder(default)]
    assigned_rows: Option<i64>,
}

impl Snapshot {
    /// Start building a new snapshot.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }
}

/// Generate a random, positive snapshot id.
///
/// Collisions with existing snapshot ids are vanishingly unlikely but not
/// impossible; callers that must guarantee uniqueness (the commit driver)
/// regenerate on collision against the refreshed base metadata.
pub fn generate_snapshot_id() -> i64 {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).expect("system RNG is available");
    (i64::from_le_bytes(bytes)).unsigned_abs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_snapshot_ids_are_non_negative_and_vary() {
        let a = generate_snapshot_id();
        let b = generate_snapshot_id();
        assert!(a >= 0);
        assert!(b >= 0);
        assert_ne!(a, b);
    }

    #[test]
    fn tag_is_not_a_branch() {
        let tag = SnapshotRetention::Tag { max_ref_age_ms: None };
        assert!(!matches!(tag, SnapshotRetention::Branch { .. }));
    }
}
