/*!
The narrow surface the snapshot producer consumes from the table's
catalog-backed persistence layer.

`TableOperations` is a collaborator interface only - this crate never
implements it against a real catalog (compare-and-swap persistence,
REST/Glue/SQL catalogs and the like are out of scope, see spec §1).
*/

use std::sync::Arc;

use async_trait::async_trait;
use iceberg_rust_spec::snapshot::{Snapshot, SnapshotReference};
use iceberg_rust_spec::table_metadata::TableMetadata;
use object_store::ObjectStore;

use crate::error::Error;

/// A precondition the caller asserted was true of `base` when it built
/// the corresponding [`TableUpdate`]s. `ops.commit` must reject the
/// commit with a [`Error::Conflict`] if any requirement no longer holds
/// against the table's current metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRequirement {
    /// The named ref must currently point at `snapshot_id`
    AssertRefSnapshotId {
        /// Ref name, e.g. `"main"`
        r#ref: String,
        /// Snapshot the ref is asserted to point to
        snapshot_id: i64,
    },
    /// The table must not exist yet
    AssertCreate,
    /// The table UUID must match
    AssertTableUuid {
        /// Expected table UUID
        uuid: uuid::Uuid,
    },
}

/// One change to apply to table metadata as part of a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum TableUpdate {
    /// Register a newly written snapshot
    AddSnapshot {
        /// The snapshot to add
        snapshot: Snapshot,
    },
    /// Point a branch or tag at a snapshot, creating the ref if absent
    SetSnapshotRef {
        /// Ref name
        ref_name: String,
        /// New ref value
        snapshot_reference: SnapshotReference,
    },
    /// Remove snapshots, e.g. after a REPLACE invalidates prior history
    RemoveSnapshots {
        /// Ids of the snapshots to remove
        snapshot_ids: Vec<i64>,
    },
    /// Merge table properties
    SetProperties {
        /// Properties to set or overwrite
        updates: std::collections::HashMap<String, String>,
    },
}

/// The collaborator the snapshot producer reads a base from and
/// compare-and-swaps a candidate metadata update against.
///
/// `current()` and `refresh()` both return an owned [`TableMetadata`]
/// rather than a borrow: a catalog client's local cache is typically
/// guarded by a lock or an `Arc` swap, and handing back a clone avoids
/// tying the caller's lifetime to that guard.
#[async_trait]
pub trait TableOperations: Send + Sync {
    /// A clone of the metadata this instance currently has cached.
    fn current(&self) -> TableMetadata;

    /// Re-read metadata from the catalog, picking up concurrent commits.
    async fn refresh(&self) -> Result<TableMetadata, Error>;

    /// Atomically swap `base` for the metadata produced by applying
    /// `requirement` (if any) and `updates` against it.
    ///
    /// Implementations must return [`Error::Conflict`] when `base` is
    /// stale and [`Error::CommitStateUnknown`] when the outcome of the
    /// underlying write could not be determined.
    async fn commit(
        &self,
        base: &TableMetadata,
        requirement: Option<TableRequirement>,
        updates: Vec<TableUpdate>,
    ) -> Result<TableMetadata, Error>;

    /// Object store backing this table's location.
    fn io(&self) -> Arc<dyn ObjectStore>;

    /// Build the on-disk location for a named metadata file, e.g. a
    /// manifest or manifest-list.
    fn metadata_file_location(&self, file_name: &str) -> String {
        format!("{}/metadata/{}", self.current().location, file_name)
    }

    /// Mint a snapshot id, refreshing against `base` to avoid collisions.
    fn new_snapshot_id(&self) -> i64 {
        iceberg_rust_spec::snapshot::generate_snapshot_id()
    }

    /// Whether non-cleanable failures should still skip cleanup of
    /// attempted manifest-lists (`strictCleanup`, see spec §7).
    fn requires_strict_cleanup(&self) -> bool {
        false
    }
}
