/*!
Core Iceberg table-format types: schemas, partition specs, manifests,
manifest lists, snapshots and table metadata.

This crate only covers what a snapshot producer needs to read a base
metadata pointer and describe a new snapshot - it intentionally leaves
out query planning, full type resolution, and catalog persistence.
*/

pub mod error;
pub mod manifest;
pub mod manifest_list;
pub mod partition;
pub mod schema;
pub mod snapshot;
pub mod table_metadata;
pub mod util;
pub mod values;

/// Re-exports mirroring the historical `spec::` module paths, kept so
/// call sites can spell out `iceberg_rust_spec::spec::manifest::DataFile`
/// as well as the shorter `iceberg_rust_spec::manifest::DataFile`.
pub mod spec {
    pub use crate::manifest;
    pub use crate::manifest_list;
    pub use crate::partition;
    pub use crate::schema;
    pub use crate::snapshot;
    pub use crate::table_metadata;
    pub use crate::values;
}
