/*!
Small helpers shared across the commit pipeline.
*/

pub use iceberg_rust_spec::util::strip_prefix;

use object_store::path::Path;

/// Turn a fully qualified location into the relative [`Path`] an
/// [`object_store::ObjectStore`] expects.
pub fn object_store_path(location: &str) -> Path {
    strip_prefix(location).as_str().into()
}
