/*!
Error type for iceberg
*/

use thiserror::Error;

#[derive(Error, Debug)]
/// Iceberg error
pub enum Error {
    /// Invalid format
    #[error("{0} doesn't have the right format")]
    InvalidFormat(String),
    /// Type error
    #[error("Value {0} doesn't have the {1} type.")]
    Type(String, String),
    /// Schema error
    #[error("Column {0} not in schema {1}.")]
    Schema(String, String),
    /// Conversion error
    #[error("Failed to convert {0} to {1}.")]
    Conversion(String, String),
    /// Not found
    #[error("{0} {1} not found.")]
    NotFound(String, String),
    /// Not supported
    #[error("Feature {0} is not supported.")]
    NotSupported(String),
    /// Avro error
    #[error("avro error")]
    Avro(#[from] apache_avro::Error),
    /// Serde json
    #[error("serde json error")]
    JSONSerde(#[from] serde_json::Error),
    /// Chrono parse
    #[error("chrono parse error")]
    Chrono(#[from] chrono::ParseError),
    /// Uuid error
    #[error("uuid error")]
    Uuid(#[from] uuid::Error),
    /// Io error
    #[error("io error")]
    IO(#[from] std::io::Error),
    /// Objectstore error
    #[error("object store error")]
    ObjectStore(#[from] object_store::Error),
    /// Try from int error
    #[error("try from int error")]
    TryFromInt(#[from] std::num::TryFromIntError),
    /// parse int error
    #[error("parse int error")]
    ParseInt(#[from] std::num::ParseIntError),
    /// A required builder field was never set. The error type for every
    /// `#[builder(build_fn(error = "crate::error::Error"))]` struct in
    /// this crate, so `.build()` returns `Result<T, Error>` directly.
    #[error("missing required field: {0}")]
    UninitializedField(#[from] derive_builder::UninitializedFieldError),
}
