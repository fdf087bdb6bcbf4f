/*!
Snapshot producer: assembles manifests, manifest-lists and a snapshot
for a single table mutation, and commits it against a catalog with
optimistic-concurrency retry.

This crate consumes [`iceberg_rust_spec`] types and a caller-supplied
[`catalog::commit::TableOperations`] implementation; it does not
implement a catalog, a query engine, or an object store itself.
*/

pub mod catalog;
pub mod commit;
pub mod error;
pub mod producer;
pub mod util;
pub mod writer;
