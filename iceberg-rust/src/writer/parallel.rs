/*!
Fans data-file groups out across a bounded worker pool, writing one
manifest set per group while preserving group order in the result (§4.3).
*/

use std::sync::Arc;

use iceberg_rust_spec::manifest::ManifestEntry;
use iceberg_rust_spec::partition::PartitionField;
use iceberg_rust_spec::table_metadata::FormatVersion;
use object_store::ObjectStore;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::Error;
use crate::writer::manifest::{manifest_entry_schema, RollingManifestWriter, WrittenManifest};

/// One group of manifest entries to be written as its own set of
/// manifest files, keyed by an index so the caller can restore the
/// original group ordering after concurrent completion.
pub struct EntryGroup {
    /// Position of this group in the caller's original ordering
    pub index: usize,
    /// Entries belonging to this group
    pub entries: Vec<ManifestEntry>,
    /// Partition spec id the entries share
    pub partition_spec_id: i32,
}

/// Result of writing one [`EntryGroup`].
pub struct WrittenGroup {
    /// Position matching the input [`EntryGroup::index`]
    pub index: usize,
    /// Manifests written for this group
    pub manifests: Vec<WrittenManifest>,
    /// First unassigned row id after this group, for format ≥3 callers
    /// that need to seed a subsequent writer
    pub next_row_id: i64,
}

/// Below this many entries per group, splitting further buys no
/// meaningful parallelism and only adds manifest-file overhead.
pub const MIN_FILE_GROUP_SIZE: usize = 10_000;

/// Number of groups to split `file_count` entries into, given up to
/// `worker_count` workers available: `max(1, min(W, ceil(|F| /
/// MIN_FILE_GROUP_SIZE)))`.
pub fn target_group_count(file_count: usize, worker_count: usize) -> usize {
    let by_size = file_count.div_ceil(MIN_FILE_GROUP_SIZE);
    worker_count.min(by_size).max(1)
}

/// Splits `entries` into `target_group_count` contiguous groups of
/// `ceil(|entries| / target_group_count)` elements each, preserving
/// encounter order both within and across groups.
pub fn partition_into_groups(entries: Vec<ManifestEntry>, target_group_count: usize) -> Vec<Vec<ManifestEntry>> {
    if target_group_count <= 1 || entries.len() <= 1 {
        return vec![entries];
    }
    let group_count = target_group_count.min(entries.len());
    let chunk_size = entries.len().div_ceil(group_count);
    entries
        .into_iter()
        .fold(Vec::new(), |mut groups: Vec<Vec<ManifestEntry>>, entry| {
            match groups.last_mut() {
                Some(group) if group.len() < chunk_size => group.push(entry),
                _ => groups.push(vec![entry]),
            }
            groups
        })
}

/// Write every group concurrently, bounded by `worker_count`, stopping
/// and surfacing the first error encountered. Results are returned in
/// the same order the groups were given in, regardless of completion
/// order.
pub async fn write_groups(
    object_store: Arc<dyn ObjectStore>,
    location_prefix: String,
    commit_uuid: uuid::Uuid,
    partition_fields: &[PartitionField],
    format_version: FormatVersion,
    target_size_bytes: usize,
    starting_row_id: i64,
    worker_count: usize,
    groups: Vec<EntryGroup>,
) -> Result<Vec<WrittenGroup>, Error> {
    let schema = Arc::new(manifest_entry_schema(partition_fields, &format_version)?);
    let semaphore = Arc::new(Semaphore::new(worker_count.max(1)));
    let mut tasks = JoinSet::new();

    for group in groups {
        let object_store = object_store.clone();
        let location_prefix = location_prefix.clone();
        let schema = schema.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore is never closed while tasks are outstanding");

            let mut writer = RollingManifestWriter::new(
                object_store,
                &schema,
                location_prefix,
                commit_uuid,
                group.partition_spec_id,
                target_size_bytes,
                starting_row_id,
            );
            for entry in group.entries {
                writer.append(entry).await?;
            }
            let (manifests, next_row_id) = writer.finish().await?;
            Ok::<_, Error>(WrittenGroup {
                index: group.index,
                manifests,
                next_row_id,
            })
        });
    }

    let mut written = Vec::new();
    while let Some(outcome) = tasks.join_next().await {
        match outcome {
            Ok(Ok(group)) => written.push(group),
            Ok(Err(err)) => {
                tasks.abort_all();
                return Err(err);
            }
            Err(join_err) => {
                tasks.abort_all();
                return Err(join_err.into());
            }
        }
    }
    written.sort_by_key(|g| g.index);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use iceberg_rust_spec::manifest::{DataFile, Status};
    use iceberg_rust_spec::partition::Transform;
    use iceberg_rust_spec::values::Struct;

    use super::*;

    fn entry() -> ManifestEntry {
        ManifestEntry::builder()
            .with_format_version(FormatVersion::V2)
            .with_status(Status::Added)
            .with_snapshot_id(Some(1))
            .with_data_file(
                DataFile::builder()
                    .with_content(iceberg_rust_spec::manifest::Content::Data)
                    .with_file_path("s3://bucket/data/a.parquet".to_string())
                    .with_file_format("parquet".to_string())
                    .with_partition(Struct::default())
                    .with_record_count(1)
                    .with_file_size_in_bytes(10)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn partitioning_splits_entries_into_contiguous_groups() {
        let entries = vec![entry(), entry(), entry(), entry(), entry()];
        let groups = partition_into_groups(entries, 2);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1].len(), 2);
    }

    #[test]
    fn a_single_target_group_keeps_everything_together() {
        let entries = vec![entry(), entry()];
        let groups = partition_into_groups(entries, 1);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn group_count_follows_the_file_count_and_worker_bound_formula() {
        assert_eq!(target_group_count(0, 8), 1);
        assert_eq!(target_group_count(1, 8), 1);
        assert_eq!(target_group_count(MIN_FILE_GROUP_SIZE, 8), 1);
        assert_eq!(target_group_count(MIN_FILE_GROUP_SIZE + 1, 8), 2);
        assert_eq!(target_group_count(10 * MIN_FILE_GROUP_SIZE, 4), 4);
    }

    #[tokio::test]
    async fn write_groups_preserves_input_order_in_results() {
        use object_store::memory::InMemory;
        let fields = vec![PartitionField::new(1, 1000, "id", Transform::Identity)];
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

        let groups = vec![
            EntryGroup {
                index: 0,
                entries: vec![entry()],
                partition_spec_id: 0,
            },
            EntryGroup {
                index: 1,
                entries: vec![entry(), entry()],
                partition_spec_id: 0,
            },
        ];

        let written = write_groups(
            store,
            "s3://bucket/metadata".to_string(),
            uuid::Uuid::new_v4(),
            &fields,
            FormatVersion::V2,
            8 * 1024 * 1024,
            0,
            4,
            groups,
        )
        .await
        .unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].index, 0);
        assert_eq!(written[1].index, 1);
    }
}
