/*!
Turns a [`SnapshotProducer`]'s contribution into a fully written,
ready-to-commit [`Snapshot`] (§4.5).

The apply procedure:
  1. validate the producer against the base metadata
  2. reject tag commit targets
  3. write new entries to rolled, size-bounded manifests (grouped by
     partition spec, in parallel)
  4. carry forward the parent snapshot's existing manifests, dropping
     any the producer retires
  5. enrich every new manifest with owning-snapshot attribution and
     per-partition-field summaries
  6. assemble and write the manifest-list
  7. roll the row-id counter forward and compute `assigned_rows`
     (format ≥3 only)
  8. fold the producer's delta into the cumulative snapshot summary
  9. build the [`Snapshot`]
*/

use std::sync::Arc;

use iceberg_rust_spec::manifest_list::ManifestListEntry;
use iceberg_rust_spec::snapshot::Snapshot;
use iceberg_rust_spec::table_metadata::{
    TableMetadata, FormatVersion, MANIFEST_TARGET_SIZE_BYTES, MANIFEST_TARGET_SIZE_BYTES_DEFAULT,
};
use object_store::ObjectStore;

use crate::commit::summary::{update_snapshot_summaries, EnvironmentContext};
use crate::error::Error;
use crate::producer::SnapshotProducer;
use crate::writer::enrich::ManifestEnricher;
use crate::writer::manifest_list::ManifestListWriter;
use crate::writer::parallel::{partition_into_groups, target_group_count, write_groups, EntryGroup};

/// Everything produced while assembling a single commit attempt, kept
/// around so the commit driver can clean it up if the attempt loses the
/// optimistic-concurrency race.
pub struct AssembledAttempt {
    /// The snapshot ready to be registered via `TableUpdate::AddSnapshot`
    pub snapshot: Snapshot,
    /// Location of the manifest-list this attempt wrote
    pub manifest_list_location: String,
    /// Locations of every manifest this attempt wrote, for cleanup
    pub written_manifests: Vec<String>,
}

/// Assembles commit attempts against a fixed object store and
/// environment context.
pub struct CommitAssembler {
    object_store: Arc<dyn ObjectStore>,
    environment: Option<EnvironmentContext>,
    worker_count: usize,
}

impl CommitAssembler {
    /// Build an assembler. `worker_count` bounds the parallel group
    /// writer (§5).
    pub fn new(object_store: Arc<dyn ObjectStore>, environment: Option<EnvironmentContext>, worker_count: usize) -> Self {
        CommitAssembler {
            object_store,
            environment,
            worker_count,
        }
    }

    /// Apply `producer` against `base`, writing manifests and a
    /// manifest-list, and return the assembled snapshot.
    pub async fn apply(
        &self,
        producer: &dyn SnapshotProducer,
        base: &TableMetadata,
        branch: Option<&str>,
        snapshot_id: i64,
        commit_uuid: uuid::Uuid,
        attempt: u32,
    ) -> Result<AssembledAttempt, Error> {
        producer.validate(base)?;
        if base.is_tag(branch.unwrap_or("main")) {
            return Err(Error::Validation(format!(
                "{} is a tag and can never be a commit target",
                branch.unwrap_or("main")
            )));
        }

        let parent = base.current_snapshot(branch)?;
        let partition_fields = base.current_partition_fields(branch)?;
        let target_size_bytes = base.property_u64(MANIFEST_TARGET_SIZE_BYTES, MANIFEST_TARGET_SIZE_BYTES_DEFAULT) as usize;
        let location_prefix = format!("{}/metadata", base.location.trim_end_matches('/'));

        let starting_row_id = base.next_row_id().unwrap_or(0);
        let entries = producer.new_entries().to_vec();
        let group_count = target_group_count(entries.len(), self.worker_count.max(1));
        let groups = partition_into_groups(entries, group_count);
        let entry_groups: Vec<EntryGroup> = groups
            .into_iter()
            .enumerate()
            .map(|(index, entries)| EntryGroup {
                index,
                entries,
                partition_spec_id: base.default_spec_id,
            })
            .collect();

        let written_groups = write_groups(
            self.object_store.clone(),
            location_prefix,
            commit_uuid,
            partition_fields,
            base.format_version,
            target_size_bytes,
            starting_row_id,
            self.worker_count,
            entry_groups,
        )
        .await?;

        let mut written_manifests = Vec::new();
        let mut assigned_rows = 0i64;
        let mut new_list_entries = Vec::new();
        for group in &written_groups {
            assigned_rows += group.next_row_id - starting_row_id;
            for manifest in &group.manifests {
                written_manifests.push(manifest.location.clone());
                new_list_entries.push(ManifestListEntry {
                    format_version: base.format_version,
                    manifest_path: manifest.location.clone(),
                    manifest_length: manifest.length,
                    partition_spec_id: manifest.partition_spec_id,
                    content: manifest.content,
                    sequence_number: base.next_sequence_number(),
                    min_sequence_number: base.next_sequence_number(),
                    added_snapshot_id: None,
                    added_files_count: None,
                    existing_files_count: None,
                    deleted_files_count: None,
                    added_rows_count: None,
                    existing_rows_count: None,
                    deleted_rows_count: None,
                    partitions: None,
                    key_metadata: None,
                });
            }
        }

        let enricher = ManifestEnricher::new(self.object_store.clone());
        let mut enriched_entries = Vec::with_capacity(new_list_entries.len());
        for entry in new_list_entries {
            enriched_entries.push(enricher.enrich(entry, snapshot_id).await?);
        }

        let removed: std::collections::HashSet<&str> =
            producer.manifests_to_remove().iter().map(String::as_str).collect();
        let mut list_writer = ManifestListWriter::new(
            &format!("{}/metadata", base.location.trim_end_matches('/')),
            snapshot_id,
            attempt,
            commit_uuid,
            base.format_version,
        );
        if let Some(parent) = parent {
            for existing in self.carried_forward_manifests(parent, base, &removed).await? {
                list_writer.push(existing);
            }
        }
        for entry in enriched_entries {
            list_writer.push(entry);
        }

        let manifest_list_location = list_writer.finish(self.object_store.as_ref()).await?;

        let summary = update_snapshot_summaries(
            producer.operation(),
            producer.summary_delta(),
            parent,
            self.environment.as_ref(),
        );

        let next_row_id = if matches!(base.format_version, FormatVersion::V3) {
            Some(starting_row_id + assigned_rows)
        } else {
            None
        };
        let assigned_rows_field = if matches!(base.format_version, FormatVersion::V3) {
            Some(assigned_rows)
        } else {
            None
        };

        let snapshot = Snapshot::builder()
            .with_snapshot_id(snapshot_id)
            .with_parent_snapshot_id(parent.map(|s| *s.snapshot_id()))
            .with_sequence_number(base.next_sequence_number())
            .with_manifest_list(manifest_list_location.clone())
            .with_summary(summary)
            .with_schema_id(Some(base.current_schema_id))
            .with_next_row_id(next_row_id)
            .with_assigned_rows(assigned_rows_field)
            .build()?;

        Ok(AssembledAttempt {
            snapshot,
            manifest_list_location,
            written_manifests,
        })
    }

    /// Re-read the parent snapshot's manifest-list and carry forward
    /// every entry except those the producer is retiring.
    async fn carried_forward_manifests(
        &self,
        parent: &Snapshot,
        base: &TableMetadata,
        removed: &std::collections::HashSet<&str>,
    ) -> Result<Vec<ManifestListEntry>, Error> {
        let path = crate::util::object_store_path(parent.manifest_list());
        let bytes = self.object_store.get(&path).await?.bytes().await?;
        let schema = ManifestListEntry::schema(&base.format_version)?;
        let reader = apache_avro::Reader::with_schema(&schema, std::io::Cursor::new(bytes.to_vec()))?;

        let mut carried = Vec::new();
        for value in reader {
            let entry = iceberg_rust_spec::manifest_list::avro_value_to_manifest_list_entry(value, base)?;
            if !removed.contains(entry.manifest_path.as_str()) {
                carried.push(entry);
            }
        }
        Ok(carried)
    }
}
