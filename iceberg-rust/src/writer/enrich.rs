/*!
Fills in the owning-snapshot id and per-partition-field summaries on a
freshly written manifest (§4.2).

A manifest that already carries attribution (e.g. an `EXISTING` manifest
carried over from a prior snapshot) is returned unchanged - enrichment is
only ever additive, never a way to override an already-assigned owner.
*/

use std::sync::Arc;

use iceberg_rust_spec::manifest::{ManifestEntry, ManifestReader, Status};
use iceberg_rust_spec::manifest_list::{FieldSummary, ManifestListEntry};
use iceberg_rust_spec::values::Value;
use object_store::ObjectStore;
use once_map::OnceMap;

use crate::error::Error;

/// Tallies file/row counts and partition bounds over a manifest's
/// entries, with a concurrent compute-if-absent cache so the same
/// manifest is never re-read and re-tallied twice within one commit
/// attempt.
pub struct ManifestEnricher {
    object_store: Arc<dyn ObjectStore>,
    cache: OnceMap<String, ManifestListEntry>,
}

impl ManifestEnricher {
    /// Build an enricher backed by `object_store` for reading manifest
    /// contents.
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        ManifestEnricher {
            object_store,
            cache: OnceMap::new(),
        }
    }

    /// Enrich `entry`, attributing it to `snapshot_id` if it doesn't
    /// already carry attribution, memoizing by manifest path.
    pub async fn enrich(&self, entry: ManifestListEntry, snapshot_id: i64) -> Result<ManifestListEntry, Error> {
        if entry.added_snapshot_id.is_some() && entry.added_files_count.is_some() {
            return Ok(entry);
        }

        let path = entry.manifest_path.clone();
        if let Some(cached) = self.cache.get_cloned(&path) {
            return Ok(cached);
        }

        let enriched = self.tally(entry, snapshot_id).await?;
        self.cache.insert_cloned(path, enriched.clone());
        Ok(enriched)
    }

    async fn tally(&self, mut entry: ManifestListEntry, snapshot_id: i64) -> Result<ManifestListEntry, Error> {
        let object_path = crate::util::object_store_path(&entry.manifest_path);
        let bytes = self.object_store.get(&object_path).await?.bytes().await?;
        let reader = ManifestReader::new(std::io::Cursor::new(bytes.to_vec()))?;

        let mut added_files = 0i32;
        let mut existing_files = 0i32;
        let mut deleted_files = 0i32;
        let mut added_rows = 0i64;
        let mut existing_rows = 0i64;
        let mut deleted_rows = 0i64;
        let mut partitions: Vec<FieldSummary> = Vec::new();

        for row in reader {
            let row: ManifestEntry = row?;
            match row.status() {
                Status::Added => {
                    added_files += 1;
                    added_rows += row.data_file().record_count();
                }
                Status::Existing => {
                    existing_files += 1;
                    existing_rows += row.data_file().record_count();
                }
                Status::Deleted => {
                    deleted_files += 1;
                    deleted_rows += row.data_file().record_count();
                }
            }
            update_partition_summaries(&mut partitions, row.data_file().partition().0.values().cloned());
        }

        entry.added_snapshot_id = Some(entry.added_snapshot_id.unwrap_or(snapshot_id));
        entry.added_files_count = Some(added_files);
        entry.existing_files_count = Some(existing_files);
        entry.deleted_files_count = Some(deleted_files);
        entry.added_rows_count = Some(added_rows);
        entry.existing_rows_count = Some(existing_rows);
        entry.deleted_rows_count = Some(deleted_rows);
        if !partitions.is_empty() {
            entry.partitions = Some(partitions);
        }
        Ok(entry)
    }
}

fn update_partition_summaries(summaries: &mut Vec<FieldSummary>, values: impl Iterator<Item = Option<Value>>) {
    for (i, value) in values.enumerate() {
        if summaries.len() <= i {
            summaries.push(FieldSummary {
                contains_null: false,
                contains_nan: None,
                lower_bound: None,
                upper_bound: None,
            });
        }
        let summary = &mut summaries[i];
        match value {
            None => summary.contains_null = true,
            Some(v) => {
                summary.lower_bound = Some(match summary.lower_bound.take() {
                    Some(existing) if existing <= v => existing,
                    _ => v.clone(),
                });
                summary.upper_bound = Some(match summary.upper_bound.take() {
                    Some(existing) if existing >= v => existing,
                    _ => v,
                });
            }
        }
    }
}
