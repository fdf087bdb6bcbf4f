/*!
Rolls a commit attempt's delta counters into the cumulative
snapshot-summary properties Iceberg readers rely on (§4.4).
*/

use std::collections::HashMap;

use iceberg_rust_spec::snapshot::{Operation, Snapshot, Summary};

/// Engine identity injected into a snapshot's summary, analogous to
/// Iceberg's `engine-name`/`engine-version` summary properties.
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    /// Name of the engine producing this snapshot, e.g. `"iceberg-rust"`
    pub engine_name: String,
    /// Version string of the engine
    pub engine_version: String,
}

const TOTAL_DATA_FILES: &str = "total-data-files";
const TOTAL_DELETE_FILES: &str = "total-delete-files";
const TOTAL_RECORDS: &str = "total-records";
const TOTAL_FILE_SIZE: &str = "total-files-size";
const TOTAL_POSITION_DELETES: &str = "total-position-deletes";
const TOTAL_EQUALITY_DELETES: &str = "total-equality-deletes";
const ADDED_DATA_FILES: &str = "added-data-files";
const DELETED_DATA_FILES: &str = "deleted-data-files";
const ADDED_DELETE_FILES: &str = "added-delete-files";
const REMOVED_DELETE_FILES: &str = "removed-delete-files";
const ADDED_RECORDS: &str = "added-records";
const DELETED_RECORDS: &str = "deleted-records";
const ADDED_FILE_SIZE: &str = "added-files-size";
const REMOVED_FILE_SIZE: &str = "removed-files-size";
const ADDED_POSITION_DELETES: &str = "added-position-deletes";
const REMOVED_POSITION_DELETES: &str = "removed-position-deletes";
const ADDED_EQUALITY_DELETES: &str = "added-equality-deletes";
const REMOVED_EQUALITY_DELETES: &str = "removed-equality-deletes";
const ENGINE_NAME: &str = "engine-name";
const ENGINE_VERSION: &str = "engine-version";

/// Per-attempt counters the assembler tallies while enriching manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryDelta {
    /// Data files added by this attempt
    pub added_data_files: i64,
    /// Data files removed by this attempt
    pub deleted_data_files: i64,
    /// Delete files added by this attempt
    pub added_delete_files: i64,
    /// Delete files removed by this attempt
    pub removed_delete_files: i64,
    /// Rows added
    pub added_records: i64,
    /// Rows removed
    pub deleted_records: i64,
    /// Bytes added
    pub added_file_size: i64,
    /// Bytes removed
    pub removed_file_size: i64,
    /// Position-delete rows added
    pub added_position_deletes: i64,
    /// Position-delete rows removed
    pub removed_position_deletes: i64,
    /// Equality-delete rows added
    pub added_equality_deletes: i64,
    /// Equality-delete rows removed
    pub removed_equality_deletes: i64,
}

/// One cumulative property: its total key, and the delta keys/values that
/// roll into it for this attempt.
struct Cumulative<'a> {
    total_key: &'a str,
    added_key: &'a str,
    added: i64,
    removed_key: &'a str,
    removed: i64,
}

/// Fold one cumulative property forward per §4.4: if there was no
/// predecessor snapshot at all, start from the zero vector; if a
/// predecessor exists but doesn't carry this particular property, skip
/// it rather than assuming zero; a result that would go negative is
/// skipped too rather than clamped.
fn fold_cumulative(parent_other: Option<&HashMap<String, String>>, prop: &Cumulative, out: &mut HashMap<String, String>) {
    let base = match parent_other {
        None => Some(0i64),
        Some(p) => p.get(prop.total_key).and_then(|v| v.parse::<i64>().ok()),
    };
    let Some(base) = base else {
        return;
    };
    let new_total = base + prop.added - prop.removed;
    if new_total >= 0 {
        out.insert(prop.total_key.to_owned(), new_total.to_string());
    }
}

/// Build the summary for a new snapshot, folding `delta` into the
/// cumulative totals carried on `parent`'s summary, if any.
pub fn update_snapshot_summaries(
    operation: Operation,
    delta: SummaryDelta,
    parent: Option<&Snapshot>,
    environment: Option<&EnvironmentContext>,
) -> Summary {
    let parent_other = parent.map(|s| &s.summary().other);

    let mut other = HashMap::new();
    let cumulative_properties = [
        Cumulative {
            total_key: TOTAL_DATA_FILES,
            added_key: ADDED_DATA_FILES,
            added: delta.added_data_files,
            removed_key: DELETED_DATA_FILES,
            removed: delta.deleted_data_files,
        },
        Cumulative {
            total_key: TOTAL_DELETE_FILES,
            added_key: ADDED_DELETE_FILES,
            added: delta.added_delete_files,
            removed_key: REMOVED_DELETE_FILES,
            removed: delta.removed_delete_files,
        },
        Cumulative {
            total_key: TOTAL_RECORDS,
            added_key: ADDED_RECORDS,
            added: delta.added_records,
            removed_key: DELETED_RECORDS,
            removed: delta.deleted_records,
        },
        Cumulative {
            total_key: TOTAL_FILE_SIZE,
            added_key: ADDED_FILE_SIZE,
            added: delta.added_file_size,
            removed_key: REMOVED_FILE_SIZE,
            removed: delta.removed_file_size,
        },
        Cumulative {
            total_key: TOTAL_POSITION_DELETES,
            added_key: ADDED_POSITION_DELETES,
            added: delta.added_position_deletes,
            removed_key: REMOVED_POSITION_DELETES,
            removed: delta.removed_position_deletes,
        },
        Cumulative {
            total_key: TOTAL_EQUALITY_DELETES,
            added_key: ADDED_EQUALITY_DELETES,
            added: delta.added_equality_deletes,
            removed_key: REMOVED_EQUALITY_DELETES,
            removed: delta.removed_equality_deletes,
        },
    ];
    for prop in &cumulative_properties {
        fold_cumulative(parent_other, prop, &mut other);
    }

    if delta.added_data_files != 0 {
        other.insert(ADDED_DATA_FILES.to_owned(), delta.added_data_files.to_string());
    }
    if delta.deleted_data_files != 0 {
        other.insert(DELETED_DATA_FILES.to_owned(), delta.deleted_data_files.to_string());
    }
    if delta.added_delete_files != 0 {
        other.insert(ADDED_DELETE_FILES.to_owned(), delta.added_delete_files.to_string());
    }
    if delta.removed_delete_files != 0 {
        other.insert(REMOVED_DELETE_FILES.to_owned(), delta.removed_delete_files.to_string());
    }
    if delta.added_records != 0 {
        other.insert(ADDED_RECORDS.to_owned(), delta.added_records.to_string());
    }
    if delta.deleted_records != 0 {
        other.insert(DELETED_RECORDS.to_owned(), delta.deleted_records.to_string());
    }
    if delta.added_file_size != 0 {
        other.insert(ADDED_FILE_SIZE.to_owned(), delta.added_file_size.to_string());
    }
    if delta.removed_file_size != 0 {
        other.insert(REMOVED_FILE_SIZE.to_owned(), delta.removed_file_size.to_string());
    }
    if delta.added_position_deletes != 0 {
        other.insert(ADDED_POSITION_DELETES.to_owned(), delta.added_position_deletes.to_string());
    }
    if delta.removed_position_deletes != 0 {
        other.insert(
            REMOVED_POSITION_DELETES.to_owned(),
            delta.removed_position_deletes.to_string(),
        );
    }
    if delta.added_equality_deletes != 0 {
        other.insert(ADDED_EQUALITY_DELETES.to_owned(), delta.added_equality_deletes.to_string());
    }
    if delta.removed_equality_deletes != 0 {
        other.insert(
            REMOVED_EQUALITY_DELETES.to_owned(),
            delta.removed_equality_deletes.to_string(),
        );
    }

    if let Some(env) = environment {
        other.insert(ENGINE_NAME.to_owned(), env.engine_name.clone());
        other.insert(ENGINE_VERSION.to_owned(), env.engine_version.clone());
    }

    Summary { operation, other }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_summary(other: HashMap<String, String>) -> Snapshot {
        Snapshot::builder()
            .with_snapshot_id(1)
            .with_sequence_number(1)
            .with_manifest_list("s3://bucket/metadata/snap-1.avro".to_owned())
            .with_summary(Summary {
                operation: Operation::Append,
                other,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn first_snapshot_has_no_parent_totals_to_roll_forward() {
        let delta = SummaryDelta {
            added_data_files: 3,
            added_records: 100,
            added_file_size: 1000,
            ..Default::default()
        };
        let summary = update_snapshot_summaries(Operation::Append, delta, None, None);
        assert_eq!(summary.other.get(TOTAL_DATA_FILES).unwrap(), "3");
        assert_eq!(summary.other.get(TOTAL_RECORDS).unwrap(), "100");
        assert_eq!(summary.other.get(ADDED_DATA_FILES).unwrap(), "3");
    }

    #[test]
    fn cumulative_totals_roll_forward_from_the_parent() {
        let mut parent_other = HashMap::new();
        parent_other.insert(TOTAL_DATA_FILES.to_owned(), "10".to_owned());
        parent_other.insert(TOTAL_RECORDS.to_owned(), "500".to_owned());
        let parent = snapshot_with_summary(parent_other);

        let delta = SummaryDelta {
            added_data_files: 2,
            deleted_data_files: 1,
            added_records: 50,
            ..Default::default()
        };
        let summary = update_snapshot_summaries(Operation::Overwrite, delta, Some(&parent), None);
        assert_eq!(summary.other.get(TOTAL_DATA_FILES).unwrap(), "11");
        assert_eq!(summary.other.get(TOTAL_RECORDS).unwrap(), "550");
        // the parent summary never carried these totals, so they're left
        // out rather than assumed to start at zero
        assert!(summary.other.get(TOTAL_FILE_SIZE).is_none());
        assert!(summary.other.get(TOTAL_DELETE_FILES).is_none());
    }

    #[test]
    fn a_property_that_would_go_negative_is_left_out() {
        let mut parent_other = HashMap::new();
        parent_other.insert(TOTAL_DATA_FILES.to_owned(), "1".to_owned());
        let parent = snapshot_with_summary(parent_other);

        let delta = SummaryDelta {
            deleted_data_files: 5,
            ..Default::default()
        };
        let summary = update_snapshot_summaries(Operation::Overwrite, delta, Some(&parent), None);
        assert!(summary.other.get(TOTAL_DATA_FILES).is_none());
        assert_eq!(summary.other.get(DELETED_DATA_FILES).unwrap(), "5");
    }

    #[test]
    fn position_and_equality_deletes_roll_forward_as_cumulative_properties() {
        let delta = SummaryDelta {
            added_position_deletes: 4,
            added_equality_deletes: 2,
            ..Default::default()
        };
        let summary = update_snapshot_summaries(Operation::Overwrite, delta, None, None);
        assert_eq!(summary.other.get(TOTAL_POSITION_DELETES).unwrap(), "4");
        assert_eq!(summary.other.get(TOTAL_EQUALITY_DELETES).unwrap(), "2");
    }

    #[test]
    fn environment_context_is_attached_when_provided() {
        let env = EnvironmentContext {
            engine_name: "iceberg-rust".to_owned(),
            engine_version: "0.1.0".to_owned(),
        };
        let summary = update_snapshot_summaries(Operation::Append, SummaryDelta::default(), None, Some(&env));
        assert_eq!(summary.other.get(ENGINE_NAME).unwrap(), "iceberg-rust");
    }
}
