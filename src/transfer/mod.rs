//! Export and import of the complete dataset.
//!
//! Export snapshots both documents into an [`ExportDocument`]. Import takes
//! raw text from another device, validates it, merges it into what is stored
//! and persists both merged documents together.
//!
//! Import never returns an error. Every failure, from unparsable text to a
//! failed write, becomes an [`ImportOutcome`] with `success == false` and a
//! message suitable for showing to the user. Nothing is written unless both
//! merges succeed.

use crate::constants::EXPORT_VERSION;
use crate::errors::{AppResult, ImportError, StorageError};
use crate::merge::merge;
use crate::model::{count_items, timestamp, ExportDocument};
use crate::storage::{KeyValueStore, Storage};
use crate::validate::parse_document;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Number of records an import added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    /// Todos that were not already present
    pub todos_added: usize,
    /// Journal entries that were not already present
    pub journal_entries_added: usize,
}

/// User-facing result of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// Whether the merged data was persisted
    pub success: bool,
    /// Summary or diagnostic message
    pub message: String,
    /// Counts of added records (all zero on failure)
    pub stats: ImportStats,
}

impl From<Result<ImportStats, ImportError>> for ImportOutcome {
    fn from(result: Result<ImportStats, ImportError>) -> Self {
        match result {
            Ok(stats) => ImportOutcome {
                success: true,
                message: format!(
                    "Successfully imported {} todos and {} journal entries",
                    stats.todos_added, stats.journal_entries_added
                ),
                stats,
            },
            Err(e) => ImportOutcome {
                success: false,
                message: e.to_string(),
                stats: ImportStats::default(),
            },
        }
    }
}

/// Snapshots every stored todo and journal entry.
///
/// # Errors
///
/// Returns `StorageError` if either document cannot be read.
pub fn export_all<S: KeyValueStore>(
    storage: &Storage<S>,
    now: DateTime<Utc>,
) -> Result<ExportDocument, StorageError> {
    let todos = storage.load_todos()?;
    let journal = storage.load_journal()?;
    info!(
        "Exporting {} todos and {} journal entries",
        count_items(&todos),
        count_items(&journal)
    );

    Ok(ExportDocument {
        version: EXPORT_VERSION.to_string(),
        export_date: timestamp::format(&now),
        todos,
        journal,
    })
}

/// [`export_all`] rendered as pretty-printed JSON text.
pub fn export_json<S: KeyValueStore>(storage: &Storage<S>, now: DateTime<Utc>) -> AppResult<String> {
    let document = export_all(storage, now)?;
    let text = serde_json::to_string_pretty(&document).map_err(|source| StorageError::Serialize {
        key: "export".to_string(),
        source,
    })?;
    Ok(text)
}

/// Imports raw text, which is expected to be an export document.
///
/// Text that is not JSON at all is reported separately from JSON that fails
/// validation.
pub fn import_text<S: KeyValueStore>(storage: &mut Storage<S>, raw: &str) -> ImportOutcome {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => import_and_merge(storage, value),
        Err(e) => {
            warn!("Import rejected, payload is not JSON: {}", e);
            ImportOutcome::from(Err::<ImportStats, _>(ImportError::MalformedInput(e)))
        }
    }
}

/// Validates `doc`, merges it into the stored data and persists the result.
pub fn import_and_merge<S: KeyValueStore>(storage: &mut Storage<S>, doc: Value) -> ImportOutcome {
    let result = try_import(storage, doc);
    if let Err(e) = &result {
        warn!("Import failed: {}", e);
    }
    ImportOutcome::from(result)
}

fn try_import<S: KeyValueStore>(
    storage: &mut Storage<S>,
    doc: Value,
) -> Result<ImportStats, ImportError> {
    let incoming = parse_document(doc)?;
    debug!(
        "Validated import document version {} exported {}",
        incoming.version, incoming.export_date
    );

    let current_todos = storage.load_todos()?;
    let current_journal = storage.load_journal()?;
    let todo_baseline = count_items(&current_todos);
    let journal_baseline = count_items(&current_journal);

    let merged_todos = merge(&current_todos, &incoming.todos);
    let merged_journal = merge(&current_journal, &incoming.journal);

    storage.save_all(&merged_todos, &merged_journal)?;

    let stats = ImportStats {
        todos_added: count_items(&merged_todos).saturating_sub(todo_baseline),
        journal_entries_added: count_items(&merged_journal).saturating_sub(journal_baseline),
    };
    info!(
        "Imported {} todos and {} journal entries",
        stats.todos_added, stats.journal_entries_added
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::INVALID_JSON_MESSAGE;
    use crate::dates::DateKey;
    use crate::model::{Todo, TodosByDate};
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap()
    }

    fn seeded() -> Storage<MemoryStore> {
        let mut storage = Storage::new(MemoryStore::new());
        let mut todos = TodosByDate::new();
        todos.insert(
            "2024-01-15".parse().unwrap(),
            vec![Todo {
                id: "existing".to_string(),
                text: "Buy milk".to_string(),
                completed: false,
                created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            }],
        );
        storage.save_todos(&todos).unwrap();
        storage
    }

    #[test]
    fn test_export_all_snapshot() {
        let storage = seeded();
        let doc = export_all(&storage, now()).unwrap();
        assert_eq!(doc.version, "1.0.0");
        assert_eq!(doc.export_date, "2024-01-20T12:00:00.000Z");
        assert_eq!(count_items(&doc.todos), 1);
        assert!(doc.journal.is_empty());
    }

    #[test]
    fn test_export_json_is_importable() {
        let storage = seeded();
        let text = export_json(&storage, now()).unwrap();

        let mut other = Storage::new(MemoryStore::new());
        let outcome = import_text(&mut other, &text);
        assert!(outcome.success);
        assert_eq!(outcome.stats.todos_added, 1);
        assert_eq!(other.load_todos().unwrap(), storage.load_todos().unwrap());
    }

    #[test]
    fn test_import_counts_only_new_todos() {
        let mut storage = seeded();
        let doc = json!({
            "version": "1.0.0",
            "exportDate": "2024-01-20T00:00:00Z",
            "todos": {
                "2024-01-15": [
                    { "id": "existing", "text": "Buy milk", "completed": true, "createdAt": "2024-01-15T09:00:00Z" },
                    { "id": "new", "text": "Walk dog", "completed": false, "createdAt": "2024-01-15T08:00:00Z" }
                ]
            }
        });

        let outcome = import_and_merge(&mut storage, doc);
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(
            outcome.stats,
            ImportStats {
                todos_added: 1,
                journal_entries_added: 0
            }
        );
        assert_eq!(
            outcome.message,
            "Successfully imported 1 todos and 0 journal entries"
        );

        let day: DateKey = "2024-01-15".parse().unwrap();
        let bucket = storage.load_todos().unwrap().remove(&day).unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].id, "new");
        // Existing record is kept as-is
        assert!(!bucket[1].completed);
    }

    #[test]
    fn test_import_invalid_json() {
        let mut storage = seeded();
        let outcome = import_text(&mut storage, "{ this is not json");
        assert!(!outcome.success);
        assert_eq!(outcome.message, INVALID_JSON_MESSAGE);
        assert_eq!(outcome.stats, ImportStats::default());
    }

    #[test]
    fn test_import_validation_failure_persists_nothing() {
        let mut storage = seeded();
        let before = storage.store().clone();

        let outcome = import_and_merge(&mut storage, json!({ "todos": {} }));
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Invalid data format: Missing version field, Missing export date"
        );
        assert_eq!(
            storage.store().read("todos").unwrap(),
            before.read("todos").unwrap()
        );
        assert_eq!(storage.store().read("journal").unwrap(), None);
    }

    #[test]
    fn test_import_null_payload() {
        let mut storage = seeded();
        let outcome = import_text(&mut storage, "null");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Invalid data format: No data provided");
    }

    #[test]
    fn test_import_bad_timestamp_is_reported() {
        let mut storage = seeded();
        let doc = json!({
            "version": "1.0.0",
            "exportDate": "2024-01-20T00:00:00Z",
            "journal": { "2024-01-15": [ { "id": "j", "text": "t", "createdAt": "soon" } ] }
        });
        let outcome = import_and_merge(&mut storage, doc);
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Import failed:"));
        assert_eq!(storage.store().read("journal").unwrap(), None);
    }

    #[test]
    fn test_reimport_adds_nothing() {
        let mut storage = seeded();
        let text = export_json(&storage, now()).unwrap();

        let outcome = import_text(&mut storage, &text);
        assert!(outcome.success);
        assert_eq!(outcome.stats, ImportStats::default());
    }

    #[test]
    fn test_outcome_serializes_camel_case_stats() {
        let outcome = ImportOutcome::from(Ok::<_, ImportError>(ImportStats {
            todos_added: 2,
            journal_entries_added: 3,
        }));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["stats"]["todosAdded"], 2);
        assert_eq!(value["stats"]["journalEntriesAdded"], 3);
        assert_eq!(value["success"], true);
    }
}
