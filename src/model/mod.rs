//! Domain records and the date-keyed collections that hold them.
//!
//! Todos and journal entries are stored per local calendar day. A
//! [`DateKeyedCollection`] maps each [`DateKey`] to the ordered bucket of
//! records created for that day. Collections are `BTreeMap`s, so iteration
//! (and therefore serialization and export) is always in date order.

use crate::dates::DateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Mapping from a calendar day to the records created for it.
pub type DateKeyedCollection<T> = BTreeMap<DateKey, Vec<T>>;

/// All todos, keyed by day.
pub type TodosByDate = DateKeyedCollection<Todo>;

/// All journal entries, keyed by day.
pub type JournalByDate = DateKeyedCollection<JournalEntry>;

/// Common view over records that live in a date bucket.
///
/// The merge engine only needs an identity to de-duplicate on and a creation
/// time to order by.
pub trait Record {
    /// Identifier, unique within its date bucket.
    fn id(&self) -> &str;

    /// Creation instant used to order a bucket.
    fn created_at(&self) -> DateTime<Utc>;
}

/// A single task on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier (a v4 UUID for locally created todos)
    pub id: String,
    /// What needs doing; never empty
    pub text: String,
    /// Whether the task is done
    pub completed: bool,
    /// When the todo was created
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Todo {
    /// Creates a new, not yet completed todo with a fresh identifier.
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Todo {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
            created_at,
        }
    }
}

impl Record for Todo {
    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A free-text journal note. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Unique identifier (a v4 UUID for locally created entries)
    pub id: String,
    /// The note itself
    pub text: String,
    /// When the entry was written
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Creates a new entry with a fresh identifier.
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        JournalEntry {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            created_at,
        }
    }
}

impl Record for JournalEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Self-contained snapshot of everything stored, used for manual transfer
/// between devices. It is produced by export and consumed by import, and is
/// never persisted itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Format version tag
    pub version: String,
    /// RFC 3339 timestamp of when the export was taken
    pub export_date: String,
    /// All todos
    #[serde(default)]
    pub todos: TodosByDate,
    /// All journal entries
    #[serde(default)]
    pub journal: JournalByDate,
}

/// Completed and total todo counts for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TodoStats {
    /// Number of completed todos
    pub completed: usize,
    /// Number of todos
    pub total: usize,
}

/// Total number of records across every bucket of a collection.
pub fn count_items<T>(collection: &DateKeyedCollection<T>) -> usize {
    collection.values().map(Vec::len).sum()
}

/// Serde adapter for timestamps.
///
/// Writes RFC 3339 in UTC with millisecond precision and a `Z` suffix
/// (`2024-01-15T09:30:00.000Z`). Reads any RFC 3339 timestamp and normalizes
/// it to UTC.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Formats a timestamp in its canonical stored form.
    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}
