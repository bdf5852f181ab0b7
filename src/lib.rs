/*!
# Daylog

Daylog is a local-first daily todo list and journal. Todos and free-text
journal entries are stored per calendar day on the local machine; there is no
server and no sync. Data moves between devices by exporting a JSON document on
one and importing it on the other.

## Core Features

- Add todos for today or for the next couple of days, and toggle them
- Todos stay toggleable for two days after their date, then freeze
- Write journal entries for today
- Export everything as one JSON document
- Import a document from another device, merging without duplicates

## Architecture

- `dates`: date keys and the date window rules
- `model`: todos, journal entries and date-keyed collections
- `storage`: key-value store trait, in-memory and file-backed stores
- `tracker`: add, toggle and query operations
- `validate`: structural checks on untrusted import documents
- `merge`: duplicate-free merging of date-keyed collections
- `transfer`: export and import orchestration
- `config`, `errors`, `cli`: ambient plumbing for the binary

## Usage Example

```rust
use daylog::storage::MemoryStore;
use daylog::transfer;
use daylog::{DateKey, Tracker};
use chrono::{Local, Utc};

fn main() -> daylog::AppResult<()> {
    let now = Local::now();
    let mut tracker = Tracker::new(MemoryStore::new());

    let todo = tracker.add_todo("Buy milk", &now)?;
    tracker.toggle_todo(DateKey::new(now.date_naive()), &todo.id, &now)?;

    let text = transfer::export_json(tracker.storage(), now.with_timezone(&Utc))?;
    let outcome = transfer::import_text(tracker.storage_mut(), &text);
    assert!(outcome.success);
    assert_eq!(outcome.stats.todos_added, 0);
    Ok(())
}
```
*/

/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Storage keys, format tags and date window constants
pub mod constants;
/// Date keys and date window rules
pub mod dates;
/// Error types and utilities for error handling
pub mod errors;
/// Duplicate-free merging of date-keyed collections
pub mod merge;
/// Domain records and collections
pub mod model;
/// Persistent key-value storage
pub mod storage;
/// Add, toggle and query operations
pub mod tracker;
/// Export and import orchestration
pub mod transfer;
/// Structural validation of import documents
pub mod validate;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use dates::DateKey;
pub use errors::{AppError, AppResult};
pub use tracker::Tracker;
