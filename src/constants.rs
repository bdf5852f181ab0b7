//! Application-wide constants.
//!
//! This module centralizes the storage keys, the export format tag and the
//! date-window rules so the rest of the crate never hard-codes them.

/// Storage key of the todos-by-date document.
pub const TODOS_KEY: &str = "todos";

/// Storage key of the journal-by-date document.
pub const JOURNAL_KEY: &str = "journal";

/// Version tag written into every export document.
pub const EXPORT_VERSION: &str = "1.0.0";

/// Canonical date key format (YYYY-MM-DD).
pub const DATE_FORMAT_ISO: &str = "%Y-%m-%d";

/// Length of a canonical date key in bytes.
pub const DATE_KEY_LEN: usize = 10;

/// Number of days after a date during which its todos can still be toggled.
pub const TOGGLE_GRACE_DAYS: i64 = 2;

/// How many days ahead (including today) content can be planned.
pub const FUTURE_DAYS: i64 = 3;

/// Default data directory when `DAYLOG_DIR` is not set.
pub const DEFAULT_DATA_DIR: &str = "~/.daylog";

/// Environment variable selecting the data directory.
pub const ENV_DATA_DIR: &str = "DAYLOG_DIR";

/// Environment variable selecting the log output format (`json` or `text`).
pub const ENV_LOG_FORMAT: &str = "DAYLOG_LOG_FORMAT";

/// Name of the advisory lock file held while a store is open.
pub const LOCK_FILE_NAME: &str = "daylog.lock";

/// Name of the write-ahead staging file used for multi-document writes.
pub const PENDING_FILE_NAME: &str = "pending.json";

/// Message returned when an import payload is not parsable JSON.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON format. Please check your data.";
