//! Error handling utilities for the daylog application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! Import has its own error type, [`ImportError`], because an import never
//! propagates a failure to its caller: each variant is turned into a
//! user-facing message by the transfer module.

use crate::constants::INVALID_JSON_MESSAGE;
use crate::dates::DateKey;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error produced when a string is not a canonical `YYYY-MM-DD` date key.
///
/// # Examples
///
/// ```
/// use daylog::errors::DateKeyError;
///
/// let error = DateKeyError::Malformed {
///     input: "2024-1-5".to_string(),
/// };
/// assert!(format!("{}", error).contains("2024-1-5"));
/// assert!(format!("{}", error).contains("YYYY-MM-DD"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateKeyError {
    /// The input does not have the `YYYY-MM-DD` shape or is not a real calendar day.
    #[error("Invalid date key '{input}': expected a calendar date in YYYY-MM-DD format")]
    Malformed {
        /// The rejected input
        input: String,
    },
}

/// Represents failures of the persistent key-value store.
///
/// Every variant names the logical document (`todos` or `journal`) that was
/// being read or written so the message can be surfaced to the user as-is.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading a stored document failed.
    #[error("Failed to read stored document '{key}': {source}")]
    Read {
        /// Storage key being read
        key: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing a stored document failed.
    #[error("Failed to write stored document '{key}': {source}")]
    Write {
        /// Storage key being written
        key: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A stored document is not valid JSON for its expected shape.
    #[error("Stored document '{key}' is corrupt: {source}")]
    Corrupt {
        /// Storage key of the corrupt document
        key: String,
        /// The underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// A document could not be serialized before writing.
    #[error("Failed to serialize document '{key}': {source}")]
    Serialize {
        /// Storage key being serialized
        key: String,
        /// The underlying encode error
        #[source]
        source: serde_json::Error,
    },

    /// A multi-document write failed part-way and the documents already
    /// replaced could not be restored. The store refuses further writes; the
    /// staged batch is completed the next time it is opened.
    #[error("A batch write was interrupted and could not be undone; it will be completed when the data directory is next opened")]
    BatchPending,
}

/// Represents specific error cases that can occur when locking the data directory.
///
/// # Examples
///
/// ```
/// use daylog::errors::LockError;
/// use std::path::PathBuf;
///
/// let error = LockError::FileBusy {
///     path: PathBuf::from("/path/to/daylog.lock"),
/// };
///
/// assert!(format!("{}", error).contains("in use by another process"));
/// ```
#[derive(Debug, Error)]
pub enum LockError {
    /// Error when the store is already locked by another process.
    #[error("Data directory is in use by another process: {path}. Please close the other daylog instance and try again.")]
    FileBusy {
        /// The path to the lock file
        path: PathBuf,
    },

    /// Error when acquiring the lock fails for a technical reason.
    #[error("Failed to acquire lock {path}: {source}. Please check file permissions and ensure the directory is accessible.")]
    AcquisitionFailed {
        /// The path to the lock file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Rejections of user-initiated content changes (adding or toggling).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// The supplied text is empty after trimming.
    #[error("Text cannot be empty")]
    EmptyText,

    /// Content cannot be added to a day that has already passed.
    #[error("Cannot add content to {date}: the day has already passed")]
    DateClosed {
        /// The rejected date
        date: DateKey,
    },

    /// Todos on this date are past the toggle grace window.
    #[error("Todos on {date} can no longer be changed")]
    DateFrozen {
        /// The frozen date
        date: DateKey,
    },

    /// No todo with the given id exists on the given date.
    #[error("No todo with id '{id}' on {date}")]
    TodoNotFound {
        /// Date bucket searched
        date: DateKey,
        /// Id that was not found
        id: String,
    },
}

/// Failure modes of an import, in the order they can occur.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The payload is not parsable as JSON.
    #[error("{}", INVALID_JSON_MESSAGE)]
    MalformedInput(#[source] serde_json::Error),

    /// The payload parsed but failed structural validation.
    #[error("Invalid data format: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// The payload passed validation but could not be decoded into the
    /// strict schema (for example an unparsable timestamp).
    #[error("Import failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Reading or writing the store failed.
    #[error("Import failed: {0}")]
    Storage(#[from] StorageError),
}

/// The main error type for the daylog application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    ///
    /// This variant automatically converts from `std::io::Error` through the `From` trait.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed date keys supplied at a boundary.
    #[error("Date error: {0}")]
    Date(#[from] DateKeyError),

    /// Errors from the persistent store.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Errors related to locking the data directory.
    #[error("File locking error: {0}")]
    Lock(#[from] LockError),

    /// Rejected content changes.
    #[error("{0}")]
    Content(#[from] ContentError),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
///
/// # Examples
///
/// ```
/// use daylog::errors::{AppResult, AppError};
///
/// fn might_fail() -> AppResult<String> {
///     if false {
///         return Err(AppError::Config("Something went wrong".to_string()));
///     }
///     Ok("Operation succeeded".to_string())
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;
