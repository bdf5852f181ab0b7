//! Persistent storage for the two top-level documents.
//!
//! The store itself is a plain string key-value interface ([`KeyValueStore`]);
//! [`Storage`] layers the typed documents on top of it. An absent key always
//! reads as an empty collection. Timestamps are persisted as strings and
//! rehydrated on read (see [`crate::model::timestamp`]).
//!
//! Two backends are provided:
//! - [`MemoryStore`], a `HashMap` used in tests and for dry runs
//! - [`FileStore`], one JSON file per key in the data directory

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::constants::{JOURNAL_KEY, TODOS_KEY};
use crate::errors::StorageError;
use crate::model::{JournalByDate, TodosByDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Minimal string key-value store.
pub trait KeyValueStore {
    /// Returns the stored JSON text for `key`, or `None` if it was never written.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the value stored under `key`.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Replaces several values as one unit: after this returns `Ok`, every
    /// entry is stored; after it returns `Err`, either none of them is
    /// visible or the store recovers all of them on its next open.
    fn write_all(&mut self, entries: &[(&str, String)]) -> Result<(), StorageError>;
}

/// Typed access to the todos and journal documents.
#[derive(Debug)]
pub struct Storage<S> {
    store: S,
}

impl<S: KeyValueStore> Storage<S> {
    /// Wraps a key-value store.
    pub fn new(store: S) -> Self {
        Storage { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the adapter and returns the underlying store.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Reads all todos.
    pub fn load_todos(&self) -> Result<TodosByDate, StorageError> {
        self.load(TODOS_KEY)
    }

    /// Reads all journal entries.
    pub fn load_journal(&self) -> Result<JournalByDate, StorageError> {
        self.load(JOURNAL_KEY)
    }

    /// Replaces the todos document.
    pub fn save_todos(&mut self, todos: &TodosByDate) -> Result<(), StorageError> {
        let json = encode(TODOS_KEY, todos)?;
        self.store.write(TODOS_KEY, &json)
    }

    /// Replaces the journal document.
    pub fn save_journal(&mut self, journal: &JournalByDate) -> Result<(), StorageError> {
        let json = encode(JOURNAL_KEY, journal)?;
        self.store.write(JOURNAL_KEY, &json)
    }

    /// Replaces both documents together.
    ///
    /// Both are serialized before anything is written, so a serialization
    /// failure leaves the store untouched.
    pub fn save_all(
        &mut self,
        todos: &TodosByDate,
        journal: &JournalByDate,
    ) -> Result<(), StorageError> {
        let entries = [
            (TODOS_KEY, encode(TODOS_KEY, todos)?),
            (JOURNAL_KEY, encode(JOURNAL_KEY, journal)?),
        ];
        self.store.write_all(&entries)
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StorageError> {
        match self.store.read(key)? {
            None => {
                debug!("No stored document for '{}', using empty collection", key);
                Ok(T::default())
            }
            Some(text) => serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })
}
