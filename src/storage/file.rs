//! File-backed key-value store.
//!
//! Each key is stored as `<key>.json` in the data directory. Single writes go
//! to a temporary file in the same directory which is then renamed over the
//! target, so readers never see a half-written document.
//!
//! Multi-key writes are staged: the whole batch is first written (atomically)
//! to `pending.json`, then applied key by key, then the staging file is
//! removed. If the process dies part-way, the next [`FileStore::open`] finds
//! the staging file and replays it, so the documents in a batch always land
//! together.
//!
//! If applying fails while the process is still running, the documents already
//! replaced are restored from their previous contents and the staging file is
//! dropped, so the batch leaves no trace. When even that restore fails, the
//! staging file is kept and the store refuses every further write until it is
//! reopened (see [`StorageError::BatchPending`]); later writes could otherwise
//! be overwritten by the replay.
//!
//! The store holds an exclusive advisory lock on `daylog.lock` while open.

use super::KeyValueStore;
use crate::constants::{LOCK_FILE_NAME, PENDING_FILE_NAME};
use crate::errors::{AppError, AppResult, LockError, StorageError};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
#[cfg(unix)]
use std::fs::Permissions;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

/// Key-value store persisted as JSON files in a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    lock: File,
    batch_pending: bool,
    /// Successful file replacements to allow, then replacements to fail.
    #[cfg(test)]
    injected_failures: std::cell::Cell<(usize, usize)>,
}

impl FileStore {
    /// Opens (creating if needed) the store in `dir`.
    ///
    /// # Errors
    ///
    /// - `AppError::Config` if `dir` is not absolute
    /// - `AppError::Io` if the directory cannot be created
    /// - `AppError::Lock` if another process holds the store
    /// - `AppError::Storage` if a staged batch cannot be replayed
    pub fn open(dir: &Path) -> AppResult<Self> {
        ensure_data_directory_exists(dir)?;

        let lock_path = dir.join(LOCK_FILE_NAME);
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| LockError::AcquisitionFailed {
                path: lock_path.clone(),
                source,
            })?;

        if let Err(e) = lock.try_lock_exclusive() {
            let contended = e.kind() == io::ErrorKind::WouldBlock
                || e.raw_os_error() == fs2::lock_contended_error().raw_os_error();
            let error = if contended {
                LockError::FileBusy { path: lock_path }
            } else {
                LockError::AcquisitionFailed {
                    path: lock_path,
                    source: e,
                }
            };
            return Err(error.into());
        }
        debug!("Acquired store lock {:?}", lock_path);

        let mut store = FileStore {
            dir: dir.to_path_buf(),
            lock,
            batch_pending: false,
            #[cfg(test)]
            injected_failures: std::cell::Cell::new((0, 0)),
        };
        store.recover_pending()?;
        Ok(store)
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn pending_path(&self) -> PathBuf {
        self.dir.join(PENDING_FILE_NAME)
    }

    fn replace_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        #[cfg(test)]
        {
            let (skip, fail) = self.injected_failures.get();
            if skip > 0 {
                self.injected_failures.set((skip - 1, fail));
            } else if fail > 0 {
                self.injected_failures.set((0, fail - 1));
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "injected write failure",
                ));
            }
        }

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn apply(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.replace_file(&self.path_for(key), value)
                .map_err(|source| StorageError::Write {
                    key: key.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Applies a staged batch. On failure, restores every document already
    /// replaced to its `previous` contents and removes the staging file.
    fn apply_or_roll_back(
        &mut self,
        batch: &BTreeMap<String, String>,
        previous: &BTreeMap<String, Option<String>>,
    ) -> Result<(), StorageError> {
        let mut applied: Vec<&str> = Vec::new();
        for (key, value) in batch {
            if let Err(source) = self.replace_file(&self.path_for(key), value) {
                warn!("Failed to apply '{}' from batch, rolling back: {}", key, source);
                let error = StorageError::Write {
                    key: key.clone(),
                    source,
                };
                return Err(self.roll_back(&applied, previous, error));
            }
            applied.push(key);
        }
        Ok(())
    }

    fn roll_back(
        &mut self,
        applied: &[&str],
        previous: &BTreeMap<String, Option<String>>,
        error: StorageError,
    ) -> StorageError {
        for key in applied {
            let path = self.path_for(key);
            let restored = match previous.get(*key) {
                Some(Some(text)) => self.replace_file(&path, text),
                _ => remove_if_exists(&path),
            };
            if let Err(e) = restored {
                error!("Failed to restore '{}' after interrupted batch: {}", key, e);
                self.batch_pending = true;
                return StorageError::BatchPending;
            }
        }

        if let Err(e) = self.clear_pending() {
            error!("Failed to discard rolled-back batch: {}", e);
            self.batch_pending = true;
            return StorageError::BatchPending;
        }
        info!("Rolled back {} document(s) of interrupted batch", applied.len());
        error
    }

    fn ensure_writable(&self) -> Result<(), StorageError> {
        if self.batch_pending {
            return Err(StorageError::BatchPending);
        }
        Ok(())
    }

    fn clear_pending(&self) -> Result<(), StorageError> {
        fs::remove_file(self.pending_path()).map_err(|source| StorageError::Write {
            key: PENDING_FILE_NAME.to_string(),
            source,
        })
    }

    /// Replays a batch left behind by an interrupted `write_all`.
    fn recover_pending(&mut self) -> Result<(), StorageError> {
        let path = self.pending_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StorageError::Read {
                    key: PENDING_FILE_NAME.to_string(),
                    source,
                })
            }
        };

        let entries: BTreeMap<String, String> =
            serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
                key: PENDING_FILE_NAME.to_string(),
                source,
            })?;

        warn!(
            "Found interrupted write of {} document(s), replaying",
            entries.len()
        );
        self.apply(&entries)?;
        self.clear_pending()?;
        info!("Recovered interrupted write");
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock) {
            warn!("Failed to release store lock: {}", e);
        }
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_writable()?;
        debug!("Writing document '{}' ({} bytes)", key, value.len());
        self.replace_file(&self.path_for(key), value)
            .map_err(|source| StorageError::Write {
                key: key.to_string(),
                source,
            })
    }

    fn write_all(&mut self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        self.ensure_writable()?;
        let batch: BTreeMap<String, String> = entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();

        let mut previous = BTreeMap::new();
        for key in batch.keys() {
            previous.insert(key.clone(), self.read(key)?);
        }

        let staged = serde_json::to_string(&batch).map_err(|source| StorageError::Serialize {
            key: PENDING_FILE_NAME.to_string(),
            source,
        })?;
        self.replace_file(&self.pending_path(), &staged)
            .map_err(|source| StorageError::Write {
                key: PENDING_FILE_NAME.to_string(),
                source,
            })?;
        debug!("Staged {} document(s)", batch.len());

        self.apply_or_roll_back(&batch, &previous)?;
        if let Err(e) = self.clear_pending() {
            // The batch is in place but will be replayed on open, over any
            // later write
            warn!("Failed to remove staging file: {}", e);
            self.batch_pending = true;
        }
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Ensures the data directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns:
/// - `AppError::Config` if the provided path is not an absolute path
/// - `AppError::Io` if the directory creation fails
pub fn ensure_data_directory_exists(data_dir: &Path) -> AppResult<()> {
    if !data_dir.is_absolute() {
        return Err(AppError::Config(format!(
            "Data directory path must be absolute: {}",
            data_dir.display()
        )));
    }

    if !data_dir.exists() {
        fs::create_dir_all(data_dir).map_err(|e| {
            AppError::Io(io::Error::new(
                e.kind(),
                format!("Failed to create data directory: {}", e),
            ))
        })?;

        // Owner-only access
        #[cfg(unix)]
        {
            let permissions = Permissions::from_mode(0o700);
            fs::set_permissions(data_dir, permissions).map_err(|e| {
                AppError::Io(io::Error::new(
                    e.kind(),
                    format!("Failed to set permissions on data directory: {}", e),
                ))
            })?;
            debug!("Set 0o700 permissions on data directory");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let data_dir = temp_dir.path().join("nested").join("daylog");

        let store = FileStore::open(&data_dir).unwrap();
        assert!(data_dir.exists());
        assert_eq!(store.dir(), data_dir.as_path());

        #[cfg(unix)]
        {
            let mode = fs::metadata(&data_dir).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_open_rejects_relative_path() {
        let result = FileStore::open(Path::new("relative/daylog"));
        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("must be absolute")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path()).unwrap();

        assert_eq!(store.read("todos").unwrap(), None);
        store.write("todos", "{}").unwrap();
        assert_eq!(store.read("todos").unwrap().as_deref(), Some("{}"));
        assert!(temp_dir.path().join("todos.json").exists());
    }

    #[test]
    fn test_write_all_leaves_no_staging_file() {
        let temp_dir = tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path()).unwrap();

        store
            .write_all(&[("todos", "{\"t\":1}".to_string()), ("journal", "{\"j\":2}".to_string())])
            .unwrap();

        assert_eq!(store.read("todos").unwrap().as_deref(), Some("{\"t\":1}"));
        assert_eq!(store.read("journal").unwrap().as_deref(), Some("{\"j\":2}"));
        assert!(!temp_dir.path().join(PENDING_FILE_NAME).exists());
    }

    #[test]
    fn test_second_open_is_busy() {
        let temp_dir = tempdir().unwrap();
        let _first = FileStore::open(temp_dir.path()).unwrap();

        match FileStore::open(temp_dir.path()) {
            Err(AppError::Lock(LockError::FileBusy { path })) => {
                assert!(path.ends_with(LOCK_FILE_NAME));
            }
            other => panic!("Expected FileBusy, got {:?}", other),
        }
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp_dir = tempdir().unwrap();
        {
            let _store = FileStore::open(temp_dir.path()).unwrap();
        }
        assert!(FileStore::open(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_pending_batch_is_replayed_on_open() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("todos.json"), "{\"old\":true}").unwrap();

        let mut batch = BTreeMap::new();
        batch.insert("todos".to_string(), "{\"new\":1}".to_string());
        batch.insert("journal".to_string(), "{\"new\":2}".to_string());
        fs::write(
            temp_dir.path().join(PENDING_FILE_NAME),
            serde_json::to_string(&batch).unwrap(),
        )
        .unwrap();

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.read("todos").unwrap().as_deref(), Some("{\"new\":1}"));
        assert_eq!(store.read("journal").unwrap().as_deref(), Some("{\"new\":2}"));
        assert!(!temp_dir.path().join(PENDING_FILE_NAME).exists());
    }

    /// Opens a store whose next `fail` file replacements fail after `skip`
    /// successful ones. Staging a batch counts as one replacement.
    fn open_failing(dir: &Path, skip: usize, fail: usize) -> FileStore {
        let store = FileStore::open(dir).unwrap();
        store.injected_failures.set((skip, fail));
        store
    }

    fn batch(todos: &str, journal: &str) -> [(&'static str, String); 2] {
        [("todos", todos.to_string()), ("journal", journal.to_string())]
    }

    #[test]
    fn test_failed_batch_is_rolled_back() {
        let temp_dir = tempdir().unwrap();
        {
            let mut store = FileStore::open(temp_dir.path()).unwrap();
            store.write("journal", "{\"old\":1}").unwrap();
        }

        // Staging and "journal" succeed, "todos" fails
        let mut store = open_failing(temp_dir.path(), 2, 1);
        match store.write_all(&batch("{\"new\":1}", "{\"new\":2}")) {
            Err(StorageError::Write { key, .. }) => assert_eq!(key, "todos"),
            other => panic!("Expected Write error, got {:?}", other),
        }

        assert_eq!(store.read("journal").unwrap().as_deref(), Some("{\"old\":1}"));
        assert_eq!(store.read("todos").unwrap(), None);
        assert!(!temp_dir.path().join(PENDING_FILE_NAME).exists());

        // Later writes in the same session stick across a reopen
        store.write("journal", "{\"later\":3}").unwrap();
        drop(store);

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.read("journal").unwrap().as_deref(), Some("{\"later\":3}"));
        assert_eq!(store.read("todos").unwrap(), None);
    }

    #[test]
    fn test_rollback_of_new_document_removes_it() {
        let temp_dir = tempdir().unwrap();
        let mut store = open_failing(temp_dir.path(), 2, 1);

        assert!(store.write_all(&batch("{}", "{}")).is_err());
        assert_eq!(store.read("journal").unwrap(), None);
        assert!(!temp_dir.path().join("journal.json").exists());
    }

    #[test]
    fn test_failed_rollback_refuses_writes_until_reopen() {
        let temp_dir = tempdir().unwrap();
        {
            let mut store = FileStore::open(temp_dir.path()).unwrap();
            store.write("journal", "{\"old\":1}").unwrap();
        }

        // Restoring "journal" fails too, so the batch stays staged
        let mut store = open_failing(temp_dir.path(), 2, 2);
        assert!(matches!(
            store.write_all(&batch("{\"new\":1}", "{\"new\":2}")),
            Err(StorageError::BatchPending)
        ));
        assert!(temp_dir.path().join(PENDING_FILE_NAME).exists());

        assert!(matches!(
            store.write("journal", "{\"later\":3}"),
            Err(StorageError::BatchPending)
        ));
        assert!(matches!(
            store.write_all(&batch("{}", "{}")),
            Err(StorageError::BatchPending)
        ));
        drop(store);

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.read("todos").unwrap().as_deref(), Some("{\"new\":1}"));
        assert_eq!(store.read("journal").unwrap().as_deref(), Some("{\"new\":2}"));
        assert!(!temp_dir.path().join(PENDING_FILE_NAME).exists());
    }

    #[test]
    fn test_failed_import_keeps_later_journal_entries() {
        use crate::tracker::Tracker;
        use crate::transfer;
        use chrono::{Local, TimeZone};

        let temp_dir = tempdir().unwrap();
        let mut tracker = Tracker::new(open_failing(temp_dir.path(), 2, 1));

        let payload = r#"{
            "version": "1.0.0",
            "exportDate": "2024-02-01T10:00:00.000Z",
            "journal": { "2024-01-30": [ { "id": "j1", "text": "imported", "createdAt": "2024-01-30T10:00:00.000Z" } ] }
        }"#;
        let outcome = transfer::import_text(tracker.storage_mut(), payload);
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Import failed:"));
        assert!(tracker.storage().load_journal().unwrap().is_empty());

        let now = Local.with_ymd_and_hms(2024, 1, 30, 20, 0, 0).unwrap();
        let entry = tracker.add_journal_entry("written after", &now).unwrap();
        drop(tracker);

        let reopened = Tracker::new(FileStore::open(temp_dir.path()).unwrap());
        let day = "2024-01-30".parse().unwrap();
        assert_eq!(reopened.journal_for_date(day).unwrap(), vec![entry]);
        assert!(reopened.storage().load_todos().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_pending_batch_is_reported() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join(PENDING_FILE_NAME), "not json").unwrap();

        match FileStore::open(temp_dir.path()) {
            Err(AppError::Storage(StorageError::Corrupt { key, .. })) => {
                assert_eq!(key, PENDING_FILE_NAME);
            }
            other => panic!("Expected Corrupt error, got {:?}", other),
        }
    }
}
