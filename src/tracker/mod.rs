//! Todos and journal entries: add, toggle and query.
//!
//! [`Tracker`] owns the store handle and is the only place that mutates
//! records outside of import. Every operation reads the current documents,
//! applies its change and writes the affected document back, so the store is
//! always the source of truth.
//!
//! Operations that depend on the current day take the caller's `now`, obtained
//! once at the application boundary, rather than reading the clock themselves.

use crate::dates::{self, DateKey};
use crate::errors::{AppResult, ContentError};
use crate::model::{JournalEntry, Todo, TodoStats};
use crate::storage::{KeyValueStore, Storage};
use chrono::{DateTime, Local, Utc};
use tracing::{debug, info};

/// Domain operations over an injected store.
#[derive(Debug)]
pub struct Tracker<S> {
    storage: Storage<S>,
}

impl<S: KeyValueStore> Tracker<S> {
    /// Creates a tracker over `store`.
    pub fn new(store: S) -> Self {
        Tracker {
            storage: Storage::new(store),
        }
    }

    /// Typed storage adapter.
    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    /// Mutable typed storage adapter, used by import.
    pub fn storage_mut(&mut self) -> &mut Storage<S> {
        &mut self.storage
    }

    /// Adds a todo to today's bucket.
    ///
    /// # Errors
    ///
    /// - `ContentError::EmptyText` if `text` is blank
    /// - `AppError::Storage` if the store cannot be read or written
    pub fn add_todo(&mut self, text: &str, now: &DateTime<Local>) -> AppResult<Todo> {
        let today = DateKey::new(now.date_naive());
        self.add_todo_for_date(today, text, now)
    }

    /// Adds a todo to `date`, which must be today or a future day.
    ///
    /// # Errors
    ///
    /// - `ContentError::EmptyText` if `text` is blank
    /// - `ContentError::DateClosed` if `date` is in the past
    /// - `AppError::Storage` if the store cannot be read or written
    pub fn add_todo_for_date(
        &mut self,
        date: DateKey,
        text: &str,
        now: &DateTime<Local>,
    ) -> AppResult<Todo> {
        let text = clean_text(text)?;
        if !dates::can_add_content(date, now.date_naive()) {
            return Err(ContentError::DateClosed { date }.into());
        }

        let todo = Todo::new(text, now.with_timezone(&Utc));
        let mut todos = self.storage.load_todos()?;
        todos.entry(date).or_default().push(todo.clone());
        self.storage.save_todos(&todos)?;

        info!("Added todo {} on {}", todo.id, date);
        Ok(todo)
    }

    /// Flips the `completed` flag of a todo and returns the updated todo.
    ///
    /// # Errors
    ///
    /// - `ContentError::DateFrozen` if `date` is past the toggle grace window
    /// - `ContentError::TodoNotFound` if no todo with `id` exists on `date`
    /// - `AppError::Storage` if the store cannot be read or written
    pub fn toggle_todo(
        &mut self,
        date: DateKey,
        id: &str,
        now: &DateTime<Local>,
    ) -> AppResult<Todo> {
        if !dates::can_toggle(date, now.date_naive()) {
            return Err(ContentError::DateFrozen { date }.into());
        }

        let mut todos = self.storage.load_todos()?;
        let todo = todos
            .get_mut(&date)
            .and_then(|bucket| bucket.iter_mut().find(|t| t.id == id))
            .ok_or_else(|| ContentError::TodoNotFound {
                date,
                id: id.to_string(),
            })?;
        todo.completed = !todo.completed;
        let updated = todo.clone();
        self.storage.save_todos(&todos)?;

        debug!("Todo {} on {} completed={}", id, date, updated.completed);
        Ok(updated)
    }

    /// Todos for `date`; empty if the day has none.
    pub fn todos_for_date(&self, date: DateKey) -> AppResult<Vec<Todo>> {
        let mut todos = self.storage.load_todos()?;
        Ok(todos.remove(&date).unwrap_or_default())
    }

    /// Completed and total counts for `date`.
    pub fn todo_stats(&self, date: DateKey) -> AppResult<TodoStats> {
        let todos = self.todos_for_date(date)?;
        Ok(TodoStats {
            completed: todos.iter().filter(|t| t.completed).count(),
            total: todos.len(),
        })
    }

    /// Every day that has a todo bucket, newest first.
    pub fn dates_with_todos(&self) -> AppResult<Vec<DateKey>> {
        let todos = self.storage.load_todos()?;
        Ok(todos.keys().rev().copied().collect())
    }

    /// Adds a journal entry to today's bucket.
    ///
    /// # Errors
    ///
    /// - `ContentError::EmptyText` if `text` is blank
    /// - `AppError::Storage` if the store cannot be read or written
    pub fn add_journal_entry(
        &mut self,
        text: &str,
        now: &DateTime<Local>,
    ) -> AppResult<JournalEntry> {
        let text = clean_text(text)?;
        let today = DateKey::new(now.date_naive());

        let entry = JournalEntry::new(text, now.with_timezone(&Utc));
        let mut journal = self.storage.load_journal()?;
        journal.entry(today).or_default().push(entry.clone());
        self.storage.save_journal(&journal)?;

        info!("Added journal entry {} on {}", entry.id, today);
        Ok(entry)
    }

    /// Journal entries for `date`; empty if the day has none.
    pub fn journal_for_date(&self, date: DateKey) -> AppResult<Vec<JournalEntry>> {
        let mut journal = self.storage.load_journal()?;
        Ok(journal.remove(&date).unwrap_or_default())
    }
}

fn clean_text(text: &str) -> Result<&str, ContentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ContentError::EmptyText)
    } else {
        Ok(trimmed)
    }
}
