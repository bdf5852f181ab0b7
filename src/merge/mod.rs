//! Duplicate-free merging of date-keyed collections.
//!
//! A merge is a union keyed by record id within each date bucket. Nothing
//! already present is ever removed or replaced: when an incoming record has
//! the same id as one in the same bucket of `existing`, the existing record
//! wins and the incoming one is dropped. Every bucket named by `incoming` is
//! sorted by creation time afterwards, even if nothing was added to it.
//!
//! Because duplicates are filtered, merging the same data twice gives the
//! same result as merging it once.

use crate::model::{DateKeyedCollection, Record};
use std::collections::HashSet;

/// Merges `incoming` into a copy of `existing`.
///
/// Buckets that only exist in `existing` are copied unchanged. Neither input
/// is modified.
///
/// # Examples
///
/// ```
/// use daylog::merge::merge;
/// use daylog::model::{Todo, TodosByDate};
/// use chrono::Utc;
///
/// let day = "2024-01-15".parse().unwrap();
/// let mut existing = TodosByDate::new();
/// existing.insert(day, vec![Todo::new("a", Utc::now())]);
///
/// let merged = merge(&existing, &existing);
/// assert_eq!(merged, existing);
/// ```
pub fn merge<T>(
    existing: &DateKeyedCollection<T>,
    incoming: &DateKeyedCollection<T>,
) -> DateKeyedCollection<T>
where
    T: Record + Clone,
{
    let mut merged = existing.clone();

    for (date, items) in incoming {
        let bucket = merged.entry(*date).or_default();
        let mut seen: HashSet<String> = bucket.iter().map(|r| r.id().to_string()).collect();

        for item in items {
            // insert() also guards against repeats inside `incoming` itself
            if seen.insert(item.id().to_string()) {
                bucket.push(item.clone());
            }
        }

        // Stable, so records sharing a timestamp keep their relative order
        bucket.sort_by_key(|r| r.created_at());
    }

    merged
}
