//! This module provides the persisted log entry table.
use super::EntryStore;
use crate::error::RetrievalError;
use crate::types::LogEntry;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sled::Db;
use std::time::Duration;
use uuid::Uuid;

const TREE_NAME: &str = "log_entries";

/// An `EntryStore` implementation using `sled` for storage.
///
/// Keys are the entry timestamp followed by the entry id, so a range scan from
/// a cutoff returns entries in chronological order.
#[derive(Clone)]
pub struct SledEntryStore {
    tree: sled::Tree,
}

impl SledEntryStore {
    /// Creates a new `SledEntryStore`.
    ///
    /// # Arguments
    ///
    /// * `db` - The `sled::Db` instance to use for storage.
    ///
    /// # Errors
    ///
    /// This function will return an error if the `log_entries` tree cannot be opened.
    pub fn new(db: Db) -> Result<Self> {
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { tree })
    }

    /// Appends a single entry.
    ///
    /// # Errors
    ///
    /// This function will return an error if the entry cannot be written.
    pub async fn append(&self, entry: &LogEntry) -> Result<()> {
        self.insert(entry)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    /// Appends a batch of entries with a single flush.
    ///
    /// # Errors
    ///
    /// This function will return an error if any entry cannot be written.
    pub async fn append_batch(&self, entries: &[LogEntry]) -> Result<()> {
        for entry in entries {
            self.insert(entry)?;
        }
        self.tree.flush_async().await?;
        Ok(())
    }

    /// Removes entries older than `max_age` relative to `now`.
    ///
    /// A `max_age` reaching before the earliest representable timestamp is
    /// rejected.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    ///
    /// # Errors
    ///
    /// This function will return an error if cleanup fails.
    pub async fn prune_older_than(&self, now: DateTime<Utc>, max_age: Duration) -> Result<usize> {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|max_age| now.checked_sub_signed(max_age))
            .ok_or_else(|| {
                anyhow!("Retention of {:?} reaches past the earliest timestamp", max_age)
            })?;
        let cutoff = entry_key(cutoff, &Uuid::nil());

        let mut keys_to_remove = Vec::new();
        for result in self.tree.range(..cutoff) {
            let (key, _value) = result?;
            keys_to_remove.push(key);
        }

        let removed = keys_to_remove.len();
        for key in keys_to_remove {
            self.tree.remove(key)?;
        }

        self.tree.flush_async().await?;
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn insert(&self, entry: &LogEntry) -> Result<()> {
        let key = entry_key(entry.timestamp, &entry.id);
        let value = serde_json::to_vec(entry)?;
        self.tree.insert(key, value)?;
        Ok(())
    }
}

/// Builds an order-preserving key: 8 bytes of timestamp, then the entry id.
fn entry_key(timestamp: DateTime<Utc>, id: &Uuid) -> Vec<u8> {
    // Flipping the sign bit keeps pre-epoch timestamps sorted before later ones.
    let millis = (timestamp.timestamp_millis() as u64) ^ (1 << 63);
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

#[async_trait]
impl EntryStore for SledEntryStore {
    async fn get_recent_entries(
        &self,
        since: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> Result<Vec<LogEntry>, RetrievalError> {
        let tree = self.tree.clone();
        let start = entry_key(since, &Uuid::nil());
        let session_id = session_id.map(str::to_string);

        tokio::task::spawn_blocking(move || -> Result<Vec<LogEntry>, RetrievalError> {
            let mut entries = Vec::new();
            for result in tree.range(start..) {
                let (_key, value) = result?;
                let entry: LogEntry = serde_json::from_slice(&value)?;
                if entry.in_session(session_id.as_deref()) {
                    entries.push(entry);
                }
            }
            Ok(entries)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;
    use chrono::Duration as ChronoDuration;

    fn temp_store() -> SledEntryStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SledEntryStore::new(db).unwrap()
    }

    fn entry(minutes_ago: i64, message: &str) -> LogEntry {
        LogEntry::new(
            Utc::now() - ChronoDuration::minutes(minutes_ago),
            LogLevel::Info,
            message,
        )
    }

    #[tokio::test]
    async fn range_read_returns_chronological_entries_after_cutoff() {
        let store = temp_store();
        store
            .append_batch(&[entry(5, "b"), entry(60, "old"), entry(10, "a")])
            .await
            .unwrap();
        store.append(&entry(1, "c")).await.unwrap();

        let recent = store
            .get_recent_entries(Utc::now() - ChronoDuration::minutes(30), None)
            .await
            .unwrap();
        let messages: Vec<_> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn session_filter_applies_to_persisted_entries() {
        let store = temp_store();
        store
            .append_batch(&[entry(1, "mine").with_session("s1"), entry(1, "theirs")])
            .await
            .unwrap();

        let scoped = store
            .get_recent_entries(Utc::now() - ChronoDuration::minutes(5), Some("s1"))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].message, "mine");
    }

    #[tokio::test]
    async fn prune_removes_only_expired_entries() {
        let store = temp_store();
        store
            .append_batch(&[entry(3 * 60, "expired"), entry(10, "kept")])
            .await
            .unwrap();

        let removed = store
            .prune_older_than(Utc::now(), Duration::from_secs(60 * 60))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn oversized_retention_is_an_error_not_a_panic() {
        let store = temp_store();
        store.append(&entry(10, "kept")).await.unwrap();

        let result = store
            .prune_older_than(Utc::now(), Duration::from_secs(10_000_000_000 * 3600))
            .await;
        assert!(result.is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keys_sort_by_time() {
        let id = Uuid::new_v4();
        let earlier = entry_key(Utc::now() - ChronoDuration::days(1), &id);
        let later = entry_key(Utc::now(), &Uuid::nil());
        assert!(earlier < later);
    }
}
