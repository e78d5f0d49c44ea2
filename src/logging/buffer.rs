//! This module provides a bounded in-memory buffer of captured log entries.
//!
//! The `LogBuffer` keeps the most recent entries for local analysis and hands
//! newly captured entries to a persistence channel in batches, so a burst of
//! log events turns into one store write instead of hundreds.
use crate::error::RetrievalError;
use crate::storage::EntryStore;
use crate::types::LogEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// A ring buffer of log entries with batched hand-off to persistence.
pub struct LogBuffer {
    /// The circular buffer of log entries, oldest first.
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    /// The maximum number of entries to keep.
    max_size: usize,
    /// Where flushed batches are sent, if persistence is attached.
    persist_sender: Arc<Mutex<Option<mpsc::UnboundedSender<Vec<LogEntry>>>>>,
    /// Entries captured since the last flush.
    pending_batch: Arc<Mutex<Vec<LogEntry>>>,
    /// Whether a flush task is currently running.
    flusher_running: Arc<Mutex<bool>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LogBuffer {
    /// Creates a new `LogBuffer`.
    ///
    /// # Arguments
    ///
    /// * `max_size` - The maximum number of entries to keep. Older entries are
    ///   evicted first.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(max_size))),
            max_size,
            persist_sender: Arc::new(Mutex::new(None)),
            pending_batch: Arc::new(Mutex::new(Vec::new())),
            flusher_running: Arc::new(Mutex::new(false)),
        }
    }

    /// Attaches the channel that receives batches of new entries for persistence.
    pub fn set_persist_sender(&self, sender: mpsc::UnboundedSender<Vec<LogEntry>>) {
        *lock(&self.persist_sender) = Some(sender);
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a new log entry to the buffer.
    ///
    /// The entry is always kept in memory. When a persistence channel is
    /// attached it is also queued for the next batch flush.
    pub fn add_entry(&self, entry: LogEntry) {
        let persisting = lock(&self.persist_sender).is_some();

        {
            let mut entries = lock(&self.entries);
            if entries.len() >= self.max_size {
                entries.pop_front();
            }
            if persisting {
                lock(&self.pending_batch).push(entry.clone());
            }
            entries.push_back(entry);
        }

        if persisting {
            self.start_flusher_if_needed();
        }
    }

    /// Copies the entries at or after `since` that belong to `session_id`.
    ///
    /// The copy is taken under one lock, so concurrent appends are either fully
    /// visible or not at all.
    pub fn snapshot_since(&self, since: DateTime<Utc>, session_id: Option<&str>) -> Vec<LogEntry> {
        lock(&self.entries)
            .iter()
            .filter(|entry| entry.timestamp >= since && entry.in_session(session_id))
            .cloned()
            .collect()
    }

    /// Sends whatever is pending right now, without waiting for the timer.
    pub fn flush(&self) {
        flush_pending(&self.pending_batch, &self.persist_sender);
    }

    /// Starts the flush task if it's not already running.
    ///
    /// Outside a tokio runtime there is nothing to spawn onto; the pending
    /// batch then waits for an explicit `flush`.
    fn start_flusher_if_needed(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        {
            let mut running = lock(&self.flusher_running);
            if *running {
                return;
            }
            *running = true;
        }

        let persist_sender = self.persist_sender.clone();
        let pending_batch = self.pending_batch.clone();
        let flusher_running = self.flusher_running.clone();

        runtime.spawn(async move {
            let mut timer = interval(FLUSH_INTERVAL);
            timer.tick().await; // Skip the first immediate tick.

            loop {
                timer.tick().await;
                if !flush_pending(&pending_batch, &persist_sender) {
                    break;
                }
            }

            *lock(&flusher_running) = false;
        });
    }
}

/// Sends the pending batch. Returns `false` once the receiver is gone.
fn flush_pending(
    pending_batch: &Mutex<Vec<LogEntry>>,
    persist_sender: &Mutex<Option<mpsc::UnboundedSender<Vec<LogEntry>>>>,
) -> bool {
    let batch = {
        let mut pending = lock(pending_batch);
        if pending.is_empty() {
            return true;
        }
        pending.drain(..).collect::<Vec<_>>()
    };

    let mut sender = lock(persist_sender);
    match sender.as_ref() {
        Some(tx) if tx.send(batch).is_ok() => true,
        _ => {
            // Channel closed: stop persisting and stop the timer.
            *sender = None;
            false
        }
    }
}

#[async_trait]
impl EntryStore for LogBuffer {
    async fn get_recent_entries(
        &self,
        since: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> Result<Vec<LogEntry>, RetrievalError> {
        Ok(self.snapshot_since(since, session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;
    use chrono::Duration as ChronoDuration;

    fn entry_at(minutes_ago: i64, message: &str) -> LogEntry {
        LogEntry::new(
            Utc::now() - ChronoDuration::minutes(minutes_ago),
            LogLevel::Info,
            message,
        )
    }

    #[test]
    fn evicts_oldest_when_full() {
        let buffer = LogBuffer::new(2);
        buffer.add_entry(entry_at(3, "first"));
        buffer.add_entry(entry_at(2, "second"));
        buffer.add_entry(entry_at(1, "third"));

        let messages: Vec<_> = buffer
            .snapshot_since(Utc::now() - ChronoDuration::hours(1), None)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["second", "third"]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn snapshot_respects_cutoff_and_session() {
        let buffer = LogBuffer::new(10);
        buffer.add_entry(entry_at(90, "stale"));
        buffer.add_entry(entry_at(5, "fresh").with_session("s1"));
        buffer.add_entry(entry_at(4, "other").with_session("s2"));

        let cutoff = Utc::now() - ChronoDuration::minutes(30);
        assert_eq!(buffer.snapshot_since(cutoff, None).len(), 2);

        let scoped = buffer.snapshot_since(cutoff, Some("s1"));
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].message, "fresh");
    }

    #[test]
    fn explicit_flush_sends_pending_batch() {
        let buffer = LogBuffer::new(10);
        let (tx, mut rx) = mpsc::unbounded_channel();
        buffer.set_persist_sender(tx);

        buffer.add_entry(entry_at(1, "a"));
        buffer.add_entry(entry_at(0, "b"));
        buffer.flush();

        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn flusher_delivers_batches_on_its_own() {
        let buffer = LogBuffer::new(10);
        let (tx, mut rx) = mpsc::unbounded_channel();
        buffer.set_persist_sender(tx);

        buffer.add_entry(entry_at(0, "captured"));

        let batch = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch[0].message, "captured");
    }

    #[tokio::test]
    async fn buffer_serves_as_entry_store() {
        let buffer = LogBuffer::new(10);
        buffer.add_entry(entry_at(1, "x"));
        let entries = buffer
            .get_recent_entries(Utc::now() - ChronoDuration::minutes(10), None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }
}
