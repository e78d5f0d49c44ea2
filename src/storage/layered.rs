//! This module combines the persisted table with the in-memory buffer.
use super::EntryStore;
use crate::error::RetrievalError;
use crate::logging::LogBuffer;
use crate::types::LogEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Reads the persisted store under a timeout and merges the local buffer.
///
/// If the persisted store fails or times out, the buffered entries in the
/// window are served instead. Only when the buffer has nothing in the window
/// does the retrieval error reach the caller.
pub struct LayeredEntryStore {
    persisted: Arc<dyn EntryStore + Send + Sync>,
    buffer: Arc<LogBuffer>,
    timeout: Duration,
}

impl LayeredEntryStore {
    pub fn new(
        persisted: Arc<dyn EntryStore + Send + Sync>,
        buffer: Arc<LogBuffer>,
        timeout: Duration,
    ) -> Self {
        Self {
            persisted,
            buffer,
            timeout,
        }
    }

    fn fall_back(
        &self,
        since: DateTime<Utc>,
        session_id: Option<&str>,
        error: RetrievalError,
    ) -> Result<Vec<LogEntry>, RetrievalError> {
        let buffered = self.buffer.snapshot_since(since, session_id);
        if buffered.is_empty() {
            return Err(error);
        }
        warn!(
            "Persisted log store unavailable ({}), serving {} buffered entries",
            error,
            buffered.len()
        );
        Ok(buffered)
    }
}

#[async_trait]
impl EntryStore for LayeredEntryStore {
    async fn get_recent_entries(
        &self,
        since: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> Result<Vec<LogEntry>, RetrievalError> {
        // The read runs as its own task so a store that blocks its thread
        // cannot hold the caller past the timeout.
        let store = self.persisted.clone();
        let scope = session_id.map(str::to_string);
        let read =
            tokio::spawn(async move { store.get_recent_entries(since, scope.as_deref()).await });

        let persisted = match tokio::time::timeout(self.timeout, read).await {
            Ok(Ok(Ok(entries))) => entries,
            Ok(Ok(Err(e))) => return self.fall_back(since, session_id, e),
            Ok(Err(e)) => return self.fall_back(since, session_id, RetrievalError::Task(e)),
            Err(_) => return self.fall_back(since, session_id, RetrievalError::Timeout(self.timeout)),
        };

        let known: HashSet<_> = persisted.iter().map(|entry| entry.id).collect();
        let buffered: Vec<_> = self
            .buffer
            .snapshot_since(since, session_id)
            .into_iter()
            .filter(|entry| !known.contains(&entry.id))
            .collect();

        debug!(
            "Retrieved {} persisted and {} buffer-only entries",
            persisted.len(),
            buffered.len()
        );

        let mut merged = persisted;
        merged.extend(buffered);
        merged.sort_by_key(|entry| entry.timestamp);
        Ok(merged)
    }
}
