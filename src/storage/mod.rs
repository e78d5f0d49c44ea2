//! This module defines the entry store interface and its implementations: a
//! persisted `sled` table and a layered store that combines it with the
//! in-memory capture buffer.
pub mod entries;
pub mod layered;

pub use entries::SledEntryStore;
pub use layered::LayeredEntryStore;

use crate::error::RetrievalError;
use crate::types::LogEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A read-only source of log entries for analysis.
#[async_trait]
pub trait EntryStore {
    /// Retrieves the entries stamped at or after `since`.
    ///
    /// # Arguments
    ///
    /// * `since` - The earliest timestamp to include.
    /// * `session_id` - When set, only entries scoped to this session.
    ///
    /// # Errors
    ///
    /// Returns a `RetrievalError` if the store cannot be queried. An empty
    /// result is not an error.
    async fn get_recent_entries(
        &self,
        since: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> Result<Vec<LogEntry>, RetrievalError>;
}
