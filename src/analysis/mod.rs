//! Log analysis: windowed retrieval plus pure aggregation stages.
//!
//! `LogAnalyzer` resolves the window against its clock, takes one snapshot
//! from the entry store and runs the stages over it:
//!
//! 1. `summary` counts levels and ranks components.
//! 2. `oauth` isolates authentication-related entries.
//! 3. `issues` collects errors, repeated errors and volume/burst flags.
//! 4. `insights` scores the window and derives readable findings.
//!
//! The analyzer never writes to the store and never mutates entries.
pub mod insights;
pub mod issues;
pub mod oauth;
pub mod report;
pub mod rules;
pub mod score;
pub mod summary;

pub use report::LogAnalysis;

use crate::clock::{Clock, SystemClock};
use crate::config::AnalysisConfig;
use crate::error::RetrievalError;
use crate::review::{AutoReviewHandle, ReviewNotification};
use crate::storage::EntryStore;
use crate::types::{LevelFilter, LogEntry};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_WINDOW_MINUTES: u32 = 30;

pub struct LogAnalyzer {
    store: Arc<dyn EntryStore + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    config: AnalysisConfig,
}

impl LogAnalyzer {
    /// Creates an analyzer over `store` using the wall clock.
    pub fn new(store: Arc<dyn EntryStore + Send + Sync>, config: AnalysisConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn EntryStore + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyzes the trailing `window_minutes`, optionally scoped to a session.
    ///
    /// A window of zero is treated as one minute. Zero matching entries is a
    /// valid outcome and yields an all-zero report with a score of 100.
    ///
    /// # Errors
    ///
    /// Returns a `RetrievalError` if the entry store cannot be queried.
    pub async fn analyze_session(
        &self,
        session_id: Option<&str>,
        window_minutes: u32,
    ) -> Result<LogAnalysis, RetrievalError> {
        let window_minutes = window_minutes.max(1);
        let (start, end, entries) = self.window_entries(session_id, window_minutes).await?;

        debug!(
            "Analyzing {} entries from the last {} minutes",
            entries.len(),
            window_minutes
        );

        let summary = summary::summarize(
            &entries,
            start,
            end,
            window_minutes,
            self.config.top_components,
        );
        let oauth = oauth::classify_auth(&entries);
        let issues = issues::detect_issues(&entries, window_minutes, &self.config);
        let insights = insights::derive_insights(&summary, &oauth, &issues);

        info!(
            total = summary.total_logs,
            errors = summary.error_count,
            health_score = insights.health_score,
            "Log analysis completed"
        );

        Ok(LogAnalysis {
            generated_at: end,
            window_minutes,
            session_id: session_id.map(str::to_string),
            summary,
            oauth,
            issues,
            insights,
        })
    }

    /// Entries in the window matching `level`, newest first.
    ///
    /// Retrieval failures are logged and produce an empty list.
    pub async fn get_filtered_logs(&self, level: LevelFilter, window_minutes: u32) -> Vec<LogEntry> {
        match self.window_entries(None, window_minutes.max(1)).await {
            Ok((_, _, entries)) => {
                let mut filtered: Vec<LogEntry> = entries
                    .into_iter()
                    .filter(|entry| level.matches(entry.level))
                    .collect();
                filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                filtered
            }
            Err(e) => {
                warn!("Failed to load {} logs: {}", level, e);
                Vec::new()
            }
        }
    }

    /// Starts re-running the analysis every `interval_minutes`.
    ///
    /// The returned handle owns the timer; cancel or drop it to stop.
    pub fn start_auto_review(self: &Arc<Self>, interval_minutes: u32) -> AutoReviewHandle {
        AutoReviewHandle::start(
            self.clone(),
            std::time::Duration::from_secs(u64::from(interval_minutes.max(1)) * 60),
            DEFAULT_WINDOW_MINUTES,
            None,
        )
    }

    /// Like `start_auto_review`, with an explicit period, window and outcome channel.
    pub fn start_auto_review_with(
        self: &Arc<Self>,
        interval: std::time::Duration,
        window_minutes: u32,
        notify_tx: mpsc::UnboundedSender<ReviewNotification>,
    ) -> AutoReviewHandle {
        AutoReviewHandle::start(self.clone(), interval, window_minutes, Some(notify_tx))
    }

    /// Takes one snapshot from the store and keeps only `[now - window, now]`.
    async fn window_entries(
        &self,
        session_id: Option<&str>,
        window_minutes: u32,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>, Vec<LogEntry>), RetrievalError> {
        let end = self.clock.now();
        let start = end - Duration::minutes(i64::from(window_minutes));

        let entries = self
            .store
            .get_recent_entries(start, session_id)
            .await?
            .into_iter()
            .filter(|entry| {
                entry.timestamp >= start && entry.timestamp <= end && entry.in_session(session_id)
            })
            .collect();

        Ok((start, end, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::logging::LogBuffer;
    use crate::types::LogLevel;

    fn analyzer_at(now: DateTime<Utc>, entries: Vec<LogEntry>) -> LogAnalyzer {
        let buffer = Arc::new(LogBuffer::new(100));
        for entry in entries {
            buffer.add_entry(entry);
        }
        LogAnalyzer::with_clock(
            buffer,
            Arc::new(ManualClock::new(now)),
            AnalysisConfig::default(),
        )
    }

    #[tokio::test]
    async fn future_entries_are_outside_the_window() {
        let now = Utc::now();
        let analyzer = analyzer_at(
            now,
            vec![
                LogEntry::new(now - Duration::minutes(1), LogLevel::Info, "inside"),
                LogEntry::new(now + Duration::minutes(5), LogLevel::Info, "future"),
            ],
        );
        let analysis = analyzer.analyze_session(None, 30).await.unwrap();
        assert_eq!(analysis.summary.total_logs, 1);
        assert_eq!(analysis.summary.time_range.end, now);
        assert_eq!(analysis.summary.time_range.start, now - Duration::minutes(30));
    }

    #[tokio::test]
    async fn zero_window_is_treated_as_one_minute() {
        let now = Utc::now();
        let analyzer = analyzer_at(
            now,
            vec![LogEntry::new(now - Duration::seconds(30), LogLevel::Warn, "w")],
        );
        let analysis = analyzer.analyze_session(None, 0).await.unwrap();
        assert_eq!(analysis.window_minutes, 1);
        assert_eq!(analysis.summary.warn_count, 1);
    }

    #[tokio::test]
    async fn session_scope_is_applied() {
        let now = Utc::now();
        let analyzer = analyzer_at(
            now,
            vec![
                LogEntry::new(now, LogLevel::Error, "a").with_session("s1"),
                LogEntry::new(now, LogLevel::Error, "b").with_session("s2"),
            ],
        );
        let analysis = analyzer.analyze_session(Some("s1"), 30).await.unwrap();
        assert_eq!(analysis.summary.total_logs, 1);
        assert_eq!(analysis.session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn filtered_logs_are_newest_first_and_single_level() {
        let now = Utc::now();
        let analyzer = analyzer_at(
            now,
            vec![
                LogEntry::new(now - Duration::minutes(3), LogLevel::Error, "older"),
                LogEntry::new(now - Duration::minutes(2), LogLevel::Info, "info"),
                LogEntry::new(now - Duration::minutes(1), LogLevel::Error, "newer"),
            ],
        );

        let errors = analyzer
            .get_filtered_logs(LevelFilter::Only(LogLevel::Error), 30)
            .await;
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["newer", "older"]);

        let all = analyzer.get_filtered_logs(LevelFilter::All, 30).await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].message, "newer");
    }
}
