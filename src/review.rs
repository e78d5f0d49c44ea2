//! Recurring, timer-driven analysis.
//!
//! An `AutoReviewHandle` owns one background task that re-runs
//! `LogAnalyzer::analyze_session` on a fixed period. The handle is the only
//! way to stop it, and dropping the handle stops it too.
use crate::analysis::{LogAnalysis, LogAnalyzer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Outcome of one scheduled analysis.
#[derive(Debug)]
pub enum ReviewNotification {
    Completed(Box<LogAnalysis>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStats {
    pub runs: u64,
    pub failures: u64,
}

struct Shared {
    /// Set once by `cancel`. Checked under the same lock before every run.
    stopped: Mutex<bool>,
    runs: AtomicU64,
    failures: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct AutoReviewHandle {
    shared: Arc<Shared>,
    stop_tx: watch::Sender<bool>,
    interval: Duration,
}

impl AutoReviewHandle {
    /// Spawns the review task. The first analysis runs one full `period` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        analyzer: Arc<LogAnalyzer>,
        period: Duration,
        window_minutes: u32,
        notify_tx: Option<mpsc::UnboundedSender<ReviewNotification>>,
    ) -> Self {
        let period = period.max(Duration::from_millis(1));
        let shared = Arc::new(Shared {
            stopped: Mutex::new(false),
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });
        let (stop_tx, stop_rx) = watch::channel(false);

        info!("Starting auto-review every {:?} over {} minutes", period, window_minutes);

        tokio::spawn(run_review_loop(
            analyzer,
            period,
            window_minutes,
            notify_tx,
            shared.clone(),
            stop_rx,
        ));

        Self {
            shared,
            stop_tx,
            interval: period,
        }
    }

    /// Stops the schedule. Safe to call any number of times.
    ///
    /// After this returns no new analysis starts. A run already in progress
    /// finishes and reports its outcome, but is not followed by another. A
    /// run counts as started once the loop has checked the stop flag under
    /// the lock this method takes, so the two can never interleave.
    pub fn cancel(&self) {
        let mut stopped = lock(&self.shared.stopped);
        if !*stopped {
            *stopped = true;
            debug!("Auto-review cancelled");
        }
        drop(stopped);
        self.stop_tx.send_replace(true);
    }

    pub fn state(&self) -> ReviewState {
        if *lock(&self.shared.stopped) {
            ReviewState::Idle
        } else {
            ReviewState::Running
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> ReviewStats {
        ReviewStats {
            runs: self.shared.runs.load(Ordering::SeqCst),
            failures: self.shared.failures.load(Ordering::SeqCst),
        }
    }
}

impl Drop for AutoReviewHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_review_loop(
    analyzer: Arc<LogAnalyzer>,
    period: Duration,
    window_minutes: u32,
    notify_tx: Option<mpsc::UnboundedSender<ReviewNotification>>,
    shared: Arc<Shared>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // Skip the first immediate tick.

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        // Passing this check is what starts a run.
        if *lock(&shared.stopped) {
            break;
        }

        let notification = match analyzer.analyze_session(None, window_minutes).await {
            Ok(analysis) => {
                shared.runs.fetch_add(1, Ordering::SeqCst);
                debug!(
                    "Auto-review finished with health score {}",
                    analysis.insights.health_score
                );
                ReviewNotification::Completed(Box::new(analysis))
            }
            Err(e) => {
                shared.failures.fetch_add(1, Ordering::SeqCst);
                error!("Auto-review analysis failed: {}", e);
                ReviewNotification::Failed(e.user_message().to_string())
            }
        };

        if let Some(tx) = &notify_tx {
            if tx.send(notification).is_err() {
                debug!("Auto-review listener went away, stopping");
                break;
            }
        }
    }

    debug!("Auto-review task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::error::RetrievalError;
    use crate::logging::LogBuffer;
    use crate::storage::EntryStore;
    use crate::types::{LogEntry, LogLevel};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct BrokenStore;

    #[async_trait]
    impl EntryStore for BrokenStore {
        async fn get_recent_entries(
            &self,
            _since: DateTime<Utc>,
            _session_id: Option<&str>,
        ) -> Result<Vec<LogEntry>, RetrievalError> {
            Err(RetrievalError::Unavailable("offline".into()))
        }
    }

    fn analyzer_with(store: Arc<dyn EntryStore + Send + Sync>) -> Arc<LogAnalyzer> {
        Arc::new(LogAnalyzer::new(store, AnalysisConfig::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_every_tick_until_cancelled() {
        let buffer = Arc::new(LogBuffer::new(10));
        buffer.add_entry(LogEntry::new(Utc::now(), LogLevel::Info, "hello"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = analyzer_with(buffer).start_auto_review_with(Duration::from_secs(60), 30, tx);
        assert_eq!(handle.state(), ReviewState::Running);

        for _ in 0..3 {
            match rx.recv().await {
                Some(ReviewNotification::Completed(analysis)) => {
                    assert_eq!(analysis.summary.total_logs, 1)
                }
                other => panic!("unexpected notification: {:?}", other),
            }
        }
        assert_eq!(handle.stats().runs, 3);

        handle.cancel();
        assert_eq!(handle.state(), ReviewState::Idle);

        // The task exits and drops its sender without running again.
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(rx.recv().await.is_none());
        assert_eq!(handle.stats().runs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn double_cancel_is_harmless() {
        let buffer = Arc::new(LogBuffer::new(10));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = analyzer_with(buffer).start_auto_review_with(Duration::from_secs(60), 30, tx);

        handle.cancel();
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(rx.recv().await.is_none());
        assert_eq!(handle.stats(), ReviewStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported_and_do_not_stop_the_schedule() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle =
            analyzer_with(Arc::new(BrokenStore)).start_auto_review_with(Duration::from_secs(30), 30, tx);

        for _ in 0..2 {
            match rx.recv().await {
                Some(ReviewNotification::Failed(message)) => {
                    assert!(message.contains("check connectivity"))
                }
                other => panic!("unexpected notification: {:?}", other),
            }
        }
        assert_eq!(handle.stats().failures, 2);
        assert_eq!(handle.state(), ReviewState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_timer() {
        let buffer = Arc::new(LogBuffer::new(10));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = analyzer_with(buffer).start_auto_review_with(Duration::from_secs(60), 30, tx);
        drop(handle);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(rx.recv().await.is_none());
    }
}
