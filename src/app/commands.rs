//! Subcommand implementations.
use super::render::{render_analysis, render_entry, render_headline};
use super::setup::PreparedApp;
use crate::review::ReviewNotification;
use crate::types::{LevelFilter, LogEntry};
use crate::web;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn analyze(
    app: &PreparedApp,
    window: Option<u32>,
    session: Option<&str>,
    json: bool,
) -> Result<()> {
    let window = window.unwrap_or(app.config.analysis.default_window_minutes);

    let analysis = match app.analyzer.analyze_session(session, window).await {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(anyhow!(e));
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print!("{}", render_analysis(&analysis));
    }
    Ok(())
}

pub async fn logs(app: &PreparedApp, level: &str, window: Option<u32>, json: bool) -> Result<()> {
    let level: LevelFilter = level.parse().map_err(|e: String| anyhow!(e))?;
    let window = window.unwrap_or(app.config.analysis.default_window_minutes);

    let entries = app.analyzer.get_filtered_logs(level, window).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No {} logs in the last {} minutes", level, window);
    } else {
        for entry in &entries {
            println!("{}", render_entry(entry));
        }
    }
    Ok(())
}

pub async fn review(app: &PreparedApp, interval: Option<u32>, window: Option<u32>) -> Result<()> {
    let interval_minutes = interval.unwrap_or(app.config.review.interval_minutes).max(1);
    let window = window.unwrap_or(app.config.review.window_minutes);

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let handle = app.analyzer.start_auto_review_with(
        Duration::from_secs(u64::from(interval_minutes) * 60),
        window,
        notify_tx,
    );

    println!(
        "Reviewing the last {} minutes every {} minutes. Press Ctrl-C to stop.",
        window, interval_minutes
    );

    loop {
        tokio::select! {
            notification = notify_rx.recv() => match notification {
                Some(ReviewNotification::Completed(analysis)) => {
                    println!("{}", render_headline(&analysis));
                    for pattern in &analysis.issues.performance.suspicious_patterns {
                        println!("  ! {}", pattern);
                    }
                }
                Some(ReviewNotification::Failed(message)) => eprintln!("{}", message),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping auto-review");
                break;
            }
        }
    }

    handle.cancel();
    let stats = handle.stats();
    println!("Completed {} reviews ({} failed)", stats.runs, stats.failures);
    Ok(())
}

pub async fn ingest(app: &PreparedApp, file: &str) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file))?;

    let (entries, rejected) = parse_json_lines(&content);
    for (line, e) in &rejected {
        warn!("Skipping line {} of {}: {}", line, file, e);
    }
    if entries.is_empty() && !rejected.is_empty() {
        bail!("No valid log entries in {}", file);
    }

    app.store.append_batch(&entries).await?;
    println!(
        "Imported {} entries ({} skipped); store now holds {}",
        entries.len(),
        rejected.len(),
        app.store.len()
    );
    Ok(())
}

pub async fn prune(app: &PreparedApp, max_age_hours: Option<u64>) -> Result<()> {
    let max_age = match max_age_hours {
        Some(hours) => max_age_from_hours(hours)?,
        None => app.config.store.retention(),
    };

    let removed = app.store.prune_older_than(Utc::now(), max_age).await?;
    println!("Removed {} entries older than {:?}", removed, max_age);
    Ok(())
}

pub async fn serve(app: &PreparedApp, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(app.config.server.port);

    let store = app.store.clone();
    let retention = app.config.store.retention();
    let mut prune_timer = tokio::time::interval(app.config.store.prune_interval());
    tokio::spawn(async move {
        loop {
            prune_timer.tick().await;
            match store.prune_older_than(Utc::now(), retention).await {
                Ok(0) => {}
                Ok(removed) => info!("Retention cleanup removed {} entries", removed),
                Err(e) => error!("Retention cleanup failed: {}", e),
            }
        }
    });

    let state = web::WebState {
        analyzer: app.analyzer.clone(),
        store: app.store.clone(),
        buffer: app.buffer.clone(),
        default_window_minutes: app.config.analysis.default_window_minutes,
    };
    web::start_server(state, port).await
}

fn max_age_from_hours(hours: u64) -> Result<Duration> {
    hours
        .checked_mul(60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("--max-age-hours {} is too large", hours))
}

/// Parses one `LogEntry` per non-blank line.
///
/// Returns the parsed entries and the 1-based line numbers that failed.
pub fn parse_json_lines(content: &str) -> (Vec<LogEntry>, Vec<(usize, serde_json::Error)>) {
    let mut entries = Vec::new();
    let mut rejected = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => rejected.push((index + 1, e)),
        }
    }

    (entries, rejected)
}
