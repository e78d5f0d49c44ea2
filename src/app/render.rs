//! Terminal rendering of reports and entry lists.
use crate::analysis::LogAnalysis;
use crate::types::{LogEntry, LogLevel};
use colored::{ColoredString, Colorize};
use std::fmt::Write;

fn level_label(level: LogLevel) -> ColoredString {
    match level {
        LogLevel::Error => level.as_str().red().bold(),
        LogLevel::Warn => level.as_str().yellow(),
        LogLevel::Info => level.as_str().green(),
        LogLevel::Debug => level.as_str().dimmed(),
    }
}

fn score_label(score: u8) -> ColoredString {
    let text = format!("{}/100", score);
    match score {
        80..=100 => text.green().bold(),
        50..=79 => text.yellow().bold(),
        _ => text.red().bold(),
    }
}

pub fn render_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] [{}] {}: {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        level_label(entry.level),
        entry.component_or_unknown().cyan(),
        entry.message
    )
}

/// A one-line summary used by the recurring review output.
pub fn render_headline(analysis: &LogAnalysis) -> String {
    format!(
        "{} health {} | {} logs, {} errors, {} warnings",
        analysis.generated_at.format("%H:%M:%S"),
        score_label(analysis.insights.health_score),
        analysis.summary.total_logs,
        analysis.summary.error_count,
        analysis.summary.warn_count
    )
}

pub fn render_analysis(analysis: &LogAnalysis) -> String {
    let summary = &analysis.summary;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} ({} minutes, {} to {})",
        "Log analysis".bold(),
        summary.time_range.duration_minutes,
        summary.time_range.start.format("%H:%M"),
        summary.time_range.end.format("%H:%M")
    );
    if let Some(session) = &analysis.session_id {
        let _ = writeln!(out, "Session: {}", session);
    }
    let _ = writeln!(out, "Health score: {}", score_label(analysis.insights.health_score));
    let _ = writeln!(
        out,
        "Total: {}  {}: {}  {}: {}  {}: {}  {}: {}",
        summary.total_logs,
        level_label(LogLevel::Error),
        summary.error_count,
        level_label(LogLevel::Warn),
        summary.warn_count,
        level_label(LogLevel::Info),
        summary.info_count,
        level_label(LogLevel::Debug),
        summary.debug_count
    );

    if !summary.top_components.is_empty() {
        let _ = writeln!(out, "\n{}", "Top components".bold());
        for component in &summary.top_components {
            let _ = writeln!(
                out,
                "  {:<24} {:>6} ({:.1}%)",
                component.component, component.count, component.percentage
            );
        }
    }

    let oauth = &analysis.oauth;
    if !oauth.auth_events.is_empty() {
        let _ = writeln!(out, "\n{}", "Authentication".bold());
        let _ = writeln!(
            out,
            "  events: {}  errors: {}  pkce: {}  redirect: {}",
            oauth.auth_events.len(),
            oauth.auth_errors.len(),
            oauth.pkce_issues.len(),
            oauth.redirect_issues.len()
        );
    }

    let issues = &analysis.issues;
    if !issues.repeated_errors.is_empty() {
        let _ = writeln!(out, "\n{}", "Repeated errors".bold());
        for group in &issues.repeated_errors {
            let _ = writeln!(
                out,
                "  {}x {} [{}]",
                group.count,
                group.message.red(),
                group.locations.join(", ")
            );
        }
    }

    let performance = &issues.performance;
    if !performance.high_volume_components.is_empty() || !performance.suspicious_patterns.is_empty() {
        let _ = writeln!(out, "\n{}", "Performance".bold());
        for component in &performance.high_volume_components {
            let _ = writeln!(
                out,
                "  {} logs {:.1}/min",
                component.component, component.logs_per_minute
            );
        }
        for pattern in &performance.suspicious_patterns {
            let _ = writeln!(out, "  {} {}", "!".yellow().bold(), pattern);
        }
    }

    if !analysis.insights.recommendations.is_empty() {
        let _ = writeln!(out, "\n{}", "Recommendations".bold());
        for recommendation in &analysis.insights.recommendations {
            let _ = writeln!(out, "  - {}", recommendation);
        }
    }

    out
}
