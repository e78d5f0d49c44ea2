use super::report::{ComponentVolume, Summary, TimeRange};
use crate::types::{LogEntry, LogLevel};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Counts entries per level and ranks components by volume.
pub fn summarize(
    entries: &[LogEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window_minutes: u32,
    top_n: usize,
) -> Summary {
    let count_level = |level: LogLevel| entries.iter().filter(|e| e.level == level).count();

    Summary {
        total_logs: entries.len(),
        error_count: count_level(LogLevel::Error),
        warn_count: count_level(LogLevel::Warn),
        info_count: count_level(LogLevel::Info),
        debug_count: count_level(LogLevel::Debug),
        time_range: TimeRange {
            start,
            end,
            duration_minutes: window_minutes,
        },
        top_components: top_components(entries, top_n),
    }
}

/// Components sorted by descending volume (ties by name), truncated to `top_n`.
pub fn top_components(entries: &[LogEntry], top_n: usize) -> Vec<ComponentVolume> {
    let counts = component_counts(entries);
    let total = entries.len();

    let mut ranked: Vec<ComponentVolume> = counts
        .into_iter()
        .map(|(component, count)| ComponentVolume {
            component: component.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect();

    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.component.cmp(&b.component)));
    ranked.truncate(top_n);
    ranked
}

pub(crate) fn component_counts(entries: &[LogEntry]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.component_or_unknown()).or_default() += 1;
    }
    counts
}

/// `count / total * 100`, truncated to two decimals; 0 when `total` is 0.
///
/// Truncating keeps the percentages of a partition from summing past 100.
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as u64 * 10_000 / total as u64) as f64 / 100.0
}
