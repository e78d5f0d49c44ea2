use super::report::{HighVolumeComponent, Issues, Performance, RepeatedError};
use super::summary::component_counts;
use crate::config::AnalysisConfig;
use crate::types::{LogEntry, LogLevel};
use chrono::Duration;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// An identical error seen at least this many times is flagged as suspicious.
pub const REPEATED_ERROR_ALERT: usize = 5;

/// Minimum volume before the error ratio check applies.
const ERROR_RATIO_MIN_TOTAL: usize = 10;

/// Collects errors, groups repeats and flags volume and burst problems.
pub fn detect_issues(entries: &[LogEntry], window_minutes: u32, config: &AnalysisConfig) -> Issues {
    let errors: Vec<LogEntry> = entries
        .iter()
        .filter(|e| e.level == LogLevel::Error)
        .cloned()
        .collect();

    let repeated_errors = repeated_errors(&errors);
    let high_volume_components =
        high_volume_components(entries, window_minutes, config.high_volume_per_minute);

    let mut suspicious_patterns = burst_patterns(&errors, config.burst_error_threshold);
    for group in repeated_errors
        .iter()
        .filter(|group| group.count >= REPEATED_ERROR_ALERT)
    {
        suspicious_patterns.push(format!(
            "Identical error \"{}\" repeated {} times",
            group.message, group.count
        ));
    }
    if entries.len() >= ERROR_RATIO_MIN_TOTAL && errors.len() * 2 > entries.len() {
        suspicious_patterns.push(format!(
            "{} of {} logs in the window are errors",
            errors.len(),
            entries.len()
        ));
    }

    Issues {
        errors,
        repeated_errors,
        performance: Performance {
            high_volume_components,
            suspicious_patterns,
        },
    }
}

/// Groups errors by normalized message, keeping groups seen twice or more.
pub fn repeated_errors(errors: &[LogEntry]) -> Vec<RepeatedError> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, RepeatedError> = HashMap::new();

    for entry in errors {
        let key = normalize_message(&entry.message);
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            RepeatedError {
                message: entry.message.trim().to_string(),
                count: 0,
                locations: Vec::new(),
            }
        });
        group.count += 1;
        let component = entry.component_or_unknown();
        if !group.locations.iter().any(|c| c == component) {
            group.locations.push(component.to_string());
        }
    }

    let mut repeated: Vec<RepeatedError> = order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter(|group| group.count >= 2)
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    repeated.sort_by(|a, b| b.count.cmp(&a.count));
    repeated
}

/// Grouping key for error messages.
///
/// Lower-cased and trimmed, hex/UUID-like tokens of 8+ characters become
/// `<id>`, digit runs become `#`, whitespace runs collapse to one space.
pub fn normalize_message(message: &str) -> String {
    static ID_TOKEN: OnceLock<Regex> = OnceLock::new();
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let id_token = ID_TOKEN.get_or_init(|| {
        Regex::new(r"\b[0-9a-f]{8,}(?:-[0-9a-f]{4,})*\b").expect("valid regex")
    });
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    let whitespace =
        WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let lowered = message.trim().to_lowercase();
    let without_ids = id_token.replace_all(&lowered, "<id>");
    let without_digits = digits.replace_all(&without_ids, "#");
    whitespace.replace_all(&without_digits, " ").into_owned()
}

fn high_volume_components(
    entries: &[LogEntry],
    window_minutes: u32,
    threshold_per_minute: f64,
) -> Vec<HighVolumeComponent> {
    let minutes = f64::from(window_minutes.max(1));

    let mut flagged: Vec<HighVolumeComponent> = component_counts(entries)
        .into_iter()
        .map(|(component, count)| HighVolumeComponent {
            component: component.to_string(),
            count,
            logs_per_minute: count as f64 / minutes,
        })
        .filter(|c| c.logs_per_minute > threshold_per_minute)
        .collect();

    flagged.sort_by(|a, b| {
        b.logs_per_minute
            .total_cmp(&a.logs_per_minute)
            .then_with(|| a.component.cmp(&b.component))
    });
    flagged
}

/// Flags components that logged more than `threshold` errors inside one minute.
fn burst_patterns(errors: &[LogEntry], threshold: usize) -> Vec<String> {
    let mut by_component: HashMap<&str, Vec<_>> = HashMap::new();
    for entry in errors {
        by_component
            .entry(entry.component_or_unknown())
            .or_default()
            .push(entry.timestamp);
    }

    let mut components: Vec<_> = by_component.into_iter().collect();
    components.sort_by(|a, b| a.0.cmp(b.0));

    let mut patterns = Vec::new();
    for (component, mut stamps) in components {
        stamps.sort();
        let peak = peak_within(&stamps, Duration::minutes(1));
        if peak > threshold {
            patterns.push(format!(
                "Component '{}' logged {} errors in under a minute",
                component, peak
            ));
        }
    }
    patterns
}

/// Largest number of sorted timestamps that fit in a span shorter than `span`.
fn peak_within(stamps: &[chrono::DateTime<chrono::Utc>], span: Duration) -> usize {
    let mut peak = 0;
    let mut start = 0;
    for end in 0..stamps.len() {
        while stamps[end] - stamps[start] >= span {
            start += 1;
        }
        peak = peak.max(end - start + 1);
    }
    peak
}
