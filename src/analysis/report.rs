//! The point-in-time report produced by one analysis run.
use crate::types::LogEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalysis {
    pub generated_at: DateTime<Utc>,
    pub window_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub summary: Summary,
    pub oauth: AuthReport,
    pub issues: Issues,
    pub insights: Insights,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_logs: usize,
    pub error_count: usize,
    pub warn_count: usize,
    pub info_count: usize,
    pub debug_count: usize,
    pub time_range: TimeRange,
    pub top_components: Vec<ComponentVolume>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVolume {
    pub component: String,
    pub count: usize,
    /// Share of the window's total entries, 0 to 100.
    pub percentage: f64,
}

/// Authentication-related entries, split by kind of problem.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthReport {
    pub auth_events: Vec<LogEntry>,
    pub auth_errors: Vec<LogEntry>,
    pub pkce_issues: Vec<LogEntry>,
    pub redirect_issues: Vec<LogEntry>,
    pub recommendations: Vec<String>,
}

impl AuthReport {
    /// A failed authentication is the one auth condition that lowers the health score.
    pub fn has_critical_issue(&self) -> bool {
        !self.auth_errors.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Issues {
    pub errors: Vec<LogEntry>,
    pub repeated_errors: Vec<RepeatedError>,
    pub performance: Performance,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepeatedError {
    pub message: String,
    pub count: usize,
    /// Distinct components the error came from, in order of first appearance.
    pub locations: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub high_volume_components: Vec<HighVolumeComponent>,
    pub suspicious_patterns: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HighVolumeComponent {
    pub component: String,
    pub count: usize,
    pub logs_per_minute: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub health_score: u8,
    pub error_patterns: Vec<String>,
    pub recommendations: Vec<String>,
}
