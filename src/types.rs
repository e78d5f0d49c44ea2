//! Log entry types shared by the capture layer, the stores and the analyzer.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Severity of a log entry.
///
/// Ordered from most to least severe so that `level <= LogLevel::Warn`
/// selects warnings and errors.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" | "TRACE" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => LogLevel::Error,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::INFO => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

/// Level selector for drill-down queries: one level, or every level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LevelFilter {
    #[default]
    All,
    Only(LogLevel),
}

impl LevelFilter {
    pub fn matches(&self, level: LogLevel) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Only(wanted) => *wanted == level,
        }
    }
}

impl FromStr for LevelFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(LevelFilter::All)
        } else {
            s.parse().map(LevelFilter::Only)
        }
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelFilter::All => f.write_str("all"),
            LevelFilter::Only(level) => write!(f, "{}", level),
        }
    }
}

/// A single structured log record. Never mutated after creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            level,
            message: message.into(),
            component: None,
            data: None,
            stack: None,
            session_id: None,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Component name used for grouping; entries without one count as `unknown`.
    pub fn component_or_unknown(&self) -> &str {
        self.component.as_deref().unwrap_or(UNKNOWN_COMPONENT)
    }

    /// Whether this entry belongs to the given session scope.
    ///
    /// A `None` scope matches every entry.
    pub fn in_session(&self, session_id: Option<&str>) -> bool {
        match session_id {
            None => true,
            Some(wanted) => self.session_id.as_deref() == Some(wanted),
        }
    }
}

pub const UNKNOWN_COMPONENT: &str = "unknown";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_is_case_insensitive() {
        assert_eq!("error".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert_eq!("Warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn level_filter_parses_all_and_levels() {
        assert_eq!("ALL".parse::<LevelFilter>(), Ok(LevelFilter::All));
        assert_eq!(
            "info".parse::<LevelFilter>(),
            Ok(LevelFilter::Only(LogLevel::Info))
        );
        assert!(LevelFilter::Only(LogLevel::Warn).matches(LogLevel::Warn));
        assert!(!LevelFilter::Only(LogLevel::Warn).matches(LogLevel::Error));
    }

    #[test]
    fn entry_json_uses_camel_case_and_upper_case_levels() {
        let entry = LogEntry::new(Utc::now(), LogLevel::Error, "boom")
            .with_component("api")
            .with_session("s-1");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "ERROR");
        assert_eq!(json["sessionId"], "s-1");
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn entry_without_id_gets_one_on_decode() {
        let raw = r#"{"timestamp":"2026-01-01T00:00:00Z","level":"INFO","message":"hi"}"#;
        let entry: LogEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.component_or_unknown(), UNKNOWN_COMPONENT);
        assert!(!entry.id.is_nil());
    }

    #[test]
    fn session_scope_matching() {
        let entry = LogEntry::new(Utc::now(), LogLevel::Info, "x").with_session("a");
        assert!(entry.in_session(None));
        assert!(entry.in_session(Some("a")));
        assert!(!entry.in_session(Some("b")));
    }
}
