//! Text-matching rules used to classify entries.
//!
//! Each rule pairs a category with a lower-case needle that is searched for in
//! the lower-cased message and component. Adding a category means adding rows
//! here, not touching the aggregation code.
use crate::types::LogEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthCategory {
    /// Any authentication-related entry.
    General,
    Pkce,
    Redirect,
}

pub struct AuthRule {
    pub category: AuthCategory,
    pub needle: &'static str,
}

pub const AUTH_RULES: &[AuthRule] = &[
    AuthRule { category: AuthCategory::General, needle: "auth" },
    AuthRule { category: AuthCategory::General, needle: "token" },
    AuthRule { category: AuthCategory::General, needle: "login" },
    AuthRule { category: AuthCategory::General, needle: "session expired" },
    AuthRule { category: AuthCategory::Pkce, needle: "pkce" },
    AuthRule { category: AuthCategory::Pkce, needle: "code verifier" },
    AuthRule { category: AuthCategory::Pkce, needle: "code_verifier" },
    AuthRule { category: AuthCategory::Redirect, needle: "redirect" },
    AuthRule { category: AuthCategory::Redirect, needle: "callback url" },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCategory {
    Timeout,
    Connectivity,
    Permission,
    Database,
    RateLimit,
    Storage,
}

pub struct ErrorRule {
    pub category: ErrorCategory,
    pub needles: &'static [&'static str],
    pub advice: &'static str,
}

pub const ERROR_RULES: &[ErrorRule] = &[
    ErrorRule {
        category: ErrorCategory::Timeout,
        needles: &["timeout", "timed out"],
        advice: "Requests are timing out; check backend latency and consider longer timeouts with retry",
    },
    ErrorRule {
        category: ErrorCategory::Connectivity,
        needles: &["network", "connection refused", "failed to fetch", "offline", "unreachable"],
        advice: "Network failures detected; verify connectivity to the backend and add offline handling",
    },
    ErrorRule {
        category: ErrorCategory::Permission,
        needles: &["permission denied", "forbidden", "unauthorized", "row-level security", "403"],
        advice: "Permission errors detected; review access policies for the affected tables and routes",
    },
    ErrorRule {
        category: ErrorCategory::Database,
        needles: &["database", "sql", "constraint", "relation", "db "],
        advice: "Database errors detected; check schema migrations and query constraints",
    },
    ErrorRule {
        category: ErrorCategory::RateLimit,
        needles: &["rate limit", "too many requests", "429"],
        advice: "Rate limiting detected; reduce polling frequency or batch requests",
    },
    ErrorRule {
        category: ErrorCategory::Storage,
        needles: &["quota", "storage full", "disk full"],
        advice: "Storage quota pressure detected; prune old data or raise the quota",
    },
];

/// Lower-cased `message component` text that rules are matched against.
pub fn searchable_text(entry: &LogEntry) -> String {
    let mut text = entry.message.to_lowercase();
    if let Some(component) = &entry.component {
        text.push(' ');
        text.push_str(&component.to_lowercase());
    }
    text
}

/// Auth categories the entry falls into; empty if it is not auth-related.
///
/// PKCE and redirect matches also count as general auth matches.
pub fn auth_categories(entry: &LogEntry) -> Vec<AuthCategory> {
    let text = searchable_text(entry);
    let mut categories = Vec::new();
    for rule in AUTH_RULES {
        if text.contains(rule.needle) && !categories.contains(&rule.category) {
            categories.push(rule.category);
        }
    }
    if !categories.is_empty() && !categories.contains(&AuthCategory::General) {
        categories.insert(0, AuthCategory::General);
    }
    categories
}

/// The first error rule whose needles appear in the entry, if any.
pub fn error_category(entry: &LogEntry) -> Option<&'static ErrorRule> {
    let text = searchable_text(entry);
    ERROR_RULES
        .iter()
        .find(|rule| rule.needles.iter().any(|needle| text.contains(needle)))
}
