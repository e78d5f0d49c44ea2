use super::report::AuthReport;
use super::rules::{auth_categories, AuthCategory};
use crate::types::{LogEntry, LogLevel};

const PKCE_ADVICE: &str =
    "Verify the PKCE code verifier is stored before the redirect and read back from the same storage on callback";
const REDIRECT_ADVICE: &str =
    "Check that the OAuth redirect URL matches the allowed callback URLs configured for the auth provider";
const AUTH_ERROR_ADVICE: &str =
    "Authentication errors detected; check token refresh handling and the auth provider status";
const AUTH_VOLUME_ADVICE: &str =
    "High volume of auth events; look for a login or token refresh loop";

/// More auth events than this in one window triggers the volume advice.
const AUTH_EVENT_LOOP_THRESHOLD: usize = 50;

/// Picks out authentication-related entries and derives advice from them.
pub fn classify_auth(entries: &[LogEntry]) -> AuthReport {
    let mut report = AuthReport::default();

    for entry in entries {
        let categories = auth_categories(entry);
        if categories.is_empty() {
            continue;
        }

        report.auth_events.push(entry.clone());
        if entry.level == LogLevel::Error {
            report.auth_errors.push(entry.clone());
        }
        if categories.contains(&AuthCategory::Pkce) {
            report.pkce_issues.push(entry.clone());
        }
        if categories.contains(&AuthCategory::Redirect) {
            report.redirect_issues.push(entry.clone());
        }
    }

    report.recommendations = auth_recommendations(&report);
    report
}

fn auth_recommendations(report: &AuthReport) -> Vec<String> {
    let mut recommendations = Vec::new();
    if !report.pkce_issues.is_empty() {
        recommendations.push(PKCE_ADVICE.to_string());
    }
    if !report.redirect_issues.is_empty() {
        recommendations.push(REDIRECT_ADVICE.to_string());
    }
    if !report.auth_errors.is_empty() {
        recommendations.push(AUTH_ERROR_ADVICE.to_string());
    }
    if report.auth_events.len() > AUTH_EVENT_LOOP_THRESHOLD {
        recommendations.push(AUTH_VOLUME_ADVICE.to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry::new(Utc::now(), level, message)
    }

    #[test]
    fn pkce_error_yields_pkce_issue_and_advice() {
        let report = classify_auth(&[entry(LogLevel::Error, "OAuth PKCE verifier mismatch")]);
        assert_eq!(report.auth_events.len(), 1);
        assert_eq!(report.auth_errors.len(), 1);
        assert_eq!(report.pkce_issues.len(), 1);
        assert!(report.redirect_issues.is_empty());
        assert!(report.recommendations.iter().any(|r| r.contains("PKCE")));
        assert!(report.has_critical_issue());
    }

    #[test]
    fn informational_redirects_are_not_errors() {
        let report = classify_auth(&[
            entry(LogLevel::Info, "Redirecting to provider"),
            entry(LogLevel::Info, "recipe saved"),
        ]);
        assert_eq!(report.auth_events.len(), 1);
        assert_eq!(report.redirect_issues.len(), 1);
        assert!(report.auth_errors.is_empty());
        assert!(!report.has_critical_issue());
        assert!(report.recommendations.iter().any(|r| r.contains("redirect URL")));
    }

    #[test]
    fn no_auth_entries_means_no_advice() {
        let report = classify_auth(&[entry(LogLevel::Error, "calendar failed to render")]);
        assert!(report.auth_events.is_empty());
        assert!(report.recommendations.is_empty());
    }
}
