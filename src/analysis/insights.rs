use super::report::{AuthReport, Insights, Issues, Summary};
use super::rules::{error_category, ErrorCategory, ErrorRule};
use super::score::{health_score, ScoreInputs};
use std::collections::BTreeMap;

/// Below this score the report carries a general escalation hint.
const POOR_HEALTH_SCORE: u8 = 50;

/// Scores the window and turns the groupings into readable findings.
pub fn derive_insights(summary: &Summary, auth: &AuthReport, issues: &Issues) -> Insights {
    let health_score = health_score(&ScoreInputs {
        errors: summary.error_count,
        warnings: summary.warn_count,
        repeated_groups: issues.repeated_errors.len(),
        auth_failure: auth.has_critical_issue(),
    });

    let categories = categorize_errors(issues);

    Insights {
        health_score,
        error_patterns: error_patterns(issues, &categories),
        recommendations: recommendations(auth, issues, &categories, health_score),
    }
}

fn categorize_errors(issues: &Issues) -> BTreeMap<ErrorCategory, (&'static ErrorRule, usize)> {
    let mut categories = BTreeMap::new();
    for entry in &issues.errors {
        if let Some(rule) = error_category(entry) {
            categories.entry(rule.category).or_insert((rule, 0)).1 += 1;
        }
    }
    categories
}

fn category_label(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Timeout => "timeout",
        ErrorCategory::Connectivity => "network",
        ErrorCategory::Permission => "permission",
        ErrorCategory::Database => "database",
        ErrorCategory::RateLimit => "rate limit",
        ErrorCategory::Storage => "storage",
    }
}

fn error_patterns(
    issues: &Issues,
    categories: &BTreeMap<ErrorCategory, (&'static ErrorRule, usize)>,
) -> Vec<String> {
    let mut patterns: Vec<String> = issues
        .repeated_errors
        .iter()
        .map(|group| {
            format!(
                "Error \"{}\" occurred {} times in components [{}]",
                group.message,
                group.count,
                group.locations.join(", ")
            )
        })
        .collect();

    for (category, (_, count)) in categories {
        patterns.push(format!(
            "{} {} error{} in the window",
            count,
            category_label(*category),
            if *count == 1 { "" } else { "s" }
        ));
    }
    patterns
}

fn recommendations(
    auth: &AuthReport,
    issues: &Issues,
    categories: &BTreeMap<ErrorCategory, (&'static ErrorRule, usize)>,
    health_score: u8,
) -> Vec<String> {
    let mut recommendations: Vec<String> = auth.recommendations.clone();

    recommendations.extend(categories.values().map(|(rule, _)| rule.advice.to_string()));

    if let Some(top) = issues.repeated_errors.first() {
        recommendations.push(format!(
            "Fix the most frequent repeated error first: \"{}\" ({} occurrences)",
            top.message, top.count
        ));
    }

    for component in &issues.performance.high_volume_components {
        recommendations.push(format!(
            "Reduce log volume from '{}' ({:.1} logs/min)",
            component.component, component.logs_per_minute
        ));
    }

    if !issues.errors.is_empty() && categories.is_empty() && issues.repeated_errors.is_empty() {
        recommendations.push(format!(
            "Review the {} error{} logged in the window",
            issues.errors.len(),
            if issues.errors.len() == 1 { "" } else { "s" }
        ));
    }

    if health_score < POOR_HEALTH_SCORE {
        recommendations.push(
            "Overall log health is poor; address errors before shipping further changes".to_string(),
        );
    }

    let mut seen = std::collections::HashSet::new();
    recommendations.retain(|r| seen.insert(r.clone()));
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{issues::detect_issues, oauth::classify_auth, summary::summarize};
    use crate::config::AnalysisConfig;
    use crate::types::{LogEntry, LogLevel};
    use chrono::Utc;

    fn insights_for(entries: &[LogEntry]) -> Insights {
        let now = Utc::now();
        let summary = summarize(entries, now, now, 30, 10);
        let auth = classify_auth(entries);
        let issues = detect_issues(entries, 30, &AnalysisConfig::default());
        derive_insights(&summary, &auth, &issues)
    }

    fn error(component: &str, message: &str) -> LogEntry {
        LogEntry::new(Utc::now(), LogLevel::Error, message).with_component(component)
    }

    #[test]
    fn clean_window_has_no_findings() {
        let insights = insights_for(&[LogEntry::new(Utc::now(), LogLevel::Info, "ok")]);
        assert_eq!(insights.health_score, 100);
        assert!(insights.error_patterns.is_empty());
        assert!(insights.recommendations.is_empty());
    }

    #[test]
    fn repeated_errors_become_patterns_and_advice() {
        let insights = insights_for(&[error("api", "DB timeout"), error("api", "DB timeout")]);
        assert!(insights.error_patterns[0].contains("occurred 2 times in components [api]"));
        assert!(insights.error_patterns.iter().any(|p| p.starts_with("2 timeout errors")));
        assert!(insights
            .recommendations
            .iter()
            .any(|r| r.contains("timing out")));
        assert!(insights.health_score < 100);
    }

    #[test]
    fn uncategorized_single_error_gets_generic_review_advice() {
        let insights = insights_for(&[error("ui", "calendar widget crashed")]);
        assert_eq!(
            insights.recommendations,
            vec!["Review the 1 error logged in the window".to_string()]
        );
    }
}
