//! Health score policy.
//!
//! The score starts at 100 and loses weighted, capped penalties. Each penalty
//! only grows with error and warning volume, so the score never rises when
//! errors or warnings are added.

pub const MAX_SCORE: f64 = 100.0;

pub const ERROR_PENALTY: f64 = 2.0;
pub const ERROR_PENALTY_CAP: f64 = 40.0;

pub const WARN_PENALTY: f64 = 0.5;
pub const WARN_PENALTY_CAP: f64 = 20.0;

pub const REPEATED_GROUP_PENALTY: f64 = 10.0;
pub const REPEATED_GROUP_PENALTY_CAP: f64 = 30.0;

pub const AUTH_FAILURE_PENALTY: f64 = 15.0;

/// Inputs the score depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreInputs {
    pub errors: usize,
    pub warnings: usize,
    pub repeated_groups: usize,
    pub auth_failure: bool,
}

/// Computes the health score, 0 to 100.
pub fn health_score(inputs: &ScoreInputs) -> u8 {
    let error_penalty = (inputs.errors as f64 * ERROR_PENALTY).min(ERROR_PENALTY_CAP);
    let warn_penalty = (inputs.warnings as f64 * WARN_PENALTY).min(WARN_PENALTY_CAP);
    let repeated_penalty =
        (inputs.repeated_groups as f64 * REPEATED_GROUP_PENALTY).min(REPEATED_GROUP_PENALTY_CAP);
    let auth_penalty = if inputs.auth_failure {
        AUTH_FAILURE_PENALTY
    } else {
        0.0
    };

    let score = MAX_SCORE - error_penalty - warn_penalty - repeated_penalty - auth_penalty;
    score.clamp(0.0, MAX_SCORE).round() as u8
}
