//! This module defines the HTTP API endpoints consumed by the dashboards.
use super::WebState;
use crate::types::{LevelFilter, LogEntry};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Query parameters for an analysis run.
#[derive(Deserialize)]
pub struct AnalysisQuery {
    /// Window in minutes; the configured default when absent.
    window: Option<u32>,
    /// Restrict the analysis to one session.
    session: Option<String>,
}

/// Query parameters for the log drill-down.
#[derive(Deserialize)]
pub struct LogsQuery {
    /// `all` or a level name.
    #[serde(default = "default_level")]
    level: String,
    window: Option<u32>,
}

fn default_level() -> String {
    "all".to_string()
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    stored_entries: usize,
    buffered_entries: usize,
}

#[derive(Serialize)]
struct IngestResponse {
    accepted: usize,
}

/// Runs an analysis over the requested window.
#[axum::debug_handler]
pub async fn get_analysis(
    State(state): State<Arc<WebState>>,
    Query(query): Query<AnalysisQuery>,
) -> impl IntoResponse {
    let window = query.window.unwrap_or(state.default_window_minutes);

    match state
        .analyzer
        .analyze_session(query.session.as_deref(), window)
        .await
    {
        Ok(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        Err(e) => {
            error!("Analysis request failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.user_message().to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Lists entries of one level (or all), newest first.
#[axum::debug_handler]
pub async fn get_logs(
    State(state): State<Arc<WebState>>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let level: LevelFilter = match query.level.parse() {
        Ok(level) => level,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e })).into_response(),
    };
    let window = query.window.unwrap_or(state.default_window_minutes);

    let entries = state.analyzer.get_filtered_logs(level, window).await;
    (StatusCode::OK, Json(entries)).into_response()
}

/// Stores entries shipped by a client.
#[axum::debug_handler]
pub async fn post_logs(
    State(state): State<Arc<WebState>>,
    Json(entries): Json<Vec<LogEntry>>,
) -> impl IntoResponse {
    match state.store.append_batch(&entries).await {
        Ok(()) => {
            info!("Accepted {} shipped log entries", entries.len());
            (
                StatusCode::CREATED,
                Json(IngestResponse {
                    accepted: entries.len(),
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to store log entries: {}", e),
            }),
        )
            .into_response(),
    }
}

#[axum::debug_handler]
pub async fn get_health(State(state): State<Arc<WebState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        stored_entries: state.store.len(),
        buffered_entries: state.buffer.len(),
    })
}
