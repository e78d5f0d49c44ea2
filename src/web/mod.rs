mod api;

use crate::analysis::LogAnalyzer;
use crate::logging::LogBuffer;
use crate::storage::SledEntryStore;
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Everything the API handlers need.
pub struct WebState {
    pub analyzer: Arc<LogAnalyzer>,
    pub store: SledEntryStore,
    pub buffer: Arc<LogBuffer>,
    pub default_window_minutes: u32,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/api/analysis", get(api::get_analysis))
        .route("/api/logs", get(api::get_logs).post(api::post_logs))
        .route("/api/health", get(api::get_health))
        .with_state(Arc::new(state))
        .layer(CorsLayer::permissive())
}

pub async fn start_server(state: WebState, port: u16) -> Result<()> {
    let app = router(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Log review API listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::storage::LayeredEntryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = SledEntryStore::new(db).unwrap();
        let buffer = Arc::new(LogBuffer::new(100));
        let layered = LayeredEntryStore::new(
            Arc::new(store.clone()),
            buffer.clone(),
            Duration::from_secs(1),
        );
        let analyzer = Arc::new(LogAnalyzer::new(Arc::new(layered), AnalysisConfig::default()));
        router(WebState {
            analyzer,
            store,
            buffer,
            default_window_minutes: 30,
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_store_analysis_is_healthy() {
        let response = test_router()
            .oneshot(Request::get("/api/analysis").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["summary"]["totalLogs"], 0);
        assert_eq!(json["insights"]["healthScore"], 100);
        assert_eq!(json["windowMinutes"], 30);
    }

    #[tokio::test]
    async fn posted_entries_show_up_in_filtered_logs() {
        let app = test_router();
        let now = chrono::Utc::now();
        let body = serde_json::json!([
            { "timestamp": now, "level": "ERROR", "message": "DB timeout", "component": "api" },
            { "timestamp": now, "level": "INFO", "message": "loaded", "component": "ui" }
        ]);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/logs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::get("/api/logs?level=error&window=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["message"], "DB timeout");
    }

    #[tokio::test]
    async fn unknown_level_is_a_bad_request() {
        let response = test_router()
            .oneshot(Request::get("/api/logs?level=loud").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_entry_counts() {
        let response = test_router()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["storedEntries"], 0);
    }
}
