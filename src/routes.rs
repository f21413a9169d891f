//! Route definitions and router setup
//!
//! Thin control surface: every handler delegates one-to-one to the
//! orchestrator, the context manager or the insight ledger.

mod context;
mod control;
mod oversight;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{get, patch, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let cors = build_cors_layer(settings);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        .route("/health", get(health_check))

        // Orchestrator lifecycle and pipeline
        .route("/api/orchestrator/start", post(control::start))
        .route("/api/orchestrator/stop", post(control::stop))
        .route("/api/orchestrator/drain", post(control::drain))
        .route("/api/events", post(control::inject_event))
        .route("/api/metrics", get(control::get_metrics))
        .route("/api/metrics/history", get(control::get_metrics_history))
        .route("/api/state", get(control::get_state).patch(control::update_state))
        .route("/api/directors", get(control::list_directors))
        .route("/api/directors/{role}", patch(control::set_director_active))
        .route("/api/directors/{role}/oversight", get(control::director_oversight))

        // Oversight
        .route("/api/oversight", get(oversight::get_status))
        .route("/api/oversight/alerts", get(oversight::list_alerts))

        // Context and insights
        .route("/api/context", get(context::get_context))
        .route("/api/context/refresh", post(context::refresh_context))
        .route("/api/insights", get(context::list_insights))
        .route("/api/insights/rules", get(context::list_insight_rules))

        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::ACCEPT];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Governance orchestrator is running.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::context::{workspace_sources, ContextManager};
    use crate::insights::{InsightLedger, RuleBasedInsights};
    use crate::models::DirectorRole;
    use crate::orchestrator::GovernanceOrchestrator;
    use crate::persistence::MemoryStore;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app(dir: &tempfile::TempDir) -> (Router, SharedState) {
        std::fs::write(dir.path().join("README.md"), "# workspace").unwrap();

        let mut settings = Settings::default();
        settings.workspace.root = dir.path().to_path_buf();
        settings.orchestrator.enable_workspace_integration = false;
        settings.context = ContextConfig {
            cache_dir: dir.path().join(".governance/cache"),
            backup_dir: dir.path().join(".governance/backups"),
            ..Default::default()
        };

        let orchestrator = Arc::new(GovernanceOrchestrator::new(&settings, Arc::new(MemoryStore::new())));
        let ledger = Arc::new(InsightLedger::new());
        let mut sources = workspace_sources(&settings.workspace.root);
        sources.push(ledger.source());
        let context = Arc::new(ContextManager::open(&settings.context, sources).await);

        let state = Arc::new(AppState::new(orchestrator, context, ledger, Arc::new(RuleBasedInsights::new())));
        (create_router(Arc::clone(&state), &settings), state)
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _) = app(&dir).await;
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_inject_event_validates_severity() {
        let dir = tempfile::tempdir().unwrap();
        let (router, state) = app(&dir).await;

        let bad = router
            .clone()
            .oneshot(post_json(
                "/api/events",
                serde_json::json!({"type": "MARKET_SHIFT", "severity": 9, "description": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let ok = router
            .oneshot(post_json(
                "/api/events",
                serde_json::json!({"type": "SECURITY_INCIDENT", "severity": 5, "description": "key leaked"}),
            ))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let body = json(ok).await;
        assert_eq!(body["data"]["queueDepth"], 1);
        assert_eq!(state.orchestrator.get_metrics().await.events_received, 1);
    }

    #[tokio::test]
    async fn test_lifecycle_endpoints_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (router, state) = app(&dir).await;

        let first = json(router.clone().oneshot(post_json("/api/orchestrator/start", serde_json::json!({}))).await.unwrap()).await;
        let second = json(router.clone().oneshot(post_json("/api/orchestrator/start", serde_json::json!({}))).await.unwrap()).await;
        assert_eq!(first["data"], "started");
        assert_eq!(second["data"], "already_running");
        assert_eq!(state.orchestrator.timer_count(), 2);

        let stopped = json(router.oneshot(post_json("/api/orchestrator/stop", serde_json::json!({}))).await.unwrap()).await;
        assert_eq!(stopped["data"], "stopped");
    }

    #[tokio::test]
    async fn test_context_refresh_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _) = app(&dir).await;

        let refreshed = router
            .clone()
            .oneshot(post_json("/api/context/refresh?force=true", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(refreshed.status(), StatusCode::OK);
        let body = json(refreshed).await;
        assert_eq!(body["data"]["status"], "updated");
        assert_eq!(body["data"]["context"]["metadata"]["version"], "2.0.1");

        let current = json(
            router
                .oneshot(Request::get("/api/context").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(current["data"]["context"]["workspace"]["totalFiles"], 1);
        assert_eq!(current["data"]["stale"], false);
    }

    #[tokio::test]
    async fn test_unknown_director_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _) = app(&dir).await;

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/directors/treasurer")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"active": false}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("treasurer"));
    }

    #[tokio::test]
    async fn test_director_oversight_reports_role() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _) = app(&dir).await;

        let response = router
            .oneshot(Request::get("/api/directors/legal/oversight").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["data"]["role"], serde_json::to_value(DirectorRole::Legal).unwrap());
    }
}
