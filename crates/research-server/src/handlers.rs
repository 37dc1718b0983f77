//! HTTP Handlers

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use agent_core::{AgentError, RunLog};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_connected: bool,
    pub tools: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub brief: String,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub run_id: String,
    pub compressed_research: String,
    pub raw_notes: Vec<String>,
    pub run_log: RunLog,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_log: Option<RunLog>,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

const fn default_limit() -> usize {
    20
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: &AgentError, run_log: Option<RunLog>) -> ApiError {
    let code = match error {
        AgentError::Config(_) => "CONFIG",
        AgentError::RateLimited(_) => "RATE_LIMITED",
        AgentError::Auth(_) => "PROVIDER_AUTH",
        AgentError::Timeout { .. } => "TIMEOUT",
        e if e.is_model_failure() => "MODEL_ERROR",
        _ => "INTERNAL",
    };
    (
        status,
        Json(ErrorResponse {
            error: error.user_message(),
            code: code.into(),
            run_log,
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider_connected,
        tools: state.researcher.tools().names().into_iter().map(String::from).collect(),
    })
}

/// Run one research brief to completion
pub async fn research_handler(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let brief = payload.brief.trim();
    if brief.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            &AgentError::Config("brief must not be empty".into()),
            None,
        ));
    }

    match state.researcher.run(brief).await {
        Ok(output) => Ok(Json(ResearchResponse {
            run_id: output.run_log.run_id.to_string(),
            compressed_research: output.compressed_research,
            raw_notes: output.raw_notes,
            run_log: output.run_log,
        })),
        Err(failure) => {
            tracing::error!("Research run failed: {}", failure);
            let status = if failure.error.is_model_failure() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Err(error_response(status, &failure.error, Some(failure.log)))
        }
    }
}

/// Most recent run logs, newest first
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<RunLog>>, ApiError> {
    state
        .runs
        .recent(query.limit)
        .map(Json)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, &e, None))
}

/// Application routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/research", post(research_handler))
        .route("/api/runs", get(list_runs))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{
        Completion, ToolRegistry,
        testing::{EchoTool, ScriptedProvider, query_call},
    };
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    fn app(script: Vec<agent_core::Result<Completion>>) -> (Router, AppState) {
        let config = ServerConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "SEARCH_BACKEND" => Some("mock".into()),
            "MODEL_MAX_RETRIES" => Some("0".into()),
            _ => None,
        })
        .unwrap();

        let mut tools = ToolRegistry::new();
        tools.register(EchoTool::new("quick_search"));
        let provider = Arc::new(ScriptedProvider::new(script));
        let state = AppState::assemble(&config, provider, tools, None).unwrap();
        (router(state.clone()), state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_research(brief: &str) -> Request<Body> {
        Request::post("/api/research")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "brief": brief }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["tools"], serde_json::json!(["quick_search"]));
    }

    #[tokio::test]
    async fn test_research_round_trip() {
        let (app, state) = app(vec![
            Ok(Completion::tool_calls(vec![query_call("quick_search", "jamf", "c1")]).with_usage(10, 2)),
            Ok(Completion::text("JAMF manages Apple devices.").with_usage(20, 5)),
            Ok(Completion::text("# Report").with_usage(30, 7)),
        ]);

        let response = app.oneshot(post_research("Research JAMF")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["compressed_research"], "# Report");
        assert_eq!(json["run_log"]["loops"], 2);
        assert_eq!(json["run_log"]["tool_metrics"]["total_calls"], 1);
        assert_eq!(json["run_log"]["token_metrics"]["total"], 74);
        assert_eq!(state.runs.recent(5).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_brief_rejected() {
        let (app, _) = app(vec![]);
        let response = app.oneshot(post_research("   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_model_failure_returns_partial_log() {
        let (app, state) = app(vec![Err(AgentError::Auth("bad key".into()))]);

        let response = app.oneshot(post_research("Research JAMF")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = body_json(response).await;
        assert_eq!(json["code"], "PROVIDER_AUTH");
        assert_eq!(json["run_log"]["status"], "failed");
        assert_eq!(json["run_log"]["loops"], 1);

        let runs = state.runs.recent(1).unwrap();
        assert_eq!(runs[0].status, agent_core::RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_list_runs_limit() {
        let (app, state) = app(vec![
            Ok(Completion::text("a")),
            Ok(Completion::text("report a")),
            Ok(Completion::text("b")),
            Ok(Completion::text("report b")),
        ]);
        state.researcher.run("first").await.unwrap();
        state.researcher.run("second").await.unwrap();

        let response = app
            .oneshot(Request::get("/api/runs?limit=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }
}
