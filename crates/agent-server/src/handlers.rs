//! HTTP Handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use agent_core::{adapter::Protocol, AgentError};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: BackendStatus,
    pub tools: Vec<String>,
}

#[derive(Serialize)]
pub struct BackendStatus {
    pub kind: String,
    pub name: String,
    pub model: String,
    pub native_tools: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_answer: Option<String>,
}

/// Error returned by handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                code,
                partial_answer: None,
            },
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidArguments { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.to_string())
            }
            AgentError::LoopNotTerminating { turns, .. } => {
                tracing::warn!(turns, "Query stopped at the turn ceiling");
                let mut api = Self::new(StatusCode::INTERNAL_SERVER_ERROR, "TURN_LIMIT", err.user_message());
                api.body.partial_answer = err.partial_answer().map(String::from);
                api
            }
            _ => {
                tracing::error!(error = %err, "Agent error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", err.user_message())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "INVALID_REQUEST", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let info = state.agent.adapter().backend();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        backend: BackendStatus {
            kind: state.backend_kind.clone(),
            name: info.name,
            model: info.model,
            native_tools: state.agent.adapter().protocol() == Protocol::Structured,
        },
        tools: state.agent.tools().names().into_iter().map(String::from).collect(),
    })
}

/// Answer one question
pub async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    tracing::info!(chars = request.question.len(), "Query received");

    let answer = state.agent.ask(&request.question).await?;

    Ok(Json(QueryResponse { answer }))
}
