//! HTTP request handlers

use super::types::{
    AgentInfo, AgentsResponse, AssistantMessage, ChatRequest, ChatResponse, ErrorResponse,
};
use super::AppState;
use crate::llm::{LlmErrorKind, MessageRole};
use crate::network::{RequestError, RunError, RunRequest};
use crate::tools::SCHEMA_VERSION;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/agents", get(list_agents))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = RunRequest::new(body.messages.into_iter().map(Into::into).collect())?;

    let cancel = state.shutdown.child_token();
    let result = state.runner.run(&request, &cancel).await?;

    Ok(Json(ChatResponse {
        message: AssistantMessage {
            role: MessageRole::Assistant,
            content: result.message,
            tool_call: result.payload,
        },
        status: result.status,
        run_id: result.run_id,
    }))
}

// ============================================================
// Registry listing
// ============================================================

async fn list_agents(State(state): State<AppState>) -> Json<AgentsResponse> {
    let agents = state
        .runner
        .agents()
        .iter()
        .map(|agent| AgentInfo {
            name: agent.name.clone(),
            description: agent.description.clone(),
            tools: agent.tools.names().into_iter().map(str::to_string).collect(),
            model: agent.model.clone(),
        })
        .collect();

    Json(AgentsResponse {
        agents,
        entry_agent: state.runner.config().entry_agent.clone(),
        schema_version: SCHEMA_VERSION,
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("agent-network ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Upstream(StatusCode, String),
}

impl From<RequestError> for AppError {
    fn from(e: RequestError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<RunError> for AppError {
    fn from(e: RunError) -> Self {
        let RunError::Upstream { source, .. } = &e;
        let status = match source.kind {
            LlmErrorKind::Auth => StatusCode::UNAUTHORIZED,
            LlmErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_GATEWAY,
        };
        tracing::error!(error = %e, status = %status, "Run failed");
        AppError::Upstream(status, e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(status, msg) => (status, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
