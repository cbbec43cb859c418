//! HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use agent_core::{AgentError, RunOutcome};
use tax_advisor::GREETING;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub provider_connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentsResponse {
    /// Coordinator first, then workers in routing priority
    pub agents: Vec<String>,
    pub max_steps: usize,
    pub greeting: String,
}

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub request: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeResponse {
    #[serde(flatten)]
    pub outcome: RunOutcome,

    /// `Usage: input tokens=.., output tokens=.., reasoning tokens=..`
    pub usage_summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
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
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        provider: state.provider.name().into(),
        provider_connected,
    })
}

/// Agents of the graph
pub async fn list_agents(State(state): State<AppState>) -> Json<AgentsResponse> {
    Json(AgentsResponse {
        agents: state.advisor.agent_names().into_iter().map(String::from).collect(),
        max_steps: state.advisor.graph().max_steps(),
        greeting: GREETING.into(),
    })
}

/// Run one tax question through the graph
pub async fn invoke_handler(
    State(state): State<AppState>,
    Json(payload): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, ApiError> {
    let request = payload.request.trim();
    if request.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Request must not be empty", "EMPTY_REQUEST"));
    }

    let outcome = state
        .advisor
        .invoke_until(request, tokio::time::sleep(state.request_timeout))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, timeout = ?state.request_timeout, "Run abandoned");
            match e {
                AgentError::Cancelled => api_error(
                    StatusCode::GATEWAY_TIMEOUT,
                    "The calculation took too long.",
                    "RUN_TIMEOUT",
                ),
                other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.user_message(), "RUN_FAILED"),
            }
        })?;

    Ok(Json(InvokeResponse {
        usage_summary: outcome.usage.to_string(),
        outcome,
    }))
}
