//! Pipeline API handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use vibe_core::{PipelineError, PipelineState, PipelineStatus};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a generation
#[derive(Debug, Deserialize)]
pub struct StartGenerationBody {
    #[serde(default)]
    pub prompt: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct GenerationErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a generation run in the background
pub async fn start_generation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartGenerationBody>, JsonRejection>,
) -> Result<(StatusCode, Json<PipelineStatus>), impl IntoResponse> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(e) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(GenerationErrorResponse {
                    error: e.body_text(),
                }),
            ))
        }
    };

    match state.orchestrator().generate(&body.prompt).await {
        Ok(run) => {
            info!(run_id = run.id, "Generation accepted");
            Ok((
                StatusCode::ACCEPTED,
                Json(state.orchestrator().status().await),
            ))
        }
        Err(e) => {
            let status = match e {
                PipelineError::EmptyPrompt => StatusCode::BAD_REQUEST,
                PipelineError::RunInProgress(_) => StatusCode::CONFLICT,
            };
            Err((
                status,
                Json(GenerationErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// Current pipeline state and active run
pub async fn get_generation(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(state.orchestrator().status().await)
}

/// Stop any active run and return to idle
pub async fn reset_generation(State(state): State<Arc<AppState>>) -> Json<PipelineState> {
    Json(state.orchestrator().reset().await)
}
