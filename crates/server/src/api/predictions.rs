//! Prediction proxy handlers.
//!
//! Thin pass-through to the configured prediction service so browser clients
//! never see the API token.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use vibe_core::{JobHandle, JobKind, JobRequest, Prediction, PredictionError};

use crate::metrics::PROXY_REQUESTS_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a prediction
#[derive(Debug, Deserialize)]
pub struct CreatePredictionBody {
    /// "image", "video" or "music"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub prompt: String,
    /// Reference image URL, required for video
    #[serde(rename = "inputImage")]
    pub input_image: Option<String>,
}

/// Client error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Upstream or configuration failure body
#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// Failure of a proxy request.
#[derive(Debug)]
pub enum ProxyError {
    /// The request itself is unusable (400).
    Invalid(String),
    /// Missing credential or the service failed (500).
    Upstream(String),
}

impl ProxyError {
    fn outcome(&self) -> &'static str {
        match self {
            ProxyError::Invalid(_) => "invalid",
            ProxyError::Upstream(_) => "upstream_error",
        }
    }
}

impl From<PredictionError> for ProxyError {
    fn from(err: PredictionError) -> Self {
        if err.is_validation() {
            ProxyError::Invalid(err.to_string())
        } else {
            ProxyError::Upstream(err.to_string())
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Invalid(error) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
            }
            ProxyError::Upstream(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DetailResponse { detail }),
            )
                .into_response(),
        }
    }
}

fn record(operation: &str, result: &Result<impl Sized, ProxyError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    PROXY_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a prediction job
pub async fn create_prediction(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreatePredictionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Prediction>), ProxyError> {
    let result = create(&state, body).await;
    record("create", &result);
    result
}

async fn create(
    state: &AppState,
    body: Result<Json<CreatePredictionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Prediction>), ProxyError> {
    // Credential first, whatever the body looks like.
    if !state.service().is_configured() {
        return Err(PredictionError::MissingCredential.into());
    }

    let Json(body) = body.map_err(|e| ProxyError::Invalid(e.body_text()))?;

    let kind: JobKind = body
        .kind
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ProxyError::from)?;

    let mut request = JobRequest::new(kind, body.prompt);
    if let Some(image) = body.input_image.filter(|url| !url.is_empty()) {
        request = request.with_reference_image(image);
    }

    match state.service().create_job(&request).await {
        Ok(prediction) => {
            debug!(%kind, id = %prediction.id, "Proxied prediction creation");
            Ok((StatusCode::CREATED, Json(prediction)))
        }
        Err(e) => {
            warn!(%kind, "Prediction creation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Get the current representation of a prediction job
pub async fn get_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Prediction>, ProxyError> {
    let result = match state.service().get_job_status(&JobHandle::new(id)).await {
        Ok(prediction) => match prediction.error_message() {
            Some(detail) => Err(ProxyError::Upstream(detail)),
            None => Ok(Json(prediction)),
        },
        Err(e) => {
            warn!("Prediction lookup failed: {}", e);
            Err(ProxyError::Upstream(e.to_string()))
        }
    };
    record("get", &result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_field_names() {
        let body: CreatePredictionBody = serde_json::from_str(
            r#"{"type": "video", "prompt": "waves", "inputImage": "https://a/1.png"}"#,
        )
        .unwrap();
        assert_eq!(body.kind.as_deref(), Some("video"));
        assert_eq!(body.prompt, "waves");
        assert_eq!(body.input_image.as_deref(), Some("https://a/1.png"));
    }

    #[test]
    fn test_validation_errors_are_client_errors() {
        let err = ProxyError::from(PredictionError::Validation("Invalid type".into()));
        assert!(matches!(err, ProxyError::Invalid(ref m) if m == "Invalid type"));

        let err = ProxyError::from(PredictionError::MissingCredential);
        assert!(matches!(err, ProxyError::Upstream(ref m) if m == "REPLICATE_API_TOKEN not set"));
    }
}
