//! Replicate HTTP API client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::metrics;

use super::config::{ModelsConfig, ReplicateConfig};
use super::error::PredictionError;
use super::request::{build_input, CreatePredictionBody};
use super::traits::PredictionService;
use super::types::{JobHandle, JobRequest, Prediction};

const CREATE_FAILED: &str = "Failed to create prediction";
const STATUS_FAILED: &str = "Polling failed";

/// Error body returned by the service on non-success responses.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

/// Client for a Replicate-compatible prediction API.
pub struct ReplicateClient {
    client: reqwest::Client,
    config: ReplicateConfig,
    models: ModelsConfig,
}

impl ReplicateClient {
    pub fn new(config: ReplicateConfig, models: ModelsConfig) -> Result<Self, PredictionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| PredictionError::service(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            models,
        })
    }

    fn api_base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    fn token(&self) -> Result<&str, PredictionError> {
        self.config
            .api_token()
            .ok_or(PredictionError::MissingCredential)
    }

    async fn read_prediction(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<Prediction, PredictionError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PredictionError::Service {
                status: Some(status.as_u16()),
                message: error_message(&text, fallback),
            });
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| PredictionError::service(format!("invalid prediction response: {}", e)))
    }
}

/// Pick the service's `detail` message out of an error body, or fall back.
fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ServiceErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[async_trait]
impl PredictionService for ReplicateClient {
    fn name(&self) -> &str {
        "replicate"
    }

    fn is_configured(&self) -> bool {
        self.config.api_token().is_some()
    }

    async fn create_job(&self, request: &JobRequest) -> Result<Prediction, PredictionError> {
        let token = self.token()?;
        let profile = self.models.profile(request.kind);
        let body = CreatePredictionBody {
            version: &profile.version,
            input: build_input(profile, request)?,
        };

        debug!(kind = %request.kind, version = %profile.version, "Creating prediction");

        let started = Instant::now();
        let result = match self
            .client
            .post(format!("{}/v1/predictions", self.api_base()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => Self::read_prediction(response, CREATE_FAILED).await,
            Err(e) => Err(PredictionError::service(e.to_string())),
        };

        metrics::record_external_call(
            self.name(),
            "create",
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        result
    }

    async fn get_job_status(&self, handle: &JobHandle) -> Result<Prediction, PredictionError> {
        let token = self.token()?;

        let started = Instant::now();
        let result = match self
            .client
            .get(format!(
                "{}/v1/predictions/{}",
                self.api_base(),
                urlencoding::encode(handle.as_str())
            ))
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => Self::read_prediction(response, STATUS_FAILED).await,
            Err(e) => Err(PredictionError::service(e.to_string())),
        };

        metrics::record_external_call(
            self.name(),
            "get",
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        result
    }
}
