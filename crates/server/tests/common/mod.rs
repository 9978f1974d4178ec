//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock prediction service injected, enabling API tests without a
//! Replicate account.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use vibe_core::{
    testing::MockPredictionService, Config, ModelsConfig, OverlapPolicy, PipelineConfig,
    PipelineOrchestrator, PredictionService,
};
use vibe_server::state::AppState;

/// Test fixture for API testing with a mock prediction service.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_prediction_creation() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/predictions", json!({
///         "type": "image",
///         "prompt": "forest"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock prediction service - script job outcomes
    pub service: Arc<MockPredictionService>,
    /// The orchestrator behind `/api/generation`
    pub orchestrator: Arc<PipelineOrchestrator>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let service = Arc::new(MockPredictionService::new());
        service.set_configured(test_config.configured);

        let pipeline = PipelineConfig {
            poll_interval_ms: 10,
            overlap_policy: test_config.overlap_policy,
            ..Default::default()
        };

        // No pauses between stages
        let mut models = ModelsConfig::default();
        models.video.delay_before_ms = 0;
        models.music.delay_before_ms = 0;

        let config = Config {
            pipeline: pipeline.clone(),
            models: models.clone(),
            ..Default::default()
        };

        let orchestrator = Arc::new(PipelineOrchestrator::new(
            pipeline,
            models,
            Arc::clone(&service) as Arc<dyn PredictionService>,
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&service) as Arc<dyn PredictionService>,
            Arc::clone(&orchestrator),
        ));

        // Create router
        let router = vibe_server::api::create_router(state);

        Self {
            router,
            service,
            orchestrator,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Whether the mock service reports a credential
    pub configured: bool,
    /// Overlap policy of the orchestrator
    pub overlap_policy: OverlapPolicy,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            configured: true,
            overlap_policy: OverlapPolicy::Supersede,
        }
    }
}

#[allow(dead_code)]
impl TestConfig {
    /// Mock service without a credential.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Default::default()
        }
    }

    /// Orchestrator that rejects overlapping runs.
    pub fn rejecting() -> Self {
        Self {
            overlap_policy: OverlapPolicy::Reject,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
