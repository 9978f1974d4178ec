//! Testing utilities and mock implementations.
//!
//! This module provides a scripted mock of the prediction service trait,
//! allowing pipeline and API tests without a Replicate account.
//!
//! # Example
//!
//! ```rust,ignore
//! use vibe_core::testing::{JobScript, MockPredictionService};
//!
//! let service = MockPredictionService::new();
//!
//! // Keep the video job pending for three polls, then succeed.
//! service.set_script(JobKind::Video, JobScript::default().with_pending(3)).await;
//!
//! // Use in AppState...
//! ```

mod mock_prediction_service;

pub use mock_prediction_service::{
    JobScript, MockPredictionService, RecordedJob, RecordedStatusRequest,
};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    use crate::config::Config;
    use crate::prediction::{JobState, Prediction};

    /// A prediction as returned right after creation.
    pub fn starting_prediction(id: &str) -> Prediction {
        Prediction::new(id, JobState::Queued)
    }

    /// A finished prediction with a single-element output list.
    pub fn succeeded_prediction(id: &str, url: &str) -> Prediction {
        Prediction::new(id, JobState::Succeeded).with_output(json!([url]))
    }

    /// A failed prediction carrying the service's error text.
    pub fn failed_prediction(id: &str, error: &str) -> Prediction {
        Prediction::new(id, JobState::Failed).with_error(error)
    }

    /// Default configuration with a credential and a fast poll interval.
    pub fn test_config() -> Config {
        let mut config = Config::default();
        config.replicate.api_token = Some("r8_test_token".to_string());
        config.pipeline.poll_interval_ms = 10;
        config
    }

    /// Minimal TOML config binding the server to `127.0.0.1:port`, with no
    /// credential.
    pub fn config_toml(port: u16) -> String {
        format!(
            r#"
[server]
host = "127.0.0.1"
port = {}
"#,
            port
        )
    }
}
