use std::time::Duration;
use thiserror::Error;

use super::types::JobState;

/// Errors raised while creating or tracking generation jobs.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Transport failure or non-success response from the generation service.
    #[error("{message}")]
    Service {
        status: Option<u16>,
        message: String,
    },

    /// No credential configured for the generation service.
    #[error("REPLICATE_API_TOKEN not set")]
    MissingCredential,

    /// The job reached a failed or canceled state.
    #[error("Prediction failed")]
    JobFailed { id: String, state: JobState },

    /// The request itself is invalid (unknown kind, missing input).
    #[error("{0}")]
    Validation(String),

    /// The job did not reach a terminal state within the polling budget.
    #[error("prediction {id} still pending after {waited:?}")]
    Timeout { id: String, waited: Duration },

    /// The job succeeded but produced nothing usable.
    #[error("prediction {0} succeeded without an output")]
    MissingOutput(String),
}

impl PredictionError {
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
