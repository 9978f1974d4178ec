use async_trait::async_trait;

use super::error::PredictionError;
use super::types::{JobHandle, JobRequest, Prediction};

/// A service that runs generation jobs asynchronously.
///
/// Implementations make exactly one attempt per call; retrying is left to
/// callers.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Name of this backend for logging.
    fn name(&self) -> &str;

    /// Whether the service has the credential it needs to make calls.
    fn is_configured(&self) -> bool {
        true
    }

    /// Create a job and return its initial representation.
    async fn create_job(&self, request: &JobRequest) -> Result<Prediction, PredictionError>;

    /// Fetch the current representation of a job.
    async fn get_job_status(&self, handle: &JobHandle) -> Result<Prediction, PredictionError>;
}
