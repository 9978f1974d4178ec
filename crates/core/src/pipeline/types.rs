//! Types for the pipeline orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::PipelineState;

/// Errors returned by [`super::PipelineOrchestrator::generate`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Prompt was empty or whitespace.
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// Another run is active and the overlap policy is `reject`.
    #[error("generation {0} is still running")]
    RunInProgress(u64),
}

/// Metadata about a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: u64,
    pub prompt: String,
    pub started_at: DateTime<Utc>,
}

/// Current state plus the active run, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub active_run: Option<RunInfo>,
}
