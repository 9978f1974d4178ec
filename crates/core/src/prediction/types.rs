//! Job types shared by the prediction client, the poller and the proxy API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::error::PredictionError;

/// Kind of media a generation job produces.
///
/// The audio kind is spelled `music` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "music")]
    Audio,
}

impl JobKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Image => "image",
            JobKind::Video => "video",
            JobKind::Audio => "music",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(JobKind::Image),
            "video" => Ok(JobKind::Video),
            "music" => Ok(JobKind::Audio),
            _ => Err(PredictionError::Validation("Invalid type".to_string())),
        }
    }
}

/// A request to create one generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub kind: JobKind,
    pub prompt: String,
    /// Image the job should start from (required by video jobs).
    pub reference_image: Option<String>,
}

impl JobRequest {
    pub fn new(kind: JobKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            reference_image: None,
        }
    }

    pub fn with_reference_image(mut self, url: impl Into<String>) -> Self {
        self.reference_image = Some(url.into());
        self
    }
}

/// Opaque identifier of a job created on the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a job as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[serde(rename = "starting", alias = "queued")]
    Queued,
    #[serde(rename = "processing", alias = "running")]
    Running,
    Succeeded,
    Failed,
    #[serde(alias = "aborted")]
    Canceled,
    /// Any state this client does not know about. Treated as still pending.
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Whether no further transition will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Canceled
        )
    }
}

/// Snapshot of a job as returned by the generation service.
///
/// Fields this crate does not interpret are kept in `extra` so the proxy can
/// hand the representation back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: JobState,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Prediction {
    pub fn new(id: impl Into<String>, status: JobState) -> Self {
        Self {
            id: id.into(),
            status,
            output: None,
            error: None,
            extra: Map::new(),
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(Value::String(error.into()));
        self
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle::new(self.id.clone())
    }

    /// The URL this job produced.
    ///
    /// Image and video models usually return a list of URLs; only the first
    /// one is used. A bare string is returned as-is.
    pub fn primary_output(&self) -> Option<String> {
        let url = match self.output.as_ref()? {
            Value::Array(items) => items.first().and_then(Value::as_str),
            Value::String(url) => Some(url.as_str()),
            _ => None,
        }?;

        if url.is_empty() {
            None
        } else {
            Some(url.to_string())
        }
    }

    /// Error text attached to the job, if any.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(message) if message.is_empty() => None,
            Value::String(message) => Some(message.clone()),
            other => Some(other.to_string()),
        }
    }
}
