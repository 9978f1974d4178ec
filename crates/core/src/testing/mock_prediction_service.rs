//! Mock prediction service for testing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::fixtures;

use crate::prediction::{
    build_input, JobHandle, JobKind, JobRequest, JobState, ModelsConfig, Prediction,
    PredictionError, PredictionService,
};

/// Scripted behaviour for every job of one kind.
#[derive(Debug, Clone)]
pub struct JobScript {
    create_error: Option<String>,
    status_error: Option<String>,
    /// State reported on each status request; the last one repeats.
    states: Vec<JobState>,
    /// Output reported on success. `None` generates a URL from the job id.
    output: Option<Value>,
}

impl Default for JobScript {
    /// Succeed on the first status request with a generated URL.
    fn default() -> Self {
        Self {
            create_error: None,
            status_error: None,
            states: vec![JobState::Succeeded],
            output: None,
        }
    }
}

impl JobScript {
    /// Succeed immediately with `output`.
    pub fn succeed(output: Value) -> Self {
        Self {
            output: Some(output),
            ..Default::default()
        }
    }

    /// Report `pending` non-terminal states, then succeed with `output`.
    pub fn succeed_after(pending: usize, output: Value) -> Self {
        Self::succeed(output).with_pending(pending)
    }

    /// Report `states` in order; `output` is used once `succeeded` shows up.
    pub fn with_states(states: Vec<JobState>, output: Value) -> Self {
        Self {
            states,
            output: Some(output),
            ..Default::default()
        }
    }

    /// End in `state` on the first status request.
    pub fn terminate(state: JobState) -> Self {
        Self {
            states: vec![state],
            ..Default::default()
        }
    }

    /// Never finish.
    pub fn pending() -> Self {
        Self {
            states: vec![JobState::Running],
            ..Default::default()
        }
    }

    /// Fail the creation request with a service error.
    pub fn fail_on_create(message: impl Into<String>) -> Self {
        Self {
            create_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Accept the job, then fail every status request with a service error.
    pub fn fail_on_status(message: impl Into<String>) -> Self {
        Self {
            status_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Prepend `count` pending states (one `queued`, then `running`).
    pub fn with_pending(mut self, count: usize) -> Self {
        let mut states: Vec<JobState> = (0..count)
            .map(|i| if i == 0 { JobState::Queued } else { JobState::Running })
            .collect();
        states.append(&mut self.states);
        self.states = states;
        self
    }
}

/// A job accepted by the mock.
#[derive(Debug, Clone)]
pub struct RecordedJob {
    pub id: String,
    pub request: JobRequest,
    pub at: Instant,
}

/// A status request received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedStatusRequest {
    pub id: String,
    pub at: Instant,
}

#[derive(Debug)]
struct MockJob {
    kind: JobKind,
    script: JobScript,
    polls: usize,
}

/// Mock implementation of the PredictionService trait.
///
/// Every kind succeeds immediately unless scripted otherwise. Creation and
/// status requests are recorded with their (tokio) timestamps, which makes
/// the mock usable under `start_paused` tests.
///
/// # Example
///
/// ```rust,ignore
/// use vibe_core::testing::{JobScript, MockPredictionService};
///
/// let service = MockPredictionService::new();
/// service.set_script(JobKind::Video, JobScript::terminate(JobState::Failed)).await;
/// ```
#[derive(Debug)]
pub struct MockPredictionService {
    scripts: RwLock<HashMap<JobKind, JobScript>>,
    jobs: RwLock<HashMap<String, MockJob>>,
    created: RwLock<Vec<RecordedJob>>,
    status_requests: RwLock<Vec<RecordedStatusRequest>>,
    next_id: AtomicU64,
    unconfigured: AtomicBool,
    models: ModelsConfig,
}

impl Default for MockPredictionService {
    fn default() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            jobs: RwLock::new(HashMap::new()),
            created: RwLock::new(Vec::new()),
            status_requests: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            unconfigured: AtomicBool::new(false),
            models: ModelsConfig::default(),
        }
    }
}

impl MockPredictionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL reported for a successful job with no scripted output.
    pub fn generated_url(kind: JobKind, id: &str) -> String {
        let extension = match kind {
            JobKind::Image => "png",
            JobKind::Video => "mp4",
            JobKind::Audio => "mp3",
        };
        format!("https://mock.replicate.test/{}/{}.{}", kind, id, extension)
    }

    /// Script every subsequent job of `kind`.
    pub async fn set_script(&self, kind: JobKind, script: JobScript) {
        self.scripts.write().await.insert(kind, script);
    }

    /// Simulate a missing credential.
    pub fn set_configured(&self, configured: bool) {
        self.unconfigured.store(!configured, Ordering::SeqCst);
    }

    /// Jobs created so far, in order.
    pub async fn created_jobs(&self) -> Vec<RecordedJob> {
        self.created.read().await.clone()
    }

    pub async fn create_count(&self) -> usize {
        self.created.read().await.len()
    }

    /// Status requests received so far, in order.
    pub async fn status_requests(&self) -> Vec<RecordedStatusRequest> {
        self.status_requests.read().await.clone()
    }

    pub async fn status_request_count(&self) -> usize {
        self.status_requests.read().await.len()
    }

    fn success_output(kind: JobKind, id: &str, script: &JobScript) -> Value {
        match &script.output {
            Some(output) => output.clone(),
            // Image and video models return lists, music models a bare URL.
            None => match kind {
                JobKind::Audio => json!(Self::generated_url(kind, id)),
                _ => json!([Self::generated_url(kind, id)]),
            },
        }
    }
}

#[async_trait]
impl PredictionService for MockPredictionService {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        !self.unconfigured.load(Ordering::SeqCst)
    }

    async fn create_job(&self, request: &JobRequest) -> Result<Prediction, PredictionError> {
        if !self.is_configured() {
            return Err(PredictionError::MissingCredential);
        }
        // Same input rules as the real client.
        build_input(self.models.profile(request.kind), request)?;

        let script = self
            .scripts
            .read()
            .await
            .get(&request.kind)
            .cloned()
            .unwrap_or_default();

        if let Some(message) = &script.create_error {
            return Err(PredictionError::Service {
                status: Some(422),
                message: message.clone(),
            });
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("mock-{}-{}", request.kind, n);

        self.jobs.write().await.insert(
            id.clone(),
            MockJob {
                kind: request.kind,
                script,
                polls: 0,
            },
        );
        self.created.write().await.push(RecordedJob {
            id: id.clone(),
            request: request.clone(),
            at: Instant::now(),
        });

        Ok(fixtures::starting_prediction(&id))
    }

    async fn get_job_status(&self, handle: &JobHandle) -> Result<Prediction, PredictionError> {
        self.status_requests
            .write()
            .await
            .push(RecordedStatusRequest {
                id: handle.to_string(),
                at: Instant::now(),
            });

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(handle.as_str()).ok_or(PredictionError::Service {
            status: Some(404),
            message: "Prediction not found".to_string(),
        })?;

        if let Some(message) = &job.script.status_error {
            return Err(PredictionError::Service {
                status: Some(500),
                message: message.clone(),
            });
        }

        let states = &job.script.states;
        let state = states
            .get(job.polls)
            .or_else(|| states.last())
            .copied()
            .unwrap_or(JobState::Succeeded);
        job.polls += 1;

        Ok(match state {
            JobState::Succeeded => Prediction::new(handle.as_str(), state).with_output(
                Self::success_output(job.kind, handle.as_str(), &job.script),
            ),
            JobState::Failed => fixtures::failed_prediction(handle.as_str(), "mock failure"),
            _ => Prediction::new(handle.as_str(), state),
        })
    }
}
