//! Pipeline orchestrator implementation.
//!
//! A run chains three jobs, each one strictly after the previous:
//! - Image: failure ends the run in `error`
//! - Video (seeded with the image): failure ends the run in `error`
//! - Music: failure is logged and the run still completes without audio

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::prediction::{
    poll_until_done, JobKind, JobRequest, ModelsConfig, PollPolicy, PredictionError,
    PredictionService,
};

use super::config::{OverlapPolicy, PipelineConfig};
use super::state::{Phase, PipelineState, TransitionError};
use super::store::{RunToken, StateStore, StoreError, StoreSnapshot};
use super::types::{PipelineError, PipelineStatus, RunInfo};

/// Error shown when the video stage fails, whatever the cause.
pub const VIDEO_FAILURE_MESSAGE: &str = "Failed to animate the scene.";

/// Error shown when a failure carries no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

/// Called with every state the orchestrator publishes.
///
/// Updates from a run are delivered while the state is locked, so the
/// callback must not read back from the orchestrator or its store.
pub type StateUpdateCallback = Arc<dyn Fn(&PipelineState) + Send + Sync>;

struct ActiveRun {
    info: RunInfo,
    handle: JoinHandle<()>,
}

impl ActiveRun {
    fn is_live(&self, store: &StateStore) -> bool {
        !self.handle.is_finished()
            && store.current_run_id() == self.info.id
            && !store.snapshot().phase.is_terminal()
    }
}

/// Drives the image → video → music pipeline and owns its state.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    models: Arc<ModelsConfig>,
    service: Arc<dyn PredictionService>,
    store: StateStore,
    active: Mutex<Option<ActiveRun>>,
    update_callback: Option<StateUpdateCallback>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        models: ModelsConfig,
        service: Arc<dyn PredictionService>,
    ) -> Self {
        Self {
            config,
            models: Arc::new(models),
            service,
            store: StateStore::new(),
            active: Mutex::new(None),
            update_callback: None,
        }
    }

    /// Set a callback invoked with every published state.
    pub fn with_update_callback(mut self, callback: StateUpdateCallback) -> Self {
        self.update_callback = Some(callback);
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.store.subscribe()
    }

    /// Current state and the active run, if one is in flight.
    pub async fn status(&self) -> PipelineStatus {
        let active = self.active.lock().await;
        PipelineStatus {
            state: self.store.snapshot(),
            active_run: active
                .as_ref()
                .filter(|run| run.is_live(&self.store))
                .map(|run| run.info.clone()),
        }
    }

    /// Start a run for `prompt` in the background.
    ///
    /// A run already in flight is aborted or kept according to the
    /// configured [`OverlapPolicy`].
    pub async fn generate(&self, prompt: &str) -> Result<RunInfo, PipelineError> {
        self.start(prompt).await.map(|(_, info)| info)
    }

    /// Start a run and wait until it finishes or is superseded.
    pub async fn generate_and_wait(&self, prompt: &str) -> Result<PipelineState, PipelineError> {
        let (token, _) = self.start(prompt).await?;
        Ok(self.store.wait_for_run(token).await)
    }

    /// Return to idle, stopping any run in flight.
    ///
    /// The remote jobs of an aborted run keep going on the service side;
    /// their results are never applied.
    pub async fn reset(&self) -> PipelineState {
        let mut active = self.active.lock().await;
        if let Some(run) = active.take() {
            if !run.handle.is_finished() {
                info!(run_id = run.info.id, "Aborting generation on reset");
                run.handle.abort();
            }
        }

        let state = self.store.reset();
        info!("Pipeline reset to idle");
        self.notify(&state);
        state
    }

    async fn start(&self, prompt: &str) -> Result<(RunToken, RunInfo), PipelineError> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::EmptyPrompt);
        }

        let mut active = self.active.lock().await;
        if let Some(run) = active.take() {
            if run.is_live(&self.store) {
                match self.config.overlap_policy {
                    OverlapPolicy::Reject => {
                        let run_id = run.info.id;
                        *active = Some(run);
                        warn!(run_id, "Rejecting generation: another run is active");
                        return Err(PipelineError::RunInProgress(run_id));
                    }
                    OverlapPolicy::Supersede => {
                        info!(run_id = run.info.id, "Superseding active generation");
                        run.handle.abort();
                    }
                }
            }
        }

        let (token, state) = self.store.begin_run();
        self.notify(&state);
        metrics::PIPELINE_RUNS.with_label_values(&["started"]).inc();

        let info = RunInfo {
            id: token.id(),
            prompt: prompt.to_string(),
            started_at: Utc::now(),
        };

        let run = PipelineRun {
            token,
            prompt: prompt.to_string(),
            service: Arc::clone(&self.service),
            store: self.store.clone(),
            models: Arc::clone(&self.models),
            poll: self.config.poll_policy(),
            update_callback: self.update_callback.clone(),
        };
        let handle = tokio::spawn(run.execute());

        *active = Some(ActiveRun {
            info: info.clone(),
            handle,
        });

        Ok((token, info))
    }

    fn notify(&self, state: &PipelineState) {
        if let Some(callback) = &self.update_callback {
            callback(state);
        }
    }
}

/// Everything one run needs, moved into its task.
struct PipelineRun {
    token: RunToken,
    prompt: String,
    service: Arc<dyn PredictionService>,
    store: StateStore,
    models: Arc<ModelsConfig>,
    poll: PollPolicy,
    update_callback: Option<StateUpdateCallback>,
}

impl PipelineRun {
    async fn execute(self) {
        let run_id = self.token.id();
        info!(run_id, service = self.service.name(), "Generation started");

        self.pause_before(JobKind::Image).await;
        let image = match self
            .run_stage(JobRequest::new(JobKind::Image, self.prompt.clone()))
            .await
        {
            Ok(url) => url,
            Err(e) => {
                error!(run_id, "Image generation failed: {}", e);
                if self.commit(|s| s.fail(failure_message(&e))) {
                    metrics::PIPELINE_RUNS.with_label_values(&["error"]).inc();
                }
                return;
            }
        };
        if !self.commit(|s| {
            s.image = Some(image.clone());
            s.advance(Phase::GeneratingVideo)
        }) {
            return;
        }

        self.pause_before(JobKind::Video).await;
        let video_request =
            JobRequest::new(JobKind::Video, self.prompt.clone()).with_reference_image(image);
        let video = match self.run_stage(video_request).await {
            Ok(url) => url,
            Err(e) => {
                error!(run_id, "Video generation failed: {}", e);
                if self.commit(|s| s.fail(VIDEO_FAILURE_MESSAGE)) {
                    metrics::PIPELINE_RUNS.with_label_values(&["error"]).inc();
                }
                return;
            }
        };
        if !self.commit(|s| {
            s.video = Some(video.clone());
            s.advance(Phase::GeneratingAudio)
        }) {
            return;
        }

        self.pause_before(JobKind::Audio).await;
        let audio = match self
            .run_stage(JobRequest::new(JobKind::Audio, self.prompt.clone()))
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(run_id, "Music generation failed, continuing without audio: {}", e);
                None
            }
        };

        let has_audio = audio.is_some();
        if self.commit(|s| {
            s.audio = audio;
            s.advance(Phase::Completed)
        }) {
            let outcome = if has_audio {
                "completed"
            } else {
                "completed_without_audio"
            };
            metrics::PIPELINE_RUNS.with_label_values(&[outcome]).inc();
            info!(run_id, has_audio, "Generation completed");
        }
    }

    async fn pause_before(&self, kind: JobKind) {
        let delay_ms = self.models.profile(kind).delay_before_ms;
        if delay_ms > 0 {
            debug!(run_id = self.token.id(), %kind, delay_ms, "Pausing before stage");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    async fn run_stage(&self, request: JobRequest) -> Result<String, PredictionError> {
        let run_id = self.token.id();
        let kind = request.kind;

        let started = Instant::now();

        let prediction = match self.service.create_job(&request).await {
            Ok(prediction) => prediction,
            Err(e) => {
                metrics::JOBS_CREATED
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                return Err(e);
            }
        };
        metrics::JOBS_CREATED
            .with_label_values(&[kind.as_str(), "success"])
            .inc();
        info!(run_id, %kind, prediction_id = %prediction.id, "Job created");

        let result = poll_until_done(self.service.as_ref(), &prediction.handle(), &self.poll).await;
        let label = if result.is_ok() { "success" } else { "error" };
        metrics::STAGE_DURATION
            .with_label_values(&[kind.as_str(), label])
            .observe(started.elapsed().as_secs_f64());

        let url = result?;
        info!(run_id, %kind, "Job finished");
        Ok(url)
    }

    /// Apply `change` if this run is still current. Returns false otherwise.
    fn commit<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut PipelineState) -> Result<(), TransitionError>,
    {
        // Notify while the store is still locked, so a later reset's idle
        // notification always comes after this one.
        let callback = self.update_callback.as_ref();
        let published = self.store.update(self.token, |state| {
            change(state)?;
            if let Some(callback) = callback {
                callback(&*state);
            }
            Ok(())
        });
        match published {
            Ok(_) => true,
            Err(StoreError::StaleRun(run_id)) => {
                debug!(run_id, "Discarding result of a superseded run");
                false
            }
            Err(StoreError::Transition(e)) => {
                error!(run_id = self.token.id(), "Rejected state change: {}", e);
                false
            }
        }
    }
}

fn failure_message(error: &PredictionError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        message
    }
}
