//! Pipeline lifecycle integration tests.
//!
//! These tests drive the orchestrator against the mock prediction service:
//! - Phase sequence of a successful run (image -> video -> audio -> completed)
//! - Fatal image and video failures
//! - Music failure that still completes the run
//! - Reset while a run is in flight

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use vibe_core::{
    pipeline::{StateUpdateCallback, GENERIC_FAILURE_MESSAGE, VIDEO_FAILURE_MESSAGE},
    testing::{JobScript, MockPredictionService},
    JobKind, JobState, ModelsConfig, Phase, PipelineConfig, PipelineOrchestrator, PipelineState,
};

/// Test helper holding the orchestrator, its mock service and every
/// state the orchestrator published.
struct TestHarness {
    orchestrator: PipelineOrchestrator,
    service: Arc<MockPredictionService>,
    published: Arc<Mutex<Vec<PipelineState>>>,
}

impl TestHarness {
    fn new() -> Self {
        let service = Arc::new(MockPredictionService::new());
        let published = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&published);
        let callback: StateUpdateCallback = Arc::new(move |state: &PipelineState| {
            sink.lock().unwrap().push(state.clone());
        });

        let orchestrator = PipelineOrchestrator::new(
            PipelineConfig::default(),
            ModelsConfig::default(),
            service.clone(),
        )
        .with_update_callback(callback);

        Self {
            orchestrator,
            service,
            published,
        }
    }

    fn phases(&self) -> Vec<Phase> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|state| state.phase)
            .collect()
    }
}

#[tokio::test(start_paused = true)]
async fn test_successful_run_publishes_every_phase_in_order() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(
            JobKind::Image,
            JobScript::succeed_after(1, json!(["https://cdn/img.png"])),
        )
        .await;
    harness
        .service
        .set_script(
            JobKind::Video,
            JobScript::succeed_after(2, json!(["https://cdn/clip.mp4"])),
        )
        .await;
    harness
        .service
        .set_script(JobKind::Audio, JobScript::succeed(json!("https://cdn/track.mp3")))
        .await;

    let state = harness
        .orchestrator
        .generate_and_wait("rainy tokyo street at night")
        .await
        .unwrap();

    assert_eq!(
        harness.phases(),
        vec![
            Phase::GeneratingImage,
            Phase::GeneratingVideo,
            Phase::GeneratingAudio,
            Phase::Completed,
        ]
    );
    assert_eq!(state.image.as_deref(), Some("https://cdn/img.png"));
    assert_eq!(state.video.as_deref(), Some("https://cdn/clip.mp4"));
    assert_eq!(state.audio.as_deref(), Some("https://cdn/track.mp3"));
    assert!(state.error.is_none());

    // Exactly three jobs, one per kind, in pipeline order.
    let kinds: Vec<JobKind> = harness
        .service
        .created_jobs()
        .await
        .iter()
        .map(|job| job.request.kind)
        .collect();
    assert_eq!(kinds, vec![JobKind::Image, JobKind::Video, JobKind::Audio]);
}

#[tokio::test(start_paused = true)]
async fn test_results_appear_when_their_phase_starts() {
    let harness = TestHarness::new();

    harness.orchestrator.generate_and_wait("fields").await.unwrap();

    let published = harness.published.lock().unwrap().clone();
    let video_phase = &published[1];
    assert_eq!(video_phase.phase, Phase::GeneratingVideo);
    assert!(video_phase.image.is_some());
    assert!(video_phase.video.is_none());

    let audio_phase = &published[2];
    assert_eq!(audio_phase.phase, Phase::GeneratingAudio);
    assert!(audio_phase.video.is_some());
    assert!(audio_phase.audio.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_image_failure_stops_the_run() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Image, JobScript::fail_on_create("Invalid version"))
        .await;

    let state = harness.orchestrator.generate_and_wait("desert").await.unwrap();

    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.error.as_deref(), Some("Invalid version"));
    assert!(state.image.is_none());
    assert_eq!(harness.phases(), vec![Phase::GeneratingImage, Phase::Error]);
    assert_eq!(harness.service.create_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_image_job_reports_its_message() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Image, JobScript::terminate(JobState::Failed))
        .await;

    let state = harness.orchestrator.generate_and_wait("desert").await.unwrap();

    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.error.as_deref(), Some("Prediction failed"));
    let kinds: Vec<JobKind> = harness
        .service
        .created_jobs()
        .await
        .iter()
        .map(|job| job.request.kind)
        .collect();
    assert_eq!(kinds, vec![JobKind::Image]);
}

#[tokio::test(start_paused = true)]
async fn test_video_failure_keeps_image_and_uses_fixed_message() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Image, JobScript::succeed(json!(["https://cdn/img.png"])))
        .await;
    harness
        .service
        .set_script(JobKind::Video, JobScript::fail_on_status("upstream exploded"))
        .await;

    let state = harness.orchestrator.generate_and_wait("glacier").await.unwrap();

    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.error.as_deref(), Some(VIDEO_FAILURE_MESSAGE));
    assert_eq!(state.image.as_deref(), Some("https://cdn/img.png"));
    assert!(state.video.is_none());
    assert_eq!(
        harness.phases(),
        vec![Phase::GeneratingImage, Phase::GeneratingVideo, Phase::Error]
    );

    // No music job is ever submitted.
    let created = harness.service.created_jobs().await;
    assert!(created.iter().all(|job| job.request.kind != JobKind::Audio));
}

#[tokio::test(start_paused = true)]
async fn test_audio_failure_still_completes() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Audio, JobScript::terminate(JobState::Failed))
        .await;

    let state = harness.orchestrator.generate_and_wait("lighthouse").await.unwrap();

    assert_eq!(state.phase, Phase::Completed);
    assert!(state.image.is_some());
    assert!(state.video.is_some());
    assert!(state.audio.is_none());
    assert!(state.error.is_none());
    assert_eq!(
        harness.phases(),
        vec![
            Phase::GeneratingImage,
            Phase::GeneratingVideo,
            Phase::GeneratingAudio,
            Phase::Completed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_audio_creation_error_still_completes() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Audio, JobScript::fail_on_create("rate limited"))
        .await;

    let state = harness.orchestrator.generate_and_wait("meadow").await.unwrap();

    assert_eq!(state.phase, Phase::Completed);
    assert!(state.audio.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_empty_service_message_falls_back_to_generic() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Image, JobScript::fail_on_create(""))
        .await;

    let state = harness.orchestrator.generate_and_wait("void").await.unwrap();

    assert_eq!(state.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_run_returns_to_idle_for_good() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Image, JobScript::default().with_pending(10))
        .await;

    let run = harness.orchestrator.generate("slow sunrise").await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.orchestrator.state().phase, Phase::GeneratingImage);

    let state = harness.orchestrator.reset().await;
    assert_eq!(state, PipelineState::default());

    // Long after the image job would have finished, nothing has moved.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(harness.orchestrator.state(), PipelineState::default());
    assert_eq!(harness.orchestrator.store().current_run_id(), run.id + 1);
    assert_eq!(
        harness.phases(),
        vec![Phase::GeneratingImage, Phase::Idle]
    );
}

#[tokio::test(start_paused = true)]
async fn test_new_run_after_error_clears_previous_fields() {
    let harness = TestHarness::new();
    harness
        .service
        .set_script(JobKind::Video, JobScript::terminate(JobState::Canceled))
        .await;

    let failed = harness.orchestrator.generate_and_wait("first").await.unwrap();
    assert_eq!(failed.phase, Phase::Error);

    harness
        .service
        .set_script(JobKind::Video, JobScript::default())
        .await;
    harness.published.lock().unwrap().clear();

    harness.orchestrator.generate("second").await.unwrap();
    let started = harness.published.lock().unwrap()[0].clone();
    assert_eq!(started.phase, Phase::GeneratingImage);
    assert!(started.image.is_none());
    assert!(started.error.is_none());
}
