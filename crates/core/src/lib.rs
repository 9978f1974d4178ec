pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod prediction;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use pipeline::{
    OverlapPolicy, Phase, PipelineConfig, PipelineError, PipelineOrchestrator, PipelineState,
    PipelineStatus, RunInfo, StateStore,
};
pub use prediction::{
    poll_until_done, JobHandle, JobKind, JobRequest, JobState, ModelsConfig, PollPolicy,
    Prediction, PredictionError, PredictionService, ReplicateClient, ReplicateConfig,
};
