use std::sync::Arc;
use vibe_core::{Config, PipelineOrchestrator, PredictionService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<dyn PredictionService>,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        service: Arc<dyn PredictionService>,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> Self {
        Self {
            config,
            service,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Prediction service used by the proxy endpoints.
    pub fn service(&self) -> &dyn PredictionService {
        self.service.as_ref()
    }

    pub fn orchestrator(&self) -> &PipelineOrchestrator {
        self.orchestrator.as_ref()
    }
}
