use super::{types::Config, ConfigError};
use crate::prediction::JobKind;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Poll interval is positive and the backoff never shrinks it
/// - Replicate request timeout is positive
/// - Every job kind has a model version
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Pipeline validation
    let pipeline = &config.pipeline;
    if pipeline.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.poll_interval_ms must be greater than 0".to_string(),
        ));
    }
    let backoff = pipeline.poll_backoff_multiplier;
    if !backoff.is_finite() || backoff < 1.0 {
        return Err(ConfigError::ValidationError(
            "pipeline.poll_backoff_multiplier must be a finite number of at least 1.0".to_string(),
        ));
    }
    if pipeline.poll_max_interval_ms < pipeline.poll_interval_ms {
        return Err(ConfigError::ValidationError(
            "pipeline.poll_max_interval_ms cannot be below poll_interval_ms".to_string(),
        ));
    }

    // Replicate validation
    if config.replicate.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "replicate.timeout_secs must be greater than 0".to_string(),
        ));
    }

    // Models validation
    for kind in [JobKind::Image, JobKind::Video, JobKind::Audio] {
        if config.models.profile(kind).version.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "models.{}.version cannot be empty",
                kind
            )));
        }
    }

    Ok(())
}
