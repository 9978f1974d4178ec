//! Generation service and per-kind model configuration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::types::JobKind;

/// Connection settings for the Replicate-compatible generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateConfig {
    /// API token. Usually supplied through `REPLICATE_API_TOKEN`.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Base URL of the service (default: "https://api.replicate.com").
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl ReplicateConfig {
    /// The configured token, ignoring blank values.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.replicate.com".to_string()
}

fn default_timeout() -> u32 {
    60
}

/// How to turn a job request into model input for one job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Model version identifier sent with every creation request.
    pub version: String,
    /// Template for the `prompt` input. `{prompt}` is replaced by the user
    /// prompt. When absent the prompt is not sent at all.
    #[serde(default)]
    pub prompt_template: Option<String>,
    /// Input field that receives the reference image URL. Kinds with this
    /// field set cannot be created without a reference image.
    #[serde(default)]
    pub reference_image_field: Option<String>,
    /// Fixed input parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Pause before this stage starts, in milliseconds.
    #[serde(default)]
    pub delay_before_ms: u64,
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn default_image_profile() -> ModelProfile {
    ModelProfile {
        version: "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b".to_string(),
        prompt_template: Some(
            "lofi style, anime style, {prompt}, detailed, atmospheric, 8k, highly detailed"
                .to_string(),
        ),
        reference_image_field: None,
        params: params(json!({
            "width": 1024,
            "height": 1024,
            "refine": "expert_ensemble_refiner",
        })),
        delay_before_ms: 0,
    }
}

fn default_video_profile() -> ModelProfile {
    ModelProfile {
        version: "3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438".to_string(),
        prompt_template: None,
        reference_image_field: Some("input_image".to_string()),
        params: params(json!({
            "video_length": "25_frames_with_svd_xt",
            "frames_per_second": 6,
            "motion_bucket_id": 127,
            "cond_aug": 0.02,
        })),
        // Spaces out requests to stay under the service's rate limit
        delay_before_ms: 3000,
    }
}

fn default_music_profile() -> ModelProfile {
    ModelProfile {
        version: "b05b1dff1d8c6dc63d14b0cdb42135378dcb87f6373b0d3d341ede46e59e2b38".to_string(),
        prompt_template: Some("lofi hip hop, chill, ambient, {prompt}".to_string()),
        reference_image_field: None,
        params: params(json!({
            "model_version": "stereo-large",
            "duration": 30,
        })),
        delay_before_ms: 3000,
    }
}

/// Model profiles for every job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_image_profile")]
    pub image: ModelProfile,
    #[serde(default = "default_video_profile")]
    pub video: ModelProfile,
    #[serde(default = "default_music_profile")]
    pub music: ModelProfile,
}

impl ModelsConfig {
    pub fn profile(&self, kind: JobKind) -> &ModelProfile {
        match kind {
            JobKind::Image => &self.image,
            JobKind::Video => &self.video,
            JobKind::Audio => &self.music,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            image: default_image_profile(),
            video: default_video_profile(),
            music: default_music_profile(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles() {
        let models = ModelsConfig::default();

        let image = models.profile(JobKind::Image);
        assert_eq!(image.params["width"], 1024);
        assert_eq!(image.params["refine"], "expert_ensemble_refiner");
        assert_eq!(image.delay_before_ms, 0);

        let video = models.profile(JobKind::Video);
        assert!(video.prompt_template.is_none());
        assert_eq!(video.reference_image_field.as_deref(), Some("input_image"));
        assert_eq!(video.params["frames_per_second"], 6);
        assert_eq!(video.delay_before_ms, 3000);

        let music = models.profile(JobKind::Audio);
        assert_eq!(music.params["duration"], 30);
        assert_eq!(music.params["model_version"], "stereo-large");
        assert_eq!(music.delay_before_ms, 3000);
    }

    #[test]
    fn test_api_token_ignores_blank() {
        let mut config = ReplicateConfig::default();
        assert!(config.api_token().is_none());

        config.api_token = Some("   ".to_string());
        assert!(config.api_token().is_none());

        config.api_token = Some("r8_secret".to_string());
        assert_eq!(config.api_token(), Some("r8_secret"));
    }

    #[test]
    fn test_deserialize_profile_override() {
        let toml = r#"
            version = "custom-version"
            prompt_template = "vaporwave, {prompt}"
            delay_before_ms = 500

            [params]
            width = 512
        "#;
        let profile: ModelProfile = toml::from_str(toml).unwrap();
        assert_eq!(profile.version, "custom-version");
        assert_eq!(profile.params["width"], 512);
        assert!(profile.reference_image_field.is_none());
        assert_eq!(profile.delay_before_ms, 500);
    }
}
