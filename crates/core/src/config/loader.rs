use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable read for the API token in addition to the
/// `VIBE_REPLICATE__API_TOKEN` override.
pub const TOKEN_ENV_VAR: &str = "REPLICATE_API_TOKEN";

/// Defaults under everything, so partial sections keep the built-in values
/// for the keys they leave out.
fn base() -> Figment {
    Figment::from(Serialized::defaults(Config::default()))
}

fn with_env(figment: Figment) -> Figment {
    figment
        .merge(
            Env::raw()
                .only(&[TOKEN_ENV_VAR])
                .map(|_| "replicate.api_token".into()),
        )
        .merge(Env::prefixed("VIBE_").split("__"))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = with_env(base().merge(Toml::file(path)))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    with_env(base())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    base()
        .merge(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::JobKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_config_from_str_invalid_type() {
        let toml = r#"
[server]
port = "not a port"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_partial_model_profile_keeps_defaults() {
        let toml = r#"
[models.video]
version = "custom-video-version"

[models.image.params]
width = 512
"#;
        let config = load_config_from_str(toml).unwrap();

        let video = config.models.profile(JobKind::Video);
        assert_eq!(video.version, "custom-video-version");
        assert_eq!(video.reference_image_field.as_deref(), Some("input_image"));
        assert_eq!(video.delay_before_ms, 3000);

        let image = config.models.profile(JobKind::Image);
        assert_eq!(image.params["width"], 512);
        assert_eq!(image.params["height"], 1024);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[pipeline]
poll_interval_ms = 1500
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.pipeline.poll_interval_ms, 1500);
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "vibe.toml",
                r#"
[server]
port = 3000
"#,
            )?;
            jail.set_env("REPLICATE_API_TOKEN", "r8_from_env");
            jail.set_env("VIBE_SERVER__PORT", "4000");
            jail.set_env("VIBE_PIPELINE__OVERLAP_POLICY", "reject");

            let config = load_config(Path::new("vibe.toml")).unwrap();
            assert_eq!(config.server.port, 4000);
            assert_eq!(config.replicate.api_token(), Some("r8_from_env"));
            assert_eq!(
                config.pipeline.overlap_policy,
                crate::pipeline::OverlapPolicy::Reject
            );
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_token_wins_over_raw() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("REPLICATE_API_TOKEN", "r8_raw");
            jail.set_env("VIBE_REPLICATE__API_TOKEN", "r8_prefixed");

            let config = load_config_from_env().unwrap();
            assert_eq!(config.replicate.api_token(), Some("r8_prefixed"));
            Ok(())
        });
    }
}
