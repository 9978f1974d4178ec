use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::pipeline::PipelineConfig;
use crate::prediction::{ModelsConfig, ReplicateConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub replicate: ReplicateConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub replicate: SanitizedReplicateConfig,
    pub models: ModelsConfig,
    pub pipeline: PipelineConfig,
}

/// Sanitized Replicate config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedReplicateConfig {
    pub api_base: String,
    pub api_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            replicate: SanitizedReplicateConfig {
                api_base: config.replicate.api_base.clone(),
                api_token_configured: config.replicate.api_token().is_some(),
                timeout_secs: config.replicate.timeout_secs,
            },
            models: config.models.clone(),
            pipeline: config.pipeline.clone(),
        }
    }
}
