//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::prediction::PollPolicy;

/// What `generate` does while another run is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Abort the active run and start the new one.
    #[default]
    Supersede,
    /// Refuse the new run until the active one finishes.
    Reject,
}

/// Configuration for the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Wait between status requests for a job (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Growth factor for the wait between status requests.
    /// 1.0 keeps the interval fixed.
    #[serde(default = "default_backoff")]
    pub poll_backoff_multiplier: f64,

    /// Cap for the wait between status requests when backing off (milliseconds).
    #[serde(default = "default_max_poll_interval")]
    pub poll_max_interval_ms: u64,

    /// Give up on a job after this many seconds (0 = never).
    #[serde(default = "default_max_wait")]
    pub poll_max_wait_secs: u64,

    /// Behaviour of `generate` while a run is active.
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
}

fn default_poll_interval() -> u64 {
    2000 // 2 seconds
}

fn default_backoff() -> f64 {
    1.0
}

fn default_max_poll_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_max_wait() -> u64 {
    900 // 15 minutes
}

impl PipelineConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            backoff_multiplier: self.poll_backoff_multiplier,
            max_interval: Duration::from_millis(self.poll_max_interval_ms),
            max_wait: match self.poll_max_wait_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            poll_backoff_multiplier: default_backoff(),
            poll_max_interval_ms: default_max_poll_interval(),
            poll_max_wait_secs: default_max_wait(),
            overlap_policy: OverlapPolicy::default(),
        }
    }
}
