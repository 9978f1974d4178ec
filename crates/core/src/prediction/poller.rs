//! Polls a job until it reaches a terminal state.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics;

use super::error::PredictionError;
use super::traits::PredictionService;
use super::types::{JobHandle, JobState};

/// How often and for how long to poll a job.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait between the first two status requests.
    pub interval: Duration,
    /// Factor applied to the wait after every pending response. 1.0 keeps
    /// a fixed interval.
    pub backoff_multiplier: f64,
    /// Upper bound for the wait between two requests.
    pub max_interval: Duration,
    /// Give up once this much time has passed. `None` polls forever.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(10),
            max_wait: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl PollPolicy {
    /// Fixed-interval polling with no time budget.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff_multiplier: 1.0,
            max_interval: interval,
            max_wait: None,
        }
    }

    /// Wait to use after `current`. Saturates at `max_interval`, including
    /// when the multiplied value cannot be represented.
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier <= 1.0 {
            return current;
        }
        let cap = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .map_or(cap, |next| next.min(cap))
    }
}

/// Poll `handle` until it finishes and return the URL it produced.
///
/// The first status request is sent immediately. Service errors end the loop
/// at once; failed and canceled jobs end it with [`PredictionError::JobFailed`].
pub async fn poll_until_done(
    service: &dyn PredictionService,
    handle: &JobHandle,
    policy: &PollPolicy,
) -> Result<String, PredictionError> {
    let started = Instant::now();
    let mut interval = policy.interval;
    let mut attempts: u32 = 0;

    loop {
        let prediction = match service.get_job_status(handle).await {
            Ok(prediction) => prediction,
            Err(e) => {
                metrics::JOB_STATUS_REQUESTS
                    .with_label_values(&["error"])
                    .inc();
                return Err(e);
            }
        };
        attempts += 1;
        metrics::JOB_STATUS_REQUESTS
            .with_label_values(&[status_label(prediction.status)])
            .inc();

        match prediction.status {
            JobState::Succeeded => {
                debug!(id = %handle, attempts, "Prediction succeeded");
                return prediction
                    .primary_output()
                    .ok_or_else(|| PredictionError::MissingOutput(handle.to_string()));
            }
            JobState::Failed | JobState::Canceled => {
                warn!(
                    id = %handle,
                    state = ?prediction.status,
                    error = prediction.error_message().unwrap_or_default(),
                    "Prediction did not succeed"
                );
                return Err(PredictionError::JobFailed {
                    id: handle.to_string(),
                    state: prediction.status,
                });
            }
            state => {
                debug!(id = %handle, ?state, attempts, "Prediction pending");
            }
        }

        if let Some(budget) = policy.max_wait {
            let waited = started.elapsed();
            if waited + interval > budget {
                return Err(PredictionError::Timeout {
                    id: handle.to_string(),
                    waited,
                });
            }
        }

        tokio::time::sleep(interval).await;
        interval = policy.next_interval(interval);
    }
}

fn status_label(state: JobState) -> &'static str {
    match state {
        JobState::Succeeded => "succeeded",
        JobState::Failed => "failed",
        JobState::Canceled => "canceled",
        _ => "pending",
    }
}
