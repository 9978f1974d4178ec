//! Client side of the remote generation service.
//!
//! - [`PredictionService`]: create a job, fetch its status (one attempt each)
//! - [`ReplicateClient`]: HTTP implementation against a Replicate-style API
//! - [`poll_until_done`]: wait for a job to reach a terminal state

mod config;
mod error;
mod poller;
mod replicate;
mod request;
mod traits;
mod types;

pub use config::{ModelProfile, ModelsConfig, ReplicateConfig};
pub use error::PredictionError;
pub use poller::{poll_until_done, PollPolicy};
pub use replicate::ReplicateClient;
pub use request::{build_input, render_prompt};
pub use traits::PredictionService;
pub use types::{JobHandle, JobKind, JobRequest, JobState, Prediction};
