//! Three-stage generation pipeline.
//!
//! The orchestrator turns a prompt into an image, animates it into a video
//! and scores it with a music track:
//! - **Stages**: strictly sequential, each job polled to completion
//! - **State**: one observable [`PipelineState`] in a [`StateStore`]
//! - **Runs**: tagged with a token; stale runs never write to the state

mod config;
mod runner;
mod state;
mod store;
mod types;

pub use config::{OverlapPolicy, PipelineConfig};
pub use runner::{
    PipelineOrchestrator, StateUpdateCallback, GENERIC_FAILURE_MESSAGE, VIDEO_FAILURE_MESSAGE,
};
pub use state::{Phase, PipelineState, TransitionError};
pub use store::{RunToken, StateStore, StoreError, StoreSnapshot};
pub use types::{PipelineError, PipelineStatus, RunInfo};
