//! Pipeline state record and its transition rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    GeneratingImage,
    GeneratingVideo,
    GeneratingAudio,
    Completed,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::GeneratingImage => "generating_image",
            Phase::GeneratingVideo => "generating_video",
            Phase::GeneratingAudio => "generating_audio",
            Phase::Completed => "completed",
            Phase::Error => "error",
        }
    }

    /// Completed or error: only a reset leaves these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Error)
    }

    /// One of the generating phases.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Phase::GeneratingImage | Phase::GeneratingVideo | Phase::GeneratingAudio
        )
    }

    /// Whether a run may move from `self` to `next`.
    pub fn can_advance_to(&self, next: Phase) -> bool {
        match (self, next) {
            (Phase::Idle, Phase::GeneratingImage)
            | (Phase::GeneratingImage, Phase::GeneratingVideo)
            | (Phase::GeneratingVideo, Phase::GeneratingAudio)
            | (Phase::GeneratingAudio, Phase::Completed) => true,
            (from, Phase::Error) => !from.is_terminal(),
            _ => false,
        }
    }

    pub const ALL: [Phase; 6] = [
        Phase::Idle,
        Phase::GeneratingImage,
        Phase::GeneratingVideo,
        Phase::GeneratingAudio,
        Phase::Completed,
        Phase::Error,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected phase change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid phase transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: Phase,
    pub to: Phase,
}

/// Observable state of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub phase: Phase,
    pub image: Option<String>,
    pub video: Option<String>,
    pub audio: Option<String>,
    pub error: Option<String>,
}

impl PipelineState {
    /// Move to `next` if the transition table allows it.
    pub fn advance(&mut self, next: Phase) -> Result<(), TransitionError> {
        if !self.phase.can_advance_to(next) {
            return Err(TransitionError {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Move to the error phase with `message`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.advance(Phase::Error)?;
        self.error = Some(message.into());
        Ok(())
    }
}
