//! Observable holder of the pipeline state.
//!
//! Every run is tagged with a token. Starting a run or resetting bumps the
//! current token, and updates carrying an older token are dropped, so a run
//! that was reset or superseded can never write to the state again.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use super::state::{Phase, PipelineState, TransitionError};

/// Identifies one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunToken(u64);

impl RunToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Value published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Token of the run that owns `state` (0 before the first run).
    pub run_id: u64,
    pub state: PipelineState,
}

/// Why an update was not applied.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run {0} is no longer current")]
    StaleRun(u64),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Shared, observable pipeline state.
#[derive(Debug, Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<StoreSnapshot>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create a store in the idle state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StoreSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    pub fn snapshot(&self) -> PipelineState {
        self.tx.borrow().state.clone()
    }

    /// Token of the run that currently owns the state.
    pub fn current_run_id(&self) -> u64 {
        self.tx.borrow().run_id
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.current_run_id() == token.0
    }

    /// Receive every published state.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.tx.subscribe()
    }

    /// Start a new run: clear all fields, enter `generating_image` and
    /// invalidate every older token.
    pub fn begin_run(&self) -> (RunToken, PipelineState) {
        let mut begun = (RunToken(0), PipelineState::default());
        self.tx.send_modify(|snapshot| {
            snapshot.run_id += 1;
            snapshot.state = PipelineState {
                phase: Phase::GeneratingImage,
                ..Default::default()
            };
            begun = (RunToken(snapshot.run_id), snapshot.state.clone());
        });
        begun
    }

    /// Return to idle with all fields cleared, whatever the current phase.
    pub fn reset(&self) -> PipelineState {
        self.tx.send_modify(|snapshot| {
            snapshot.run_id += 1;
            snapshot.state = PipelineState::default();
        });
        self.snapshot()
    }

    /// Apply `change` on behalf of run `token`.
    ///
    /// Nothing is published when the token is stale or `change` fails.
    pub fn update<F>(&self, token: RunToken, change: F) -> Result<PipelineState, StoreError>
    where
        F: FnOnce(&mut PipelineState) -> Result<(), TransitionError>,
    {
        let mut outcome = Err(StoreError::StaleRun(token.0));
        self.tx.send_if_modified(|snapshot| {
            if snapshot.run_id != token.0 {
                return false;
            }
            let mut next = snapshot.state.clone();
            match change(&mut next) {
                Ok(()) => {
                    snapshot.state = next.clone();
                    outcome = Ok(next);
                    true
                }
                Err(e) => {
                    outcome = Err(e.into());
                    false
                }
            }
        });
        outcome
    }

    /// Wait until run `token` reaches a terminal phase or stops being current,
    /// and return the state at that moment.
    pub async fn wait_for_run(&self, token: RunToken) -> PipelineState {
        self.wait_for_run_id(token.0).await
    }

    /// Same as [`StateStore::wait_for_run`], by run id.
    pub async fn wait_for_run_id(&self, run_id: u64) -> PipelineState {
        let mut rx = self.subscribe();
        let finished = rx
            .wait_for(|snapshot| snapshot.run_id != run_id || snapshot.state.phase.is_terminal())
            .await
            .map(|snapshot| snapshot.state.clone());
        match finished {
            Ok(state) => state,
            Err(_) => self.snapshot(),
        }
    }
}
