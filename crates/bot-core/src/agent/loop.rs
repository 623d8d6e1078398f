use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::executor::{Executor, RetryPolicy};
use super::game_api::{ActionError, GameClient};
use super::goal::Phase;
use super::harness::tick;
use super::memory::{CharacterMemory, ViabilityPolicy};
use super::tools::ActionKind;
use crate::player::CharacterSnapshot;
use crate::world::WorldCatalog;

/// `[worker]` table of the runner config. Every field has a default.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub retry: RetryPolicy,
    pub viability: ViabilityPolicy,
    /// Wait used when an iteration finds nothing it can do.
    pub idle_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            viability: ViabilityPolicy::default(),
            idle_backoff_ms: 5_000,
        }
    }
}

impl WorkerConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Why a worker loop returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Cancelled,
}

/// Drives one character. Holds its memory by exclusive borrow from the orchestrator, and the
/// catalog by shared borrow.
pub struct CharacterWorker<'w> {
    pub(crate) client: &'w dyn GameClient,
    pub(crate) catalog: &'w WorldCatalog,
    pub(crate) config: WorkerConfig,
    pub(crate) executor: Executor,
    pub memory: &'w mut CharacterMemory,
    /// Latest server view; replaced after every action.
    pub snapshot: CharacterSnapshot,
    pub phase: Phase,
    /// Last action issued this iteration, for failure reports.
    pub(crate) current_action: Option<ActionKind>,
}

impl<'w> CharacterWorker<'w> {
    pub fn new(
        snapshot: CharacterSnapshot,
        memory: &'w mut CharacterMemory,
        client: &'w dyn GameClient,
        catalog: &'w WorldCatalog,
        config: WorkerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            catalog,
            config,
            executor: Executor::new(config.retry, cancel),
            memory,
            snapshot,
            phase: Phase::Idle,
            current_action: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    /// Iterates until cancelled. Only transport failures end the loop with an error; everything
    /// else is settled inside the iteration.
    pub async fn run(mut self) -> Result<WorkerExit, ActionError> {
        tracing::info!(character = %self.snapshot.name, "worker.start");
        loop {
            if self.executor.is_cancelled() {
                tracing::info!(character = %self.snapshot.name, "worker.cancelled");
                return Ok(WorkerExit::Cancelled);
            }
            match tick(&mut self).await {
                Ok(outcome) => {
                    tracing::debug!(
                        character = %self.snapshot.name,
                        phase = %self.phase,
                        ?outcome,
                        "worker.tick"
                    );
                }
                Err(ActionError::Cancelled) => {
                    tracing::info!(character = %self.snapshot.name, "worker.cancelled");
                    return Ok(WorkerExit::Cancelled);
                }
                Err(err) => {
                    tracing::error!(
                        character = %self.snapshot.name,
                        phase = %self.phase,
                        kind = err.class().name(),
                        error = %err,
                        "worker.stopped"
                    );
                    return Err(err);
                }
            }
        }
    }
}
