use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use super::game_api::{ActionError, GameClient};
use super::memory::CharacterMemory;
use super::r#loop::{CharacterWorker, WorkerConfig, WorkerExit};
use crate::world::WorldCatalog;

/// Per-character result of a run.
pub type WorkerReport = BTreeMap<String, Result<WorkerExit, ActionError>>;

/// Runs one worker per account character until each stops or the token is cancelled.
///
/// Memories live here, keyed by character name, and are lent to workers for the duration of a
/// run. They survive across runs of the same orchestrator.
pub struct Orchestrator<'c> {
    client: &'c dyn GameClient,
    catalog: &'c WorldCatalog,
    config: WorkerConfig,
    cancel: CancellationToken,
    memories: BTreeMap<String, CharacterMemory>,
}

impl<'c> Orchestrator<'c> {
    pub fn new(
        client: &'c dyn GameClient,
        catalog: &'c WorldCatalog,
        config: WorkerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            catalog,
            config,
            cancel,
            memories: BTreeMap::new(),
        }
    }

    pub fn memory(&self, character: &str) -> Option<&CharacterMemory> {
        self.memories.get(character)
    }

    pub fn characters(&self) -> impl Iterator<Item = &str> {
        self.memories.keys().map(String::as_str)
    }

    /// Lists the account's characters and drives a worker for each until all of them exit.
    ///
    /// Workers borrow the client, catalog and their own memory, so they are polled together on
    /// the caller's task rather than spawned. Every worker spends its time awaiting HTTP calls
    /// or cooldown sleeps, and one worker's wait never holds up another. Workers share no
    /// mutable state.
    pub async fn run(&mut self) -> anyhow::Result<WorkerReport> {
        let snapshots = self
            .client
            .characters()
            .await
            .context("list account characters")?;
        anyhow::ensure!(!snapshots.is_empty(), "account has no characters");

        for snapshot in &snapshots {
            self.memories.entry(snapshot.name.clone()).or_default();
        }
        let mut by_name: HashMap<String, _> = snapshots
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        let (client, catalog, config) = (self.client, self.catalog, self.config);
        let workers: Vec<CharacterWorker<'_>> = self
            .memories
            .iter_mut()
            .filter_map(|(name, memory)| {
                let snapshot = by_name.remove(name)?;
                Some(CharacterWorker::new(
                    snapshot,
                    memory,
                    client,
                    catalog,
                    config,
                    self.cancel.child_token(),
                ))
            })
            .collect();
        tracing::info!(workers = workers.len(), "orchestrator.start");

        let names: Vec<String> = workers.iter().map(|w| w.name().to_string()).collect();
        let results = join_all(workers.into_iter().map(CharacterWorker::run)).await;

        let report: WorkerReport = names.into_iter().zip(results).collect();
        for (name, result) in &report {
            match result {
                Ok(exit) => tracing::info!(character = %name, ?exit, "orchestrator.worker_done"),
                Err(err) => tracing::error!(
                    character = %name,
                    kind = err.class().name(),
                    error = %err,
                    "orchestrator.worker_failed"
                ),
            }
        }
        Ok(report)
    }
}
