//! Character automation: the remote action boundary, the retry discipline around it, per
//! character memory, goal selection and the worker loop.
//!
//! Workers never talk to each other. The only shared state is the read-only
//! [`WorldCatalog`](crate::world::WorldCatalog); the bank is contended for on the server side
//! and contention surfaces as [`ActionError::TransactionInProgress`].

pub mod executor;
pub mod game_api;
pub mod goal;
pub mod harness;
pub mod r#loop;
pub mod memory;
pub mod orchestrator;
pub mod strategy;
pub mod tools;

pub use executor::{Executor, RetryPolicy};
pub use game_api::{
    ActionError, ActionReport, ApiFuture, ErrorClass, FightDetail, FightResult, GameClient,
    SkillDetail, TaskReward,
};
pub use goal::{Goal, Phase};
pub use harness::{TickOutcome, tick};
pub use memory::{CharacterMemory, FightHistory, Job, ViabilityPolicy};
pub use orchestrator::{Orchestrator, WorkerReport};
pub use r#loop::{CharacterWorker, WorkerConfig, WorkerExit};
pub use tools::ActionKind;
