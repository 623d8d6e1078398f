use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::{CharacterSnapshot, ItemStack, Slot, TaskState};

/// Typed conditions the remote API reports for a character action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("character in cooldown for {remaining:?}")]
    InCooldown { remaining: Duration },
    #[error("a transaction is already in progress on this item")]
    TransactionInProgress,
    #[error("an action is already in progress for this character")]
    ActionInProgress,
    #[error("character already at destination")]
    AlreadyAtDestination,
    #[error("missing item or insufficient quantity")]
    MissingItem,
    #[error("insufficient gold")]
    InsufficientGold,
    #[error("inventory is full")]
    InventoryFull,
    #[error("character level insufficient")]
    CharacterLevelInsufficient,
    #[error("skill level insufficient")]
    NotSkillLevelRequired,
    #[error("character already has a task")]
    AlreadyHasTask,
    #[error("{entity} not found: {code}")]
    NotFound { entity: &'static str, code: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("cancelled")]
    Cancelled,
}

/// How the worker reacts to an [`ActionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Wait and reissue the identical call.
    Transient,
    /// Two actions raced for one character: a logic fault, fatal for the iteration.
    Conflict,
    /// Abandon the step; goals are re-evaluated next iteration.
    Precondition,
    /// Catalog and server disagree; forces a replan.
    NotFound,
    /// Ends this character's worker.
    Transport,
    Cancelled,
}

impl ErrorClass {
    pub fn name(self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Conflict => "conflict",
            ErrorClass::Precondition => "precondition",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Transport => "transport",
            ErrorClass::Cancelled => "cancelled",
        }
    }
}

impl ActionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ActionError::InCooldown { .. } | ActionError::TransactionInProgress => {
                ErrorClass::Transient
            }
            ActionError::ActionInProgress => ErrorClass::Conflict,
            ActionError::AlreadyAtDestination
            | ActionError::MissingItem
            | ActionError::InsufficientGold
            | ActionError::InventoryFull
            | ActionError::CharacterLevelInsufficient
            | ActionError::NotSkillLevelRequired
            | ActionError::AlreadyHasTask => ErrorClass::Precondition,
            ActionError::NotFound { .. } => ErrorClass::NotFound,
            ActionError::Transport(_) => ErrorClass::Transport,
            ActionError::Cancelled => ErrorClass::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FightResult {
    Win,
    Lose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FightDetail {
    pub result: FightResult,
    pub xp: u32,
    pub drops: Vec<ItemStack>,
}

/// Outcome of gathering or crafting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkillDetail {
    pub xp: u32,
    pub items: Vec<ItemStack>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskReward {
    pub code: String,
    pub quantity: u32,
}

/// Every successful action returns the cooldown it started plus the refreshed character,
/// which replaces the caller's copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport<T> {
    pub cooldown: Duration,
    pub character: CharacterSnapshot,
    pub detail: T,
}

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ActionError>> + Send + 'a>>;

/// Boundary to the remote game. Every action is cooldown-gated on the server side.
pub trait GameClient: Send + Sync {
    /// Every character on the account.
    fn characters<'a>(&'a self) -> ApiFuture<'a, Vec<CharacterSnapshot>>;

    fn character<'a>(&'a self, name: &'a str) -> ApiFuture<'a, CharacterSnapshot>;

    fn bank_items<'a>(&'a self) -> ApiFuture<'a, Vec<ItemStack>>;

    fn move_to<'a>(&'a self, name: &'a str, x: i32, y: i32) -> ApiFuture<'a, ActionReport<()>>;

    fn fight<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<FightDetail>>;

    fn gather<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<SkillDetail>>;

    fn craft<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<SkillDetail>>;

    fn deposit_item<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<()>>;

    fn withdraw_item<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<()>>;

    fn accept_task<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<TaskState>>;

    fn complete_task<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<TaskReward>>;

    fn equip<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        slot: Slot,
    ) -> ApiFuture<'a, ActionReport<()>>;

    fn unequip<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        slot: Slot,
    ) -> ApiFuture<'a, ActionReport<()>>;
}
