use std::fmt;

use super::game_api::ActionError;
use super::memory::{CharacterMemory, Job, ViabilityPolicy};
use crate::combat::{Combatant, estimate_fight};
use crate::player::{CharacterSnapshot, TaskKind};
use crate::world::WorldCatalog;

/// Where a worker is in its cycle. Informational: the next goal is always re-derived from the
/// latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingTask,
    Fighting,
    Banking,
    SelectingJob,
    GatheringOrCrafting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingTask => "awaiting_task",
            Phase::Fighting => "fighting",
            Phase::Banking => "banking",
            Phase::SelectingJob => "selecting_job",
            Phase::GatheringOrCrafting => "gathering_or_crafting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goal {
    /// Inventory is full: empty it into the bank.
    DepositAll,
    AcceptTask,
    FightTaskMonster { monster: String },
    CompleteTask,
    /// The task monster is currently too strong: work towards better gear.
    ImproveGear { monster: String },
    /// A task kind the worker does not handle.
    UnsupportedTask { kind: TaskKind },
}

impl Goal {
    pub fn phase(&self) -> Phase {
        match self {
            Goal::DepositAll => Phase::Banking,
            Goal::AcceptTask | Goal::CompleteTask => Phase::AwaitingTask,
            Goal::FightTaskMonster { .. } => Phase::Fighting,
            Goal::ImproveGear { .. } => Phase::SelectingJob,
            Goal::UnsupportedTask { .. } => Phase::Idle,
        }
    }
}

/// Whether fighting `monster_code` is worth it right now: the estimate must say winnable and
/// the recent record must not contradict it.
pub fn fight_is_viable(
    character: &CharacterSnapshot,
    memory: &CharacterMemory,
    catalog: &WorldCatalog,
    monster_code: &str,
    policy: &ViabilityPolicy,
) -> Result<bool, ActionError> {
    if !memory.fight_history.is_acceptable(policy) {
        return Ok(false);
    }
    if memory.job == Some(Job::TaskFighter) {
        return Ok(true);
    }
    let monster = catalog
        .monster(monster_code)
        .ok_or_else(|| ActionError::NotFound {
            entity: "monster",
            code: monster_code.to_string(),
        })?;
    let estimate = estimate_fight(&Combatant::from(character), &Combatant::from(monster));
    tracing::debug!(
        character = %character.name,
        monster = monster_code,
        turns_to_kill = estimate.turns_to_kill,
        turns_to_die = estimate.turns_to_die,
        "goal.fight_estimate"
    );
    Ok(estimate.winnable())
}

/// Picks the goal for this iteration from the freshest snapshot.
pub fn select_goal(
    character: &CharacterSnapshot,
    memory: &CharacterMemory,
    catalog: &WorldCatalog,
    policy: &ViabilityPolicy,
) -> Result<Goal, ActionError> {
    if character.is_inventory_full() {
        return Ok(Goal::DepositAll);
    }
    let Some(task) = character.task.as_ref().filter(|_| character.has_task()) else {
        return Ok(Goal::AcceptTask);
    };
    if character.task_complete() {
        return Ok(Goal::CompleteTask);
    }
    if task.kind != TaskKind::Monsters {
        return Ok(Goal::UnsupportedTask { kind: task.kind });
    }

    // An unfinished gear target keeps priority over fighting.
    if matches!(memory.job, Some(Job::Gathering(_) | Job::Crafting(_))) {
        return Ok(Goal::ImproveGear {
            monster: task.code.clone(),
        });
    }

    if fight_is_viable(character, memory, catalog, &task.code, policy)? {
        Ok(Goal::FightTaskMonster {
            monster: task.code.clone(),
        })
    } else {
        Ok(Goal::ImproveGear {
            monster: task.code.clone(),
        })
    }
}
