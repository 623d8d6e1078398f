use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::combat::ElementStats;
use crate::player::equipment::Slot;
use crate::player::inventory::Inventory;
use crate::player::skills::Skill;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Monsters,
    Items,
    #[serde(other)]
    Other,
}

/// Server-assigned objective with a progress counter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskState {
    pub code: String,
    pub kind: TaskKind,
    pub progress: u32,
    pub total: u32,
}

/// Server-truth view of one character. Replaced wholesale after every action; the core never
/// edits it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CharacterSnapshot {
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub gold: u64,
    pub position: Position,
    #[serde(default)]
    pub skills: BTreeMap<Skill, u32>,
    #[serde(default)]
    pub attack: ElementStats,
    #[serde(default)]
    pub damage_bonus: ElementStats,
    #[serde(default)]
    pub resistance: ElementStats,
    #[serde(default)]
    pub equipment: BTreeMap<Slot, String>,
    #[serde(default)]
    pub inventory: Inventory,
    pub inventory_max_items: u32,
    #[serde(default)]
    pub cooldown_expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub task: Option<TaskState>,
}

impl CharacterSnapshot {
    pub fn inventory_count(&self, code: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|s| s.code == code)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn inventory_used(&self) -> u32 {
        self.inventory.iter().map(|s| s.quantity).sum()
    }

    pub fn is_inventory_full(&self) -> bool {
        self.inventory_used() >= self.inventory_max_items
    }

    /// Time left before the server accepts another action from this character.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.cooldown_expiration
            .and_then(|expires| (expires - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    pub fn skill_level(&self, skill: Skill) -> u32 {
        self.skills.get(&skill).copied().unwrap_or(1)
    }

    pub fn equipped(&self, slot: Slot) -> Option<&str> {
        self.equipment
            .get(&slot)
            .map(String::as_str)
            .filter(|code| !code.is_empty())
    }

    pub fn is_equipped(&self, code: &str) -> bool {
        Slot::ALL.into_iter().any(|s| self.equipped(s) == Some(code))
    }

    pub fn has_task(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.code.is_empty())
    }

    pub fn task_in_progress(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| !t.code.is_empty() && t.progress < t.total)
    }

    pub fn task_complete(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| !t.code.is_empty() && t.progress >= t.total)
    }

    pub fn is_at(&self, position: Position) -> bool {
        self.position == position
    }
}
