use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::game_api::FightResult;
use crate::craft::CraftPlan;
use crate::player::Skill;

/// The worker's own label for what a character is busy with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    TaskFighter,
    Gathering(Skill),
    Crafting(Skill),
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::TaskFighter => f.write_str("task_fighter"),
            Job::Gathering(skill) | Job::Crafting(skill) => write!(f, "{skill}"),
        }
    }
}

/// When a run of recent fights still justifies fighting the task monster.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViabilityPolicy {
    /// Fights remembered per character.
    pub history_window: usize,
    /// Below this many recorded fights the ratio is not consulted.
    pub min_samples: usize,
    pub min_win_ratio: f64,
}

impl Default for ViabilityPolicy {
    fn default() -> Self {
        Self {
            history_window: 10,
            min_samples: 3,
            min_win_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FightHistory {
    results: VecDeque<FightResult>,
}

impl FightHistory {
    pub fn record(&mut self, result: FightResult, limit: usize) {
        self.results.push_back(result);
        while self.results.len() > limit {
            self.results.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn wins(&self) -> usize {
        self.results
            .iter()
            .filter(|r| **r == FightResult::Win)
            .count()
    }

    pub fn win_ratio(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        Some(self.wins() as f64 / self.results.len() as f64)
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn is_acceptable(&self, policy: &ViabilityPolicy) -> bool {
        if self.results.len() < policy.min_samples {
            return true;
        }
        self.win_ratio()
            .is_none_or(|ratio| ratio >= policy.min_win_ratio)
    }
}

/// Planning state for one character. Lives as long as the process; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct CharacterMemory {
    pub job: Option<Job>,
    pub target_item: Option<String>,
    pub craft_plan: Option<CraftPlan>,
    pub fight_history: FightHistory,
    /// Targets found impossible to finish (missing skill, no source). Skipped by gear selection.
    pub blocked_targets: BTreeSet<String>,
    pub last_error: Option<String>,
}

impl CharacterMemory {
    pub fn has_job(&self) -> bool {
        self.job.is_some()
    }

    /// Replaces (never merges) the current target and its plan.
    pub fn set_target(&mut self, plan: CraftPlan, job: Job) {
        self.target_item = Some(plan.target_code.clone());
        self.craft_plan = Some(plan);
        self.job = Some(job);
    }

    pub fn clear_target(&mut self) {
        self.target_item = None;
        self.craft_plan = None;
        self.job = None;
    }

    /// Gives up the current target for good.
    pub fn block_target(&mut self, reason: impl Into<String>) {
        if let Some(code) = self.target_item.take() {
            self.blocked_targets.insert(code);
        }
        self.craft_plan = None;
        self.job = None;
        self.last_error = Some(reason.into());
    }

    pub fn record_fight(&mut self, result: FightResult, policy: &ViabilityPolicy) {
        self.fight_history.record(result, policy.history_window);
    }
}
