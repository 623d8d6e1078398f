use std::future::Future;

use chrono::Utc;

use super::game_api::{ActionError, ActionReport, ErrorClass, FightResult};
use super::goal::{Goal, Phase, select_goal};
use super::memory::Job;
use super::r#loop::CharacterWorker;
use super::strategy::{RawSource, best_gear_upgrade, check_plan_feasible, raw_source};
use super::tools::ActionKind;
use crate::craft::{CraftPlan, PlanStep, decompose};
use crate::player::{CharacterSnapshot, ItemStack, Skill, Slot};
use crate::world::ContentType;

/// Map code of the tasks master that hands out monster tasks.
pub const MONSTER_TASKS_MASTER: &str = "monsters";

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The iteration ended after a successful action of this kind.
    Acted(ActionKind),
    /// Nothing could be done; the idle backoff was slept.
    Idle,
    /// The craft target was dropped or given up; a new one is chosen next iteration.
    Replanned,
    /// A remote condition ended the step early.
    Abandoned(ErrorClass),
}

/// One plan step with everything it needs copied out of the plan.
#[derive(Debug, Clone, PartialEq)]
enum PlannedAction {
    CraftTarget { code: String, skill: Skill },
    Craft { code: String, skill: Skill, quantity: u32 },
    Obtain { code: String },
    Withdraw { stacks: Vec<ItemStack> },
}

/// Units of `code` still missing from the inventory when `wanted` are needed there.
fn short_in_inventory(character: &CharacterSnapshot, code: &str, wanted: u32) -> u32 {
    wanted.saturating_sub(character.inventory_count(code))
}

fn planned_action(plan: &CraftPlan, character: &CharacterSnapshot) -> Option<PlannedAction> {
    match plan.next_step(character)? {
        PlanStep::CraftTarget => {
            let stacks: Vec<ItemStack> = plan
                .top_level()
                .filter(|n| n.quantity_in_bank > 0)
                .filter_map(|n| {
                    let take = n.quantity_in_bank.min(short_in_inventory(
                        character,
                        &n.item_code,
                        n.quantity_needed,
                    ));
                    (take > 0).then(|| ItemStack::new(n.item_code.clone(), take))
                })
                .collect();
            if stacks.is_empty() {
                Some(PlannedAction::CraftTarget {
                    code: plan.target_code.clone(),
                    skill: plan.target_skill,
                })
            } else {
                Some(PlannedAction::Withdraw { stacks })
            }
        }
        PlanStep::Craft { node, quantity } => Some(PlannedAction::Craft {
            code: node.item_code.clone(),
            skill: node.skill?,
            quantity,
        }),
        PlanStep::Obtain { node } => Some(PlannedAction::Obtain {
            code: node.item_code.clone(),
        }),
        PlanStep::Withdraw { node } => {
            let stacks = node
                .children
                .iter()
                .map(|&c| &plan.nodes[c])
                .filter_map(|child| {
                    let wanted = child.per_craft.saturating_mul(node.missing());
                    let take = child
                        .quantity_in_bank
                        .min(short_in_inventory(character, &child.item_code, wanted));
                    (take > 0).then(|| ItemStack::new(child.item_code.clone(), take))
                })
                .collect();
            Some(PlannedAction::Withdraw { stacks })
        }
    }
}

/// One worker iteration: refresh, wait out any cooldown, pick a goal and run one step of it.
///
/// Remote conditions are settled here by class. Only transport failures and cancellation
/// escape, which ends the worker.
pub async fn tick(worker: &mut CharacterWorker<'_>) -> Result<TickOutcome, ActionError> {
    worker.current_action = None;
    match worker.iterate().await {
        Ok(outcome) => Ok(outcome),
        Err(err) => worker.settle(err),
    }
}

impl CharacterWorker<'_> {
    async fn iterate(&mut self) -> Result<TickOutcome, ActionError> {
        let fresh = self.client.character(&self.snapshot.name).await?;
        self.snapshot = fresh;

        let wait = self.snapshot.cooldown_remaining(Utc::now());
        if !wait.is_zero() {
            tracing::debug!(
                character = %self.snapshot.name,
                wait_ms = wait.as_millis() as u64,
                "worker.cooldown"
            );
            self.executor.pause(wait).await?;
        }

        let goal = select_goal(
            &self.snapshot,
            self.memory,
            self.catalog,
            &self.config.viability,
        )?;
        self.phase = goal.phase();
        match goal {
            Goal::DepositAll => self.deposit_all().await,
            Goal::AcceptTask => self.accept_task().await,
            Goal::CompleteTask => self.complete_task().await,
            Goal::FightTaskMonster { monster } => self.fight_task_monster(&monster).await,
            Goal::ImproveGear { monster } => self.improve_gear(&monster).await,
            Goal::UnsupportedTask { kind } => {
                tracing::warn!(
                    character = %self.snapshot.name,
                    ?kind,
                    "worker.task.unsupported"
                );
                self.idle().await
            }
        }
    }

    fn settle(&mut self, err: ActionError) -> Result<TickOutcome, ActionError> {
        let class = err.class();
        if matches!(class, ErrorClass::Transport | ErrorClass::Cancelled) {
            return Err(err);
        }

        let action = self.current_action.map_or("none", ActionKind::name);
        self.memory.last_error = Some(err.to_string());
        match class {
            ErrorClass::Conflict => {
                tracing::error!(
                    character = %self.snapshot.name,
                    action,
                    kind = class.name(),
                    error = %err,
                    "worker.step.conflict"
                );
            }
            ErrorClass::NotFound => {
                tracing::warn!(
                    character = %self.snapshot.name,
                    action,
                    kind = class.name(),
                    error = %err,
                    "worker.step.replan"
                );
                self.memory.clear_target();
            }
            _ => {
                tracing::warn!(
                    character = %self.snapshot.name,
                    action,
                    kind = class.name(),
                    error = %err,
                    "worker.step.abandoned"
                );
                if self.phase == Phase::GatheringOrCrafting
                    && matches!(
                        err,
                        ActionError::NotSkillLevelRequired
                            | ActionError::CharacterLevelInsufficient
                    )
                {
                    self.memory.block_target(err.to_string());
                }
            }
        }
        Ok(TickOutcome::Abandoned(class))
    }

    /// Issues one action through the executor, adopts the returned snapshot and sleeps the
    /// cooldown the action started.
    async fn act<T, F, Fut>(&mut self, action: ActionKind, call: F) -> Result<T, ActionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ActionReport<T>, ActionError>>,
    {
        self.current_action = Some(action);
        let report = self
            .executor
            .perform(&self.snapshot.name, action, call)
            .await?;
        self.snapshot = report.character;
        self.executor.pause(report.cooldown).await?;
        Ok(report.detail)
    }

    async fn travel(
        &mut self,
        content_type: ContentType,
        code: Option<&str>,
    ) -> Result<(), ActionError> {
        let target = self
            .catalog
            .nearest(content_type, code, self.snapshot.position)
            .map(|tile| tile.position)
            .ok_or_else(|| ActionError::NotFound {
                entity: "map",
                code: code.map_or_else(|| content_type.to_string(), str::to_string),
            })?;
        if self.snapshot.is_at(target) {
            return Ok(());
        }

        let (client, name) = (self.client, self.snapshot.name.clone());
        match self
            .act(ActionKind::Move, || client.move_to(&name, target.x, target.y))
            .await
        {
            Ok(()) | Err(ActionError::AlreadyAtDestination) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Walks to the monster tasks master, or to any tasks master when the map has none.
    async fn travel_to_tasks_master(&mut self) -> Result<(), ActionError> {
        let code = self
            .catalog
            .nearest(
                ContentType::TasksMaster,
                Some(MONSTER_TASKS_MASTER),
                self.snapshot.position,
            )
            .map(|_| MONSTER_TASKS_MASTER);
        self.travel(ContentType::TasksMaster, code).await
    }

    async fn idle(&mut self) -> Result<TickOutcome, ActionError> {
        self.phase = Phase::Idle;
        self.executor.pause(self.config.idle_backoff()).await?;
        Ok(TickOutcome::Idle)
    }

    async fn deposit_all(&mut self) -> Result<TickOutcome, ActionError> {
        self.travel(ContentType::Bank, None).await?;

        let stacks: Vec<ItemStack> = self
            .snapshot
            .inventory
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| ItemStack::new(s.code.clone(), s.quantity))
            .collect();
        let (client, name) = (self.client, self.snapshot.name.clone());
        for stack in &stacks {
            self.act(ActionKind::Deposit, || {
                client.deposit_item(&name, &stack.code, stack.quantity)
            })
            .await?;
            tracing::info!(
                character = %name,
                item = %stack.code,
                quantity = stack.quantity,
                "worker.bank.deposit"
            );
        }
        Ok(TickOutcome::Acted(ActionKind::Deposit))
    }

    async fn accept_task(&mut self) -> Result<TickOutcome, ActionError> {
        self.travel_to_tasks_master().await?;

        let (client, name) = (self.client, self.snapshot.name.clone());
        let task = self
            .act(ActionKind::AcceptTask, || client.accept_task(&name))
            .await?;
        tracing::info!(
            character = %name,
            task = %task.code,
            kind = ?task.kind,
            total = task.total,
            "worker.task.accepted"
        );
        // New monster, new record.
        self.memory.fight_history.clear();
        if self.memory.job == Some(Job::TaskFighter) {
            self.memory.job = None;
        }
        Ok(TickOutcome::Acted(ActionKind::AcceptTask))
    }

    async fn complete_task(&mut self) -> Result<TickOutcome, ActionError> {
        self.travel_to_tasks_master().await?;

        let (client, name) = (self.client, self.snapshot.name.clone());
        let reward = self
            .act(ActionKind::CompleteTask, || client.complete_task(&name))
            .await?;
        tracing::info!(
            character = %name,
            reward = %reward.code,
            quantity = reward.quantity,
            "worker.task.completed"
        );
        self.memory.fight_history.clear();
        if self.memory.job == Some(Job::TaskFighter) {
            self.memory.job = None;
        }
        Ok(TickOutcome::Acted(ActionKind::CompleteTask))
    }

    async fn fight_task_monster(&mut self, monster: &str) -> Result<TickOutcome, ActionError> {
        self.phase = Phase::Fighting;
        self.travel(ContentType::Monster, Some(monster)).await?;

        let (client, name) = (self.client, self.snapshot.name.clone());
        let fight = self.act(ActionKind::Fight, || client.fight(&name)).await?;
        self.memory
            .record_fight(fight.result, &self.config.viability);
        tracing::info!(
            character = %name,
            monster,
            result = ?fight.result,
            xp = fight.xp,
            win_ratio = self.memory.fight_history.win_ratio().unwrap_or(0.0),
            "worker.fight.result"
        );

        if self
            .memory
            .fight_history
            .is_acceptable(&self.config.viability)
        {
            self.memory.job = Some(Job::TaskFighter);
        } else {
            tracing::info!(character = %name, monster, "worker.job.unviable");
            self.memory.job = None;
        }
        Ok(TickOutcome::Acted(ActionKind::Fight))
    }

    async fn improve_gear(&mut self, monster: &str) -> Result<TickOutcome, ActionError> {
        if self.memory.craft_plan.is_none() && !self.choose_gear_target(monster)? {
            return self.without_gear_target(monster).await;
        }
        self.phase = Phase::GatheringOrCrafting;
        self.advance_plan().await
    }

    /// Picks the best feasible upgrade against `monster` and stores its plan. Returns false
    /// when nothing qualifies.
    fn choose_gear_target(&mut self, monster: &str) -> Result<bool, ActionError> {
        let catalog = self.catalog;
        let monster = catalog.monster(monster).ok_or_else(|| ActionError::NotFound {
            entity: "monster",
            code: monster.to_string(),
        })?;

        loop {
            let Some(choice) = best_gear_upgrade(
                &self.snapshot,
                catalog,
                monster,
                &self.memory.blocked_targets,
            ) else {
                return Ok(false);
            };
            let item = choice.evaluation.item;

            let plan = match decompose(item, catalog) {
                Ok(plan) => plan,
                Err(err) => {
                    tracing::warn!(
                        character = %self.snapshot.name,
                        item = %item.code,
                        error = %err,
                        "worker.gear.undecomposable"
                    );
                    self.memory.blocked_targets.insert(item.code.clone());
                    continue;
                }
            };
            if let Err(reason) = check_plan_feasible(&plan, &self.snapshot, catalog) {
                tracing::info!(
                    character = %self.snapshot.name,
                    item = %item.code,
                    reason = %reason,
                    "worker.gear.unreachable"
                );
                self.memory.blocked_targets.insert(item.code.clone());
                continue;
            }

            let shared = plan.shared_codes();
            if !shared.is_empty() {
                tracing::debug!(
                    character = %self.snapshot.name,
                    item = %item.code,
                    ?shared,
                    "craft.plan.shared_ingredients"
                );
            }
            tracing::info!(
                character = %self.snapshot.name,
                item = %item.code,
                slot = %choice.slot,
                damage = choice.evaluation.damage,
                current_damage = choice.current_damage,
                nodes = plan.nodes.len(),
                "worker.gear.target"
            );
            let job = Job::Crafting(plan.target_skill);
            self.memory.set_target(plan, job);
            return Ok(true);
        }
    }

    /// No upgrade is reachable: try the task monster while the record allows it, otherwise
    /// back off and start a fresh record.
    async fn without_gear_target(&mut self, monster: &str) -> Result<TickOutcome, ActionError> {
        if self
            .memory
            .fight_history
            .is_acceptable(&self.config.viability)
        {
            tracing::info!(character = %self.snapshot.name, monster, "worker.gear.none");
            return self.fight_task_monster(monster).await;
        }
        tracing::warn!(
            character = %self.snapshot.name,
            monster,
            "worker.gear.none_and_losing"
        );
        self.memory.fight_history.clear();
        self.idle().await
    }

    async fn advance_plan(&mut self) -> Result<TickOutcome, ActionError> {
        let bank = self.client.bank_items().await?;
        let Some(plan) = self.memory.craft_plan.as_mut() else {
            return Ok(TickOutcome::Replanned);
        };
        plan.reconcile(&self.snapshot, &bank);
        let action = planned_action(plan, &self.snapshot);

        let (client, name) = (self.client, self.snapshot.name.clone());
        match action {
            None => {
                self.memory.clear_target();
                Ok(TickOutcome::Replanned)
            }
            Some(PlannedAction::Withdraw { stacks }) if stacks.is_empty() => {
                // Components are spoken for by another branch; start over with fresh counts.
                self.memory.clear_target();
                Ok(TickOutcome::Replanned)
            }
            Some(PlannedAction::Withdraw { stacks }) => {
                self.travel(ContentType::Bank, None).await?;
                for stack in &stacks {
                    self.act(ActionKind::Withdraw, || {
                        client.withdraw_item(&name, &stack.code, stack.quantity)
                    })
                    .await?;
                    tracing::info!(
                        character = %name,
                        item = %stack.code,
                        quantity = stack.quantity,
                        "worker.bank.withdraw"
                    );
                }
                Ok(TickOutcome::Acted(ActionKind::Withdraw))
            }
            Some(PlannedAction::Craft {
                code,
                skill,
                quantity,
            }) => {
                self.memory.job = Some(Job::Crafting(skill));
                self.travel(ContentType::Workshop, Some(skill.name())).await?;
                self.act(ActionKind::Craft, || client.craft(&name, &code, quantity))
                    .await?;
                tracing::info!(character = %name, item = %code, quantity, "worker.craft");
                Ok(TickOutcome::Acted(ActionKind::Craft))
            }
            Some(PlannedAction::CraftTarget { code, skill }) => {
                self.memory.job = Some(Job::Crafting(skill));
                self.travel(ContentType::Workshop, Some(skill.name())).await?;
                self.act(ActionKind::Craft, || client.craft(&name, &code, 1))
                    .await?;
                tracing::info!(character = %name, item = %code, "worker.craft.target");
                self.equip_target(&code).await
            }
            Some(PlannedAction::Obtain { code }) => self.obtain(&code).await,
        }
    }

    async fn obtain(&mut self, code: &str) -> Result<TickOutcome, ActionError> {
        let catalog = self.catalog;
        let (client, name) = (self.client, self.snapshot.name.clone());
        match raw_source(code, &self.snapshot, catalog) {
            Some(RawSource::Resource(resource)) => {
                if let Some(skill) = catalog.resource(resource).map(|r| r.skill) {
                    self.memory.job = Some(Job::Gathering(skill));
                }
                self.travel(ContentType::Resource, Some(resource)).await?;
                let gathered = self.act(ActionKind::Gather, || client.gather(&name)).await?;
                tracing::info!(
                    character = %name,
                    resource,
                    wanted = code,
                    items = ?gathered.items,
                    "worker.gather"
                );
                Ok(TickOutcome::Acted(ActionKind::Gather))
            }
            Some(RawSource::Monster(monster)) => {
                self.travel(ContentType::Monster, Some(monster)).await?;
                let fight = self.act(ActionKind::Fight, || client.fight(&name)).await?;
                tracing::info!(
                    character = %name,
                    monster,
                    wanted = code,
                    result = ?fight.result,
                    drops = ?fight.drops,
                    "worker.hunt"
                );
                if fight.result == FightResult::Lose {
                    tracing::warn!(character = %name, monster, "worker.hunt.lost");
                }
                Ok(TickOutcome::Acted(ActionKind::Fight))
            }
            None => {
                tracing::warn!(character = %name, item = code, "worker.gear.no_source");
                self.memory.block_target(format!("no_source: {code}"));
                Ok(TickOutcome::Replanned)
            }
        }
    }

    /// Wears the freshly crafted target and resets the fight record so viability is measured
    /// with the new gear.
    async fn equip_target(&mut self, code: &str) -> Result<TickOutcome, ActionError> {
        let Some(slot) = self
            .catalog
            .item(code)
            .and_then(|item| Slot::for_item_type(&item.item_type))
        else {
            self.memory.clear_target();
            return Ok(TickOutcome::Acted(ActionKind::Craft));
        };

        let (client, name) = (self.client, self.snapshot.name.clone());
        if let Some(worn) = self.snapshot.equipped(slot).map(str::to_string) {
            self.act(ActionKind::Unequip, || client.unequip(&name, &worn, slot))
                .await?;
        }
        self.act(ActionKind::Equip, || client.equip(&name, code, slot))
            .await?;
        tracing::info!(character = %name, item = code, %slot, "worker.gear.equipped");

        self.memory.clear_target();
        self.memory.fight_history.clear();
        Ok(TickOutcome::Acted(ActionKind::Equip))
    }
}
