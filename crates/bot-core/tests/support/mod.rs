//! An in-memory ArtifactsMMO server for driving workers end to end.
//!
//! Characters, bank and tasks live behind one mutex. Actions check the tile the character
//! stands on the way the real server does, so a worker that skips a move fails loudly.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use artifacts_bot_core::agent::{
    ActionError, ActionReport, ApiFuture, FightDetail, FightResult, GameClient, SkillDetail,
    TaskReward,
};
use artifacts_bot_core::combat::ElementStats;
use artifacts_bot_core::player::{
    CharacterSnapshot, InventorySlot, ItemStack, Position, Skill, Slot, TaskKind, TaskState,
};
use artifacts_bot_core::world::{
    ContentType, Drop, Effect, Item, MapContent, MapTile, Monster, Recipe, Resource, WorldCatalog,
};

/// One accepted call, as `(character, description)`.
pub type Call = (String, String);

#[derive(Debug, Default)]
pub struct SimState {
    pub characters: BTreeMap<String, CharacterSnapshot>,
    pub bank: BTreeMap<String, u32>,
    /// Every call that reached the server, including rejected ones.
    pub calls: Vec<Call>,
    /// Failures injected ahead of the next call of the named action.
    pub faults: VecDeque<(&'static str, ActionError)>,
    pub fight_results: VecDeque<FightResult>,
    /// Monster handed out by the tasks master.
    pub task_monster: String,
    pub task_total: u32,
    pub action_cooldown: Duration,
}

pub struct SimGame {
    catalog: WorldCatalog,
    state: Mutex<SimState>,
}

impl SimGame {
    pub fn new(catalog: WorldCatalog) -> Self {
        Self {
            catalog,
            state: Mutex::new(SimState {
                task_monster: "chicken".to_string(),
                task_total: 5,
                ..SimState::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state poisoned")
    }

    pub fn add_character(&self, character: CharacterSnapshot) {
        self.state()
            .characters
            .insert(character.name.clone(), character);
    }

    pub fn character_state(&self, name: &str) -> CharacterSnapshot {
        self.state().characters[name].clone()
    }

    pub fn fail_next(&self, action: &'static str, err: ActionError) {
        self.state().faults.push_back((action, err));
    }

    /// Descriptions of the calls one character made, in order.
    pub fn calls_of(&self, name: &str) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|(who, _)| who == name)
            .map(|(_, what)| what.clone())
            .collect()
    }

    fn content_at(&self, position: Position) -> Option<&MapContent> {
        self.catalog
            .maps()
            .iter()
            .find(|t| t.position == position)
            .and_then(|t| t.content.as_ref())
    }

    /// Logs the call, pops a matching injected fault, then applies `apply` to the character.
    fn run<T>(
        &self,
        name: &str,
        action: &'static str,
        description: String,
        apply: impl FnOnce(&SimGame, &mut SimState, &mut CharacterSnapshot) -> Result<T, ActionError>,
    ) -> Result<ActionReport<T>, ActionError> {
        let mut state = self.state();
        state.calls.push((name.to_string(), description));
        if state.faults.front().is_some_and(|(a, _)| *a == action)
            && let Some((_, err)) = state.faults.pop_front()
        {
            return Err(err);
        }
        let mut character = state
            .characters
            .get(name)
            .cloned()
            .ok_or_else(|| ActionError::NotFound {
                entity: "character",
                code: name.to_string(),
            })?;
        let detail = apply(self, &mut *state, &mut character)?;
        state
            .characters
            .insert(name.to_string(), character.clone());
        Ok(ActionReport {
            cooldown: state.action_cooldown,
            character,
            detail,
        })
    }

    fn require_tile(
        &self,
        character: &CharacterSnapshot,
        content_type: ContentType,
    ) -> Result<&MapContent, ActionError> {
        self.content_at(character.position)
            .filter(|c| c.content_type == content_type)
            .ok_or_else(|| ActionError::NotFound {
                entity: "map content",
                code: content_type.to_string(),
            })
    }
}

pub fn add_to_inventory(character: &mut CharacterSnapshot, code: &str, quantity: u32) {
    if let Some(slot) = character.inventory.iter_mut().find(|s| s.code == code) {
        slot.quantity += quantity;
    } else if let Some(slot) = character.inventory.iter_mut().find(|s| s.is_empty()) {
        slot.code = code.to_string();
        slot.quantity = quantity;
    } else {
        let slot = character.inventory.len() as u32 + 1;
        character.inventory.push(InventorySlot {
            slot,
            code: code.to_string(),
            quantity,
        });
    }
}

pub fn take_from_inventory(
    character: &mut CharacterSnapshot,
    code: &str,
    quantity: u32,
) -> Result<(), ActionError> {
    if character.inventory_count(code) < quantity {
        return Err(ActionError::MissingItem);
    }
    let mut left = quantity;
    for slot in character.inventory.iter_mut().filter(|s| s.code == code) {
        let take = slot.quantity.min(left);
        slot.quantity -= take;
        left -= take;
        if slot.quantity == 0 {
            slot.code.clear();
        }
    }
    Ok(())
}

fn drops_of(drops: &[Drop]) -> Vec<ItemStack> {
    drops
        .iter()
        .map(|d| ItemStack::new(d.code.clone(), d.min_quantity.max(1)))
        .collect()
}

impl GameClient for SimGame {
    fn characters<'a>(&'a self) -> ApiFuture<'a, Vec<CharacterSnapshot>> {
        Box::pin(async move { Ok(self.state().characters.values().cloned().collect()) })
    }

    fn character<'a>(&'a self, name: &'a str) -> ApiFuture<'a, CharacterSnapshot> {
        Box::pin(async move {
            self.state()
                .characters
                .get(name)
                .cloned()
                .ok_or_else(|| ActionError::NotFound {
                    entity: "character",
                    code: name.to_string(),
                })
        })
    }

    fn bank_items<'a>(&'a self) -> ApiFuture<'a, Vec<ItemStack>> {
        Box::pin(async move {
            Ok(self
                .state()
                .bank
                .iter()
                .filter(|(_, q)| **q > 0)
                .map(|(code, q)| ItemStack::new(code.clone(), *q))
                .collect())
        })
    }

    fn move_to<'a>(&'a self, name: &'a str, x: i32, y: i32) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.run(name, "move", format!("move {x},{y}"), |_, _, c| {
                let to = Position::new(x, y);
                if c.position == to {
                    return Err(ActionError::AlreadyAtDestination);
                }
                c.position = to;
                Ok(())
            })
        })
    }

    fn fight<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<FightDetail>> {
        Box::pin(async move {
            let monster = self
                .content_at(self.character_state(name).position)
                .map(|c| c.code.clone())
                .unwrap_or_default();
            self.run(name, "fight", format!("fight {monster}"), |sim, state, c| {
                let content = sim.require_tile(c, ContentType::Monster)?;
                let monster = sim
                    .catalog
                    .monster(&content.code)
                    .ok_or_else(|| ActionError::NotFound {
                        entity: "monster",
                        code: content.code.clone(),
                    })?;
                let result = state.fight_results.pop_front().unwrap_or(FightResult::Win);
                let mut drops = Vec::new();
                if result == FightResult::Win {
                    drops = drops_of(&monster.drops);
                    for d in &drops {
                        add_to_inventory(c, &d.code, d.quantity);
                    }
                    if let Some(task) = c.task.as_mut()
                        && task.kind == TaskKind::Monsters
                        && task.code == monster.code
                    {
                        task.progress = (task.progress + 1).min(task.total);
                    }
                }
                Ok(FightDetail {
                    result,
                    xp: 10,
                    drops,
                })
            })
        })
    }

    fn gather<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<SkillDetail>> {
        Box::pin(async move {
            let resource = self
                .content_at(self.character_state(name).position)
                .map(|c| c.code.clone())
                .unwrap_or_default();
            self.run(name, "gather", format!("gather {resource}"), |sim, _, c| {
                let content = sim.require_tile(c, ContentType::Resource)?;
                let resource =
                    sim.catalog
                        .resource(&content.code)
                        .ok_or_else(|| ActionError::NotFound {
                            entity: "resource",
                            code: content.code.clone(),
                        })?;
                if c.skill_level(resource.skill) < resource.level {
                    return Err(ActionError::NotSkillLevelRequired);
                }
                let items = drops_of(&resource.drops);
                for d in &items {
                    add_to_inventory(c, &d.code, d.quantity);
                }
                Ok(SkillDetail { xp: 5, items })
            })
        })
    }

    fn craft<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<SkillDetail>> {
        Box::pin(async move {
            self.run(name, "craft", format!("craft {code} x{quantity}"), |sim, _, c| {
                let recipe = sim
                    .catalog
                    .item(code)
                    .and_then(|i| i.craft.as_ref())
                    .ok_or_else(|| ActionError::NotFound {
                        entity: "item",
                        code: code.to_string(),
                    })?;
                let workshop = sim.require_tile(c, ContentType::Workshop)?;
                if workshop.code != recipe.skill.name() {
                    return Err(ActionError::NotFound {
                        entity: "workshop",
                        code: recipe.skill.name().to_string(),
                    });
                }
                if c.skill_level(recipe.skill) < recipe.level {
                    return Err(ActionError::NotSkillLevelRequired);
                }
                if recipe
                    .components
                    .iter()
                    .any(|s| c.inventory_count(&s.code) < s.quantity * quantity)
                {
                    return Err(ActionError::MissingItem);
                }
                for s in &recipe.components {
                    take_from_inventory(c, &s.code, s.quantity * quantity)?;
                }
                add_to_inventory(c, code, quantity);
                Ok(SkillDetail {
                    xp: 5,
                    items: vec![ItemStack::new(code, quantity)],
                })
            })
        })
    }

    fn deposit_item<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.run(
                name,
                "deposit",
                format!("deposit {code} x{quantity}"),
                |sim, state, c| {
                    sim.require_tile(c, ContentType::Bank)?;
                    take_from_inventory(c, code, quantity)?;
                    *state.bank.entry(code.to_string()).or_default() += quantity;
                    Ok(())
                },
            )
        })
    }

    fn withdraw_item<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        quantity: u32,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.run(
                name,
                "withdraw",
                format!("withdraw {code} x{quantity}"),
                |sim, state, c| {
                    sim.require_tile(c, ContentType::Bank)?;
                    let banked = state.bank.entry(code.to_string()).or_default();
                    if *banked < quantity {
                        return Err(ActionError::MissingItem);
                    }
                    *banked -= quantity;
                    add_to_inventory(c, code, quantity);
                    Ok(())
                },
            )
        })
    }

    fn accept_task<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<TaskState>> {
        Box::pin(async move {
            self.run(name, "accept_task", "accept_task".to_string(), |sim, state, c| {
                sim.require_tile(c, ContentType::TasksMaster)?;
                if c.has_task() {
                    return Err(ActionError::AlreadyHasTask);
                }
                let task = TaskState {
                    code: state.task_monster.clone(),
                    kind: TaskKind::Monsters,
                    progress: 0,
                    total: state.task_total,
                };
                c.task = Some(task.clone());
                Ok(task)
            })
        })
    }

    fn complete_task<'a>(&'a self, name: &'a str) -> ApiFuture<'a, ActionReport<TaskReward>> {
        Box::pin(async move {
            self.run(
                name,
                "complete_task",
                "complete_task".to_string(),
                |sim, _, c| {
                    sim.require_tile(c, ContentType::TasksMaster)?;
                    if !c.task_complete() {
                        return Err(ActionError::Transport(
                            "task completed before its total".to_string(),
                        ));
                    }
                    c.task = None;
                    add_to_inventory(c, "tasks_coin", 1);
                    Ok(TaskReward {
                        code: "tasks_coin".to_string(),
                        quantity: 1,
                    })
                },
            )
        })
    }

    fn equip<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        slot: Slot,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.run(name, "equip", format!("equip {code} {slot}"), |_, _, c| {
                if c.equipped(slot).is_some() {
                    return Err(ActionError::MissingItem);
                }
                take_from_inventory(c, code, 1)?;
                c.equipment.insert(slot, code.to_string());
                Ok(())
            })
        })
    }

    fn unequip<'a>(
        &'a self,
        name: &'a str,
        code: &'a str,
        slot: Slot,
    ) -> ApiFuture<'a, ActionReport<()>> {
        Box::pin(async move {
            self.run(name, "unequip", format!("unequip {code} {slot}"), |_, _, c| {
                if c.equipment.remove(&slot).is_none() {
                    return Err(ActionError::MissingItem);
                }
                add_to_inventory(c, code, 1);
                Ok(())
            })
        })
    }
}

pub fn character(name: &str, at: Position) -> CharacterSnapshot {
    CharacterSnapshot {
        name: name.to_string(),
        level: 5,
        hp: 120,
        gold: 0,
        position: at,
        skills: Skill::ALL.into_iter().map(|s| (s, 1)).collect(),
        attack: ElementStats {
            earth: 10.0,
            ..ElementStats::default()
        },
        damage_bonus: ElementStats::default(),
        resistance: ElementStats::default(),
        equipment: BTreeMap::new(),
        inventory: Vec::new(),
        inventory_max_items: 100,
        cooldown_expiration: None,
        task: None,
    }
}

pub fn monster_task(code: &str, progress: u32, total: u32) -> TaskState {
    TaskState {
        code: code.to_string(),
        kind: TaskKind::Monsters,
        progress,
        total,
    }
}

fn tile(x: i32, y: i32, content_type: ContentType, code: &str) -> MapTile {
    MapTile {
        position: Position::new(x, y),
        content: Some(MapContent {
            content_type,
            code: code.to_string(),
        }),
    }
}

fn drop(code: &str) -> Drop {
    Drop {
        code: code.to_string(),
        rate: 1,
        min_quantity: 1,
        max_quantity: 1,
    }
}

fn raw(code: &str) -> Item {
    Item {
        code: code.to_string(),
        level: 1,
        item_type: "resource".to_string(),
        subtype: String::new(),
        effects: vec![],
        craft: None,
    }
}

fn crafted(code: &str, item_type: &str, skill: Skill, components: &[(&str, u32)]) -> Item {
    Item {
        code: code.to_string(),
        level: 1,
        item_type: item_type.to_string(),
        subtype: String::new(),
        effects: vec![],
        craft: Some(Recipe {
            skill,
            level: 1,
            components: components
                .iter()
                .map(|(c, q)| ItemStack::new(*c, *q))
                .collect(),
        }),
    }
}

pub const BANK: Position = Position { x: 4, y: 1 };
pub const TASKS_MASTER: Position = Position { x: 1, y: 2 };
pub const CHICKENS: Position = Position { x: 0, y: 1 };

/// A small map: bank, tasks master, a weak and a hopeless monster, two resources and three
/// workshops. `ash_mace` needs 2 `ash_plank` (3 `ash_wood` each) and 1 `copper_bar`
/// (2 `copper_ore`).
pub fn world() -> WorldCatalog {
    let maps = vec![
        tile(BANK.x, BANK.y, ContentType::Bank, "bank"),
        tile(TASKS_MASTER.x, TASKS_MASTER.y, ContentType::TasksMaster, "monsters"),
        tile(CHICKENS.x, CHICKENS.y, ContentType::Monster, "chicken"),
        tile(8, 8, ContentType::Monster, "ogre"),
        tile(-1, 0, ContentType::Resource, "ash_tree"),
        tile(2, 0, ContentType::Resource, "copper_rocks"),
        tile(-2, 3, ContentType::Workshop, "woodcutting"),
        tile(1, 5, ContentType::Workshop, "mining"),
        tile(2, 1, ContentType::Workshop, "weaponcrafting"),
        MapTile {
            position: Position::new(0, 0),
            content: None,
        },
    ];

    let mut mace = crafted(
        "ash_mace",
        "weapon",
        Skill::Weaponcrafting,
        &[("ash_plank", 2), ("copper_bar", 1)],
    );
    mace.effects = vec![Effect {
        name: "attack_earth".to_string(),
        value: 12.0,
    }];
    let items = vec![
        raw("ash_wood"),
        raw("copper_ore"),
        raw("feather"),
        crafted("ash_plank", "resource", Skill::Woodcutting, &[("ash_wood", 3)]),
        crafted("copper_bar", "resource", Skill::Mining, &[("copper_ore", 2)]),
        mace,
    ];

    let monsters = vec![
        Monster {
            code: "chicken".to_string(),
            level: 1,
            hp: 60,
            attack: ElementStats {
                water: 4.0,
                ..ElementStats::default()
            },
            resistance: ElementStats::default(),
            drops: vec![drop("feather")],
        },
        Monster {
            code: "ogre".to_string(),
            level: 20,
            hp: 2_000,
            attack: ElementStats {
                earth: 150.0,
                ..ElementStats::default()
            },
            resistance: ElementStats::default(),
            drops: vec![],
        },
    ];

    let resources = vec![
        Resource {
            code: "ash_tree".to_string(),
            skill: Skill::Woodcutting,
            level: 1,
            drops: vec![drop("ash_wood")],
        },
        Resource {
            code: "copper_rocks".to_string(),
            skill: Skill::Mining,
            level: 1,
            drops: vec![drop("copper_ore")],
        },
    ];

    WorldCatalog::new(maps, items, monsters, resources)
}
