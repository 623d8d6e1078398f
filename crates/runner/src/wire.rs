//! JSON shapes of the ArtifactsMMO v1 API and their conversion into core types.
//!
//! Only the fields the bot reads are declared; serde ignores the rest.

use std::collections::BTreeMap;
use std::time::Duration;

use artifacts_bot_core::agent::{FightDetail, FightResult, SkillDetail, TaskReward};
use artifacts_bot_core::combat::ElementStats;
use artifacts_bot_core::player::{
    CharacterSnapshot, InventorySlot, ItemStack, Position, Skill, Slot, TaskKind, TaskState,
};
use artifacts_bot_core::world::{
    Drop, Effect, Item, MapContent, MapTile, Monster, Recipe, Resource,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub page: u32,
    /// Absent or null on empty listings.
    #[serde(default)]
    pub pages: Option<u32>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.pages.is_none_or(|pages| self.page >= pages)
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Seconds left from a cooldown message such as `Character in cooldown: 12.5 seconds left.`
pub fn cooldown_from_message(message: &str) -> Option<Duration> {
    let (_, rest) = message.split_once(':')?;
    let seconds: f64 = rest.split_whitespace().next()?.parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// Body of `GET /`.
#[derive(Debug, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub characters_online: u32,
    #[serde(default)]
    pub announcements: Vec<Announcement>,
    #[serde(default)]
    pub next_wipe: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Announcement {
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterWire {
    pub name: String,
    pub level: u32,
    pub hp: u32,
    #[serde(default)]
    pub gold: u64,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub mining_level: u32,
    #[serde(default)]
    pub woodcutting_level: u32,
    #[serde(default)]
    pub fishing_level: u32,
    #[serde(default)]
    pub weaponcrafting_level: u32,
    #[serde(default)]
    pub gearcrafting_level: u32,
    #[serde(default)]
    pub jewelrycrafting_level: u32,
    #[serde(default)]
    pub cooking_level: u32,
    #[serde(default)]
    pub alchemy_level: u32,
    #[serde(default)]
    pub attack_fire: f64,
    #[serde(default)]
    pub attack_earth: f64,
    #[serde(default)]
    pub attack_water: f64,
    #[serde(default)]
    pub attack_air: f64,
    #[serde(default)]
    pub dmg_fire: f64,
    #[serde(default)]
    pub dmg_earth: f64,
    #[serde(default)]
    pub dmg_water: f64,
    #[serde(default)]
    pub dmg_air: f64,
    #[serde(default)]
    pub res_fire: f64,
    #[serde(default)]
    pub res_earth: f64,
    #[serde(default)]
    pub res_water: f64,
    #[serde(default)]
    pub res_air: f64,
    #[serde(default)]
    pub cooldown_expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weapon_slot: String,
    #[serde(default)]
    pub shield_slot: String,
    #[serde(default)]
    pub helmet_slot: String,
    #[serde(default)]
    pub body_armor_slot: String,
    #[serde(default)]
    pub leg_armor_slot: String,
    #[serde(default)]
    pub boots_slot: String,
    #[serde(default)]
    pub ring1_slot: String,
    #[serde(default)]
    pub ring2_slot: String,
    #[serde(default)]
    pub amulet_slot: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub task_progress: u32,
    #[serde(default)]
    pub task_total: u32,
    pub inventory_max_items: u32,
    #[serde(default)]
    pub inventory: Vec<InventorySlot>,
}

fn task_kind(raw: &str) -> TaskKind {
    match raw {
        "monsters" => TaskKind::Monsters,
        "items" => TaskKind::Items,
        _ => TaskKind::Other,
    }
}

impl From<CharacterWire> for CharacterSnapshot {
    fn from(c: CharacterWire) -> Self {
        let skills = BTreeMap::from([
            (Skill::Mining, c.mining_level),
            (Skill::Woodcutting, c.woodcutting_level),
            (Skill::Fishing, c.fishing_level),
            (Skill::Weaponcrafting, c.weaponcrafting_level),
            (Skill::Gearcrafting, c.gearcrafting_level),
            (Skill::Jewelrycrafting, c.jewelrycrafting_level),
            (Skill::Cooking, c.cooking_level),
            (Skill::Alchemy, c.alchemy_level),
        ]);
        let equipment: BTreeMap<Slot, String> = [
            (Slot::Weapon, c.weapon_slot),
            (Slot::Shield, c.shield_slot),
            (Slot::Helmet, c.helmet_slot),
            (Slot::BodyArmor, c.body_armor_slot),
            (Slot::LegArmor, c.leg_armor_slot),
            (Slot::Boots, c.boots_slot),
            (Slot::Ring1, c.ring1_slot),
            (Slot::Ring2, c.ring2_slot),
            (Slot::Amulet, c.amulet_slot),
        ]
        .into_iter()
        .filter(|(_, code)| !code.is_empty())
        .collect();
        let task = (!c.task.is_empty()).then(|| TaskState {
            kind: task_kind(&c.task_type),
            code: c.task,
            progress: c.task_progress,
            total: c.task_total,
        });

        CharacterSnapshot {
            name: c.name,
            level: c.level,
            hp: c.hp,
            gold: c.gold,
            position: Position::new(c.x, c.y),
            skills,
            attack: ElementStats {
                fire: c.attack_fire,
                earth: c.attack_earth,
                water: c.attack_water,
                air: c.attack_air,
            },
            damage_bonus: ElementStats {
                fire: c.dmg_fire,
                earth: c.dmg_earth,
                water: c.dmg_water,
                air: c.dmg_air,
            },
            resistance: ElementStats {
                fire: c.res_fire,
                earth: c.res_earth,
                water: c.res_water,
                air: c.res_air,
            },
            equipment,
            inventory: c.inventory,
            inventory_max_items: c.inventory_max_items,
            cooldown_expiration: c.cooldown_expiration,
            task,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MapWire {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub content: Option<MapContent>,
}

impl From<MapWire> for MapTile {
    fn from(m: MapWire) -> Self {
        MapTile {
            position: Position::new(m.x, m.y),
            content: m.content,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CraftWire {
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub items: Vec<ItemStack>,
}

#[derive(Debug, Deserialize)]
pub struct ItemWire {
    pub code: String,
    pub level: u32,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub craft: Option<CraftWire>,
}

impl From<ItemWire> for Item {
    fn from(i: ItemWire) -> Self {
        // A recipe for a skill the bot does not know is treated as no recipe.
        let craft = i.craft.and_then(|c| {
            let skill = Skill::from_name(c.skill.as_deref()?)?;
            Some(Recipe {
                skill,
                level: c.level,
                components: c.items,
            })
        });
        Item {
            code: i.code,
            level: i.level,
            item_type: i.item_type,
            subtype: i.subtype,
            effects: i.effects,
            craft,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MonsterWire {
    pub code: String,
    pub level: u32,
    pub hp: u32,
    #[serde(default)]
    pub attack_fire: f64,
    #[serde(default)]
    pub attack_earth: f64,
    #[serde(default)]
    pub attack_water: f64,
    #[serde(default)]
    pub attack_air: f64,
    #[serde(default)]
    pub res_fire: f64,
    #[serde(default)]
    pub res_earth: f64,
    #[serde(default)]
    pub res_water: f64,
    #[serde(default)]
    pub res_air: f64,
    #[serde(default)]
    pub drops: Vec<Drop>,
}

impl From<MonsterWire> for Monster {
    fn from(m: MonsterWire) -> Self {
        Monster {
            code: m.code,
            level: m.level,
            hp: m.hp,
            attack: ElementStats {
                fire: m.attack_fire,
                earth: m.attack_earth,
                water: m.attack_water,
                air: m.attack_air,
            },
            resistance: ElementStats {
                fire: m.res_fire,
                earth: m.res_earth,
                water: m.res_water,
                air: m.res_air,
            },
            drops: m.drops,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResourceWire {
    pub code: String,
    pub skill: String,
    pub level: u32,
    #[serde(default)]
    pub drops: Vec<Drop>,
}

impl ResourceWire {
    /// `None` for resources of a skill the bot does not know.
    pub fn into_resource(self) -> Option<Resource> {
        Some(Resource {
            skill: Skill::from_name(&self.skill)?,
            code: self.code,
            level: self.level,
            drops: self.drops,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CooldownWire {
    #[serde(default)]
    pub remaining_seconds: f64,
}

impl CooldownWire {
    pub fn remaining(&self) -> Duration {
        Duration::try_from_secs_f64(self.remaining_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Body of every character action response. Action-specific parts are optional.
#[derive(Debug, Deserialize)]
pub struct ActionWire {
    pub cooldown: CooldownWire,
    pub character: CharacterWire,
    #[serde(default)]
    pub fight: Option<FightWire>,
    #[serde(default)]
    pub details: Option<SkillWire>,
    #[serde(default)]
    pub task: Option<TaskWire>,
    #[serde(default)]
    pub reward: Option<ItemStack>,
}

#[derive(Debug, Deserialize)]
pub struct FightWire {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub drops: Vec<ItemStack>,
    pub result: FightResult,
}

impl From<FightWire> for FightDetail {
    fn from(f: FightWire) -> Self {
        FightDetail {
            result: f.result,
            xp: f.xp,
            drops: f.drops,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SkillWire {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub items: Vec<ItemStack>,
}

impl From<SkillWire> for SkillDetail {
    fn from(s: SkillWire) -> Self {
        SkillDetail {
            xp: s.xp,
            items: s.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskWire {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub total: u32,
}

impl From<TaskWire> for TaskState {
    fn from(t: TaskWire) -> Self {
        TaskState {
            kind: task_kind(&t.kind),
            code: t.code,
            progress: 0,
            total: t.total,
        }
    }
}

pub fn task_reward(stack: ItemStack) -> TaskReward {
    TaskReward {
        code: stack.code,
        quantity: stack.quantity,
    }
}

#[derive(Debug, Serialize)]
pub struct MoveBody {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Serialize)]
pub struct ItemBody<'a> {
    pub code: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct EquipBody<'a> {
    pub code: &'a str,
    pub slot: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UnequipBody<'a> {
    pub slot: &'a str,
}
