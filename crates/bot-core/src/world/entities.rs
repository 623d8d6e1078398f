use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::ElementStats;
use crate::player::{ItemStack, Position, Skill};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Monster,
    Resource,
    Workshop,
    Bank,
    GrandExchange,
    TasksMaster,
    #[serde(other)]
    Other,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::Monster => "monster",
            ContentType::Resource => "resource",
            ContentType::Workshop => "workshop",
            ContentType::Bank => "bank",
            ContentType::GrandExchange => "grand_exchange",
            ContentType::TasksMaster => "tasks_master",
            ContentType::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MapContent {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MapTile {
    pub position: Position,
    #[serde(default)]
    pub content: Option<MapContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Effect {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Recipe {
    pub skill: Skill,
    pub level: u32,
    pub components: Vec<ItemStack>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Item {
    pub code: String,
    pub level: u32,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub craft: Option<Recipe>,
}

impl Item {
    pub fn is_craftable(&self) -> bool {
        self.craft.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Drop {
    pub code: String,
    /// One in `rate` chance per action.
    #[serde(default)]
    pub rate: u32,
    #[serde(default)]
    pub min_quantity: u32,
    #[serde(default)]
    pub max_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Monster {
    pub code: String,
    pub level: u32,
    pub hp: u32,
    #[serde(default)]
    pub attack: ElementStats,
    #[serde(default)]
    pub resistance: ElementStats,
    #[serde(default)]
    pub drops: Vec<Drop>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Resource {
    pub code: String,
    pub skill: Skill,
    pub level: u32,
    #[serde(default)]
    pub drops: Vec<Drop>,
}
