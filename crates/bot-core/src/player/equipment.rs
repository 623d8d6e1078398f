use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Weapon,
    Shield,
    Helmet,
    BodyArmor,
    LegArmor,
    Boots,
    Ring1,
    Ring2,
    Amulet,
}

impl Slot {
    pub const ALL: [Slot; 9] = [
        Slot::Weapon,
        Slot::Shield,
        Slot::Helmet,
        Slot::BodyArmor,
        Slot::LegArmor,
        Slot::Boots,
        Slot::Ring1,
        Slot::Ring2,
        Slot::Amulet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Weapon => "weapon",
            Slot::Shield => "shield",
            Slot::Helmet => "helmet",
            Slot::BodyArmor => "body_armor",
            Slot::LegArmor => "leg_armor",
            Slot::Boots => "boots",
            Slot::Ring1 => "ring1",
            Slot::Ring2 => "ring2",
            Slot::Amulet => "amulet",
        }
    }

    /// Slot an item of the given catalog type is worn in. Rings go to the first ring slot.
    pub fn for_item_type(item_type: &str) -> Option<Slot> {
        match item_type {
            "weapon" => Some(Slot::Weapon),
            "shield" => Some(Slot::Shield),
            "helmet" => Some(Slot::Helmet),
            "body_armor" => Some(Slot::BodyArmor),
            "leg_armor" => Some(Slot::LegArmor),
            "boots" => Some(Slot::Boots),
            "ring" => Some(Slot::Ring1),
            "amulet" => Some(Slot::Amulet),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
