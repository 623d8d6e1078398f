use std::fmt;

use serde::{Deserialize, Serialize};

/// Gathering and crafting skills. Gathering skills name resource tiles, crafting skills
/// name workshops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Mining,
    Woodcutting,
    Fishing,
    Weaponcrafting,
    Gearcrafting,
    Jewelrycrafting,
    Cooking,
    Alchemy,
}

impl Skill {
    pub const ALL: [Skill; 8] = [
        Skill::Mining,
        Skill::Woodcutting,
        Skill::Fishing,
        Skill::Weaponcrafting,
        Skill::Gearcrafting,
        Skill::Jewelrycrafting,
        Skill::Cooking,
        Skill::Alchemy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Skill::Mining => "mining",
            Skill::Woodcutting => "woodcutting",
            Skill::Fishing => "fishing",
            Skill::Weaponcrafting => "weaponcrafting",
            Skill::Gearcrafting => "gearcrafting",
            Skill::Jewelrycrafting => "jewelrycrafting",
            Skill::Cooking => "cooking",
            Skill::Alchemy => "alchemy",
        }
    }

    pub fn from_name(name: &str) -> Option<Skill> {
        Skill::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
