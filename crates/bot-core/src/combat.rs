//! Fight-outcome estimation and gear ranking.
//!
//! Everything here is pure: the evaluator reads stats and returns numbers, it never talks to
//! the server. The damage model is the game's elemental one:
//!
//! `damage_e = (attack_e + attack_e * bonus_e / 100) * (1 - resistance_e / 100)`
//!
//! summed over fire, earth, water and air.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::player::CharacterSnapshot;
use crate::world::{Item, Monster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Fire,
    Earth,
    Water,
    Air,
}

impl Element {
    pub const ALL: [Element; 4] = [Element::Fire, Element::Earth, Element::Water, Element::Air];

    pub fn name(self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Earth => "earth",
            Element::Water => "water",
            Element::Air => "air",
        }
    }

    /// Element an item effect such as `attack_fire` applies to.
    pub fn from_attack_effect(effect: &str) -> Option<Element> {
        let suffix = effect.strip_prefix("attack_")?;
        Element::ALL.into_iter().find(|e| e.name() == suffix)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct ElementStats {
    #[serde(default)]
    pub fire: f64,
    #[serde(default)]
    pub earth: f64,
    #[serde(default)]
    pub water: f64,
    #[serde(default)]
    pub air: f64,
}

impl ElementStats {
    pub fn get(&self, element: Element) -> f64 {
        match element {
            Element::Fire => self.fire,
            Element::Earth => self.earth,
            Element::Water => self.water,
            Element::Air => self.air,
        }
    }

    pub fn set(&mut self, element: Element, value: f64) {
        match element {
            Element::Fire => self.fire = value,
            Element::Earth => self.earth = value,
            Element::Water => self.water = value,
            Element::Air => self.air = value,
        }
    }
}

/// Stats relevant to one side of a fight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Combatant {
    pub hp: u32,
    pub attack: ElementStats,
    pub damage_bonus: ElementStats,
    pub resistance: ElementStats,
}

impl From<&CharacterSnapshot> for Combatant {
    fn from(c: &CharacterSnapshot) -> Self {
        Self {
            hp: c.hp,
            attack: c.attack,
            damage_bonus: c.damage_bonus,
            resistance: c.resistance,
        }
    }
}

impl From<&Monster> for Combatant {
    fn from(m: &Monster) -> Self {
        Self {
            hp: m.hp,
            attack: m.attack,
            damage_bonus: ElementStats::default(),
            resistance: m.resistance,
        }
    }
}

fn elemental_damage(attack: f64, bonus: f64, resistance: f64) -> f64 {
    // Resistance above 100% cannot heal the target.
    let mitigation = (1.0 - resistance / 100.0).max(0.0);
    (attack + attack * bonus / 100.0) * mitigation
}

/// Damage `attacker` deals to `defender` in a single turn.
pub fn estimate_damage(attacker: &Combatant, defender: &Combatant) -> f64 {
    Element::ALL
        .into_iter()
        .map(|e| {
            elemental_damage(
                attacker.attack.get(e),
                attacker.damage_bonus.get(e),
                defender.resistance.get(e),
            )
        })
        .sum()
}

/// Turns needed to bring `hp` to zero at `damage_per_turn`. Zero damage never finishes.
pub fn turns_to_deplete(hp: u32, damage_per_turn: f64) -> u32 {
    if damage_per_turn <= 0.0 {
        return u32::MAX;
    }
    let turns = (f64::from(hp) / damage_per_turn).ceil();
    if turns >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        turns as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FightEstimate {
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub turns_to_kill: u32,
    pub turns_to_die: u32,
}

impl FightEstimate {
    /// Ties go to the monster.
    pub fn winnable(&self) -> bool {
        self.turns_to_kill < self.turns_to_die
    }
}

pub fn estimate_fight(character: &Combatant, monster: &Combatant) -> FightEstimate {
    let damage_dealt = estimate_damage(character, monster);
    let damage_taken = estimate_damage(monster, character);
    FightEstimate {
        damage_dealt,
        damage_taken,
        turns_to_kill: turns_to_deplete(monster.hp, damage_dealt),
        turns_to_die: turns_to_deplete(character.hp, damage_taken),
    }
}

/// An item paired with how much damage it would deal to a given monster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearEvaluation<'a> {
    pub item: &'a Item,
    pub damage: f64,
}

/// Damage contributed by an item's attack effects, amplified by the wearer's elemental
/// bonuses and reduced by the monster's resistances.
pub fn item_damage(item: &Item, wearer: &Combatant, monster: &Combatant) -> f64 {
    item.effects
        .iter()
        .filter_map(|effect| {
            let element = Element::from_attack_effect(&effect.name)?;
            Some(elemental_damage(
                effect.value,
                wearer.damage_bonus.get(element),
                monster.resistance.get(element),
            ))
        })
        .sum()
}

/// Scores every candidate against `monster`, best first. Items without any attack effect
/// are dropped.
pub fn rank_gear<'a>(
    candidates: impl IntoIterator<Item = &'a Item>,
    wearer: &Combatant,
    monster: &Combatant,
) -> Vec<GearEvaluation<'a>> {
    let mut ranked: Vec<GearEvaluation<'a>> = candidates
        .into_iter()
        .filter(|item| {
            item.effects
                .iter()
                .any(|e| Element::from_attack_effect(&e.name).is_some())
        })
        .map(|item| GearEvaluation {
            item,
            damage: item_damage(item, wearer, monster),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.damage
            .total_cmp(&a.damage)
            // Deterministic tie-breaker.
            .then_with(|| a.item.code.cmp(&b.item.code))
    });
    ranked
}
