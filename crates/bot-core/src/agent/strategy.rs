use std::collections::BTreeSet;

use crate::combat::{Combatant, GearEvaluation, estimate_fight, item_damage, rank_gear};
use crate::craft::CraftPlan;
use crate::player::{CharacterSnapshot, Slot};
use crate::world::{Item, Monster, WorldCatalog};

/// A craftable item that beats what the character currently wears in `slot`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearChoice<'a> {
    pub evaluation: GearEvaluation<'a>,
    pub slot: Slot,
    /// Damage of the item it replaces, 0 when the slot is empty.
    pub current_damage: f64,
}

/// Items the character could craft and wear: recipe and level within reach, wearable, not
/// worn already and not given up on.
pub fn gear_candidates<'a>(
    character: &CharacterSnapshot,
    catalog: &'a WorldCatalog,
    blocked: &BTreeSet<String>,
) -> impl Iterator<Item = &'a Item> {
    catalog.items().filter(move |item| {
        let Some(recipe) = item.craft.as_ref() else {
            return false;
        };
        item.level <= character.level
            && recipe.level <= character.skill_level(recipe.skill)
            && Slot::for_item_type(&item.item_type).is_some()
            && !character.is_equipped(&item.code)
            && !blocked.contains(&item.code)
    })
}

/// Best upgrade against `monster`, if any candidate out-damages the item already in its slot.
pub fn best_gear_upgrade<'a>(
    character: &CharacterSnapshot,
    catalog: &'a WorldCatalog,
    monster: &Monster,
    blocked: &BTreeSet<String>,
) -> Option<GearChoice<'a>> {
    let wearer = Combatant::from(character);
    let target = Combatant::from(monster);

    rank_gear(gear_candidates(character, catalog, blocked), &wearer, &target)
        .into_iter()
        .filter_map(|evaluation| {
            let slot = Slot::for_item_type(&evaluation.item.item_type)?;
            let current_damage = character
                .equipped(slot)
                .and_then(|code| catalog.item(code))
                .map_or(0.0, |worn| item_damage(worn, &wearer, &target));
            (evaluation.damage > current_damage).then_some(GearChoice {
                evaluation,
                slot,
                current_damage,
            })
        })
        .next()
}

/// Checks the whole plan is within the character's reach before committing to it: every
/// intermediate recipe within skill, every raw ingredient gatherable or lootable from a
/// monster the character can beat.
pub fn check_plan_feasible(
    plan: &CraftPlan,
    character: &CharacterSnapshot,
    catalog: &WorldCatalog,
) -> Result<(), String> {
    for node in &plan.nodes {
        match node.skill {
            Some(skill) => {
                if node.level > character.skill_level(skill) {
                    return Err(format!(
                        "{} needs {skill} {} (have {})",
                        node.item_code,
                        node.level,
                        character.skill_level(skill)
                    ));
                }
            }
            None => {
                if raw_source(&node.item_code, character, catalog).is_none() {
                    return Err(format!("no_source: {}", node.item_code));
                }
            }
        }
    }
    Ok(())
}

/// Where a raw ingredient comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource<'a> {
    Resource(&'a str),
    Monster(&'a str),
}

/// Prefers a resource the character can gather; falls back to the weakest winnable monster
/// that drops the item.
pub fn raw_source<'a>(
    item_code: &str,
    character: &CharacterSnapshot,
    catalog: &'a WorldCatalog,
) -> Option<RawSource<'a>> {
    if let Some(resource) = catalog.resource_dropping(item_code)
        && resource.level <= character.skill_level(resource.skill)
    {
        return Some(RawSource::Resource(&resource.code));
    }
    let me = Combatant::from(character);
    catalog
        .monsters_dropping(item_code)
        .into_iter()
        .find(|m| estimate_fight(&me, &Combatant::from(*m)).winnable())
        .map(|m| RawSource::Monster(&m.code))
}
