//! Crafting dependency resolution.
//!
//! [`decompose`] flattens a recipe tree into an arena of [`CraftPlanNode`]s, one per ingredient
//! occurrence, each carrying the total quantity the target needs. Nodes keep parent/child
//! indices so step selection can reason about branches without re-walking the catalog.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::player::{CharacterSnapshot, ItemStack, Skill};
use crate::world::{Item, WorldCatalog};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("item {0} is not in the catalog")]
    UnknownItem(String),
    #[error("item {0} has no recipe")]
    NotCraftable(String),
    #[error("recipe cycle through {0}")]
    Cycle(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CraftPlanNode {
    pub item_code: String,
    pub level: u32,
    /// Skill that crafts this item; `None` for raw ingredients.
    pub skill: Option<Skill>,
    pub subtype: String,
    pub quantity_in_bank: u32,
    pub quantity_in_inventory: u32,
    /// Per-craft quantity multiplied by every ancestor's per-craft quantity.
    pub quantity_needed: u32,
    /// Quantity one craft of the parent consumes.
    pub per_craft: u32,
    /// Higher runs first. Every node outranks its ancestors.
    pub priority: u32,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl CraftPlanNode {
    pub fn quantity_total(&self) -> u32 {
        self.quantity_in_bank + self.quantity_in_inventory
    }

    pub fn is_complete(&self) -> bool {
        self.quantity_total() >= self.quantity_needed
    }

    pub fn is_raw(&self) -> bool {
        self.skill.is_none()
    }

    pub fn missing(&self) -> u32 {
        self.quantity_needed.saturating_sub(self.quantity_total())
    }
}

/// What the plan asks for next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanStep<'p> {
    /// Every top-level ingredient is on hand, in the inventory or the bank.
    CraftTarget,
    /// The inventory holds components for `quantity` crafts of `node`.
    Craft {
        node: &'p CraftPlanNode,
        quantity: u32,
    },
    /// A raw ingredient is short and has to be gathered or looted.
    Obtain { node: &'p CraftPlanNode },
    /// `node`'s components exist but part of them sit in the bank.
    Withdraw { node: &'p CraftPlanNode },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CraftPlan {
    pub target_code: String,
    pub target_skill: Skill,
    pub target_level: u32,
    /// Pre-order arena: a parent always precedes its children.
    pub nodes: Vec<CraftPlanNode>,
}

/// Recursively expands `target`'s recipe against the catalog.
pub fn decompose(target: &Item, catalog: &WorldCatalog) -> Result<CraftPlan, PlanError> {
    let recipe = target
        .craft
        .as_ref()
        .ok_or_else(|| PlanError::NotCraftable(target.code.clone()))?;

    let mut nodes = Vec::new();
    let mut path = vec![target.code.clone()];
    for component in &recipe.components {
        walk(catalog, component, None, 1, &mut path, &mut nodes)?;
    }
    assign_priorities(&mut nodes);

    Ok(CraftPlan {
        target_code: target.code.clone(),
        target_skill: recipe.skill,
        target_level: recipe.level,
        nodes,
    })
}

fn walk(
    catalog: &WorldCatalog,
    component: &ItemStack,
    parent: Option<usize>,
    multiplier: u32,
    path: &mut Vec<String>,
    nodes: &mut Vec<CraftPlanNode>,
) -> Result<(), PlanError> {
    if path.contains(&component.code) {
        return Err(PlanError::Cycle(component.code.clone()));
    }
    let item = catalog
        .item(&component.code)
        .ok_or_else(|| PlanError::UnknownItem(component.code.clone()))?;

    let index = nodes.len();
    let needed = component.quantity.saturating_mul(multiplier);
    nodes.push(CraftPlanNode {
        item_code: item.code.clone(),
        level: item.craft.as_ref().map(|r| r.level).unwrap_or(item.level),
        skill: item.craft.as_ref().map(|r| r.skill),
        subtype: item.subtype.clone(),
        quantity_in_bank: 0,
        quantity_in_inventory: 0,
        quantity_needed: needed,
        per_craft: component.quantity,
        priority: 0,
        parent,
        children: Vec::new(),
    });
    if let Some(p) = parent {
        nodes[p].children.push(index);
    }

    if let Some(recipe) = &item.craft {
        path.push(item.code.clone());
        for sub in &recipe.components {
            walk(catalog, sub, Some(index), needed, path, nodes)?;
        }
        path.pop();
    }
    Ok(())
}

/// Leaves-first: priority follows post-order, so children always outrank their parent and
/// earlier branches outrank later ones.
fn assign_priorities(nodes: &mut [CraftPlanNode]) {
    let total = nodes.len() as u32;
    let mut rank = 0u32;
    let roots: Vec<usize> = (0..nodes.len())
        .filter(|&i| nodes[i].parent.is_none())
        .collect();

    // Explicit stack: (node, children already pushed).
    let mut stack: Vec<(usize, bool)> = roots.into_iter().rev().map(|r| (r, false)).collect();
    while let Some((index, expanded)) = stack.pop() {
        if expanded {
            nodes[index].priority = total - rank;
            rank += 1;
            continue;
        }
        stack.push((index, true));
        for &child in nodes[index].children.iter().rev() {
            stack.push((child, false));
        }
    }
}

impl CraftPlan {
    /// Refreshes availability from the inventory and bank.
    ///
    /// Stacks are handed out in arena order, so a parent is served before its components and
    /// earlier branches before later ones. Components of a node that is already complete get
    /// nothing: their material is embodied in the parent and the stock stays free for other
    /// occurrences of the same code.
    pub fn reconcile(&mut self, character: &CharacterSnapshot, bank: &[ItemStack]) {
        let mut inventory: HashMap<String, u32> = HashMap::new();
        let mut banked: HashMap<String, u32> = HashMap::new();
        for node in &self.nodes {
            let code = node.item_code.as_str();
            if !inventory.contains_key(code) {
                inventory.insert(code.to_string(), character.inventory_count(code));
                banked.insert(
                    code.to_string(),
                    crate::player::inventory::count_in(bank, code),
                );
            }
        }

        // Pre-order arena: a parent's flag is final before any child reads it.
        let mut settled = vec![false; self.nodes.len()];
        for index in 0..self.nodes.len() {
            let node = &mut self.nodes[index];
            if node.parent.is_some_and(|p| settled[p]) {
                node.quantity_in_inventory = 0;
                node.quantity_in_bank = 0;
                settled[index] = true;
                continue;
            }

            let code = node.item_code.as_str();
            let inv = inventory.get_mut(code).map_or(0, |left| {
                let take = (*left).min(node.quantity_needed);
                *left -= take;
                take
            });
            let bank = banked.get_mut(code).map_or(0, |left| {
                let take = (*left).min(node.quantity_needed - inv);
                *left -= take;
                take
            });
            node.quantity_in_inventory = inv;
            node.quantity_in_bank = bank;
            settled[index] = node.is_complete();
        }
    }

    pub fn top_level(&self) -> impl Iterator<Item = &CraftPlanNode> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }

    /// A node is settled when it, or any ancestor, is complete: its material is already
    /// embodied in something further up the tree.
    pub fn is_settled(&self, index: usize) -> bool {
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            if self.nodes[i].is_complete() {
                return true;
            }
            cursor = self.nodes[i].parent;
        }
        false
    }

    /// Highest-priority node still short of its requirement, or `None` once the target can be
    /// crafted.
    pub fn next_actionable(&self) -> Option<&CraftPlanNode> {
        (0..self.nodes.len())
            .filter(|&i| !self.is_settled(i))
            .max_by(|&a, &b| self.nodes[a].priority.cmp(&self.nodes[b].priority))
            .map(|i| &self.nodes[i])
    }

    pub fn is_satisfied(&self) -> bool {
        self.top_level().all(CraftPlanNode::is_complete)
    }

    /// Item codes that occur in more than one branch.
    pub fn shared_codes(&self) -> Vec<&str> {
        let mut seen: BTreeMap<&str, u32> = BTreeMap::new();
        for node in &self.nodes {
            *seen.entry(node.item_code.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(code, _)| code)
            .collect()
    }

    /// Crafts of `node` the current inventory can pay for.
    pub fn crafts_available(&self, node: &CraftPlanNode, character: &CharacterSnapshot) -> u32 {
        node.children
            .iter()
            .map(|&c| {
                let child = &self.nodes[c];
                character.inventory_count(&child.item_code) / child.per_craft.max(1)
            })
            .min()
            .unwrap_or(0)
    }

    /// One step per call: craft the target, craft an intermediate the inventory can pay for,
    /// fetch a raw ingredient, or pull components out of the bank.
    pub fn next_step(&self, character: &CharacterSnapshot) -> Option<PlanStep<'_>> {
        if self.is_satisfied() {
            return Some(PlanStep::CraftTarget);
        }

        let mut craftable: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| !self.nodes[i].is_raw() && !self.is_settled(i))
            .collect();
        craftable.sort_by(|&a, &b| self.nodes[b].priority.cmp(&self.nodes[a].priority));
        for index in craftable {
            let node = &self.nodes[index];
            let quantity = self.crafts_available(node, character).min(node.missing());
            if quantity > 0 {
                return Some(PlanStep::Craft { node, quantity });
            }
        }

        let node = self.next_actionable()?;
        if node.is_raw() {
            Some(PlanStep::Obtain { node })
        } else {
            Some(PlanStep::Withdraw { node })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::combat::ElementStats;
    use crate::player::{InventorySlot, Position};
    use crate::world::Recipe;

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

    fn crafted(code: &str, skill: Skill, components: &[(&str, u32)]) -> Item {
        Item {
            code: code.to_string(),
            level: 1,
            item_type: "weapon".to_string(),
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

    fn catalog(items: Vec<Item>) -> WorldCatalog {
        WorldCatalog::new(vec![], items, vec![], vec![])
    }

    fn character(stacks: &[(&str, u32)]) -> CharacterSnapshot {
        CharacterSnapshot {
            name: "ada".to_string(),
            level: 1,
            hp: 100,
            gold: 0,
            position: Position::default(),
            skills: BTreeMap::new(),
            attack: ElementStats::default(),
            damage_bonus: ElementStats::default(),
            resistance: ElementStats::default(),
            equipment: BTreeMap::new(),
            inventory: stacks
                .iter()
                .enumerate()
                .map(|(i, (code, quantity))| InventorySlot {
                    slot: i as u32 + 1,
                    code: code.to_string(),
                    quantity: *quantity,
                })
                .collect(),
            inventory_max_items: 100,
            cooldown_expiration: None,
            task: None,
        }
    }

    /// sword = 2 plank + 1 bar; plank = 3 wood; bar = 2 ore.
    fn sword_world() -> (Item, WorldCatalog) {
        let sword = crafted(
            "sword",
            Skill::Weaponcrafting,
            &[("plank", 2), ("bar", 1)],
        );
        let world = catalog(vec![
            sword.clone(),
            crafted("plank", Skill::Woodcutting, &[("wood", 3)]),
            crafted("bar", Skill::Mining, &[("ore", 2)]),
            raw("wood"),
            raw("ore"),
        ]);
        (sword, world)
    }

    #[test]
    fn decompose_multiplies_quantities_down_the_tree() {
        let (sword, world) = sword_world();
        let plan = decompose(&sword, &world).expect("plan");

        let needed: Vec<(&str, u32, Option<usize>)> = plan
            .nodes
            .iter()
            .map(|n| (n.item_code.as_str(), n.quantity_needed, n.parent))
            .collect();
        assert_eq!(
            needed,
            vec![
                ("plank", 2, None),
                ("wood", 6, Some(0)),
                ("bar", 1, None),
                ("ore", 2, Some(2)),
            ]
        );
        assert_eq!(plan.target_skill, Skill::Weaponcrafting);
    }

    #[test]
    fn decompose_three_levels_deep() {
        let ring = crafted("ring", Skill::Jewelrycrafting, &[("setting", 2)]);
        let world = catalog(vec![
            ring.clone(),
            crafted("setting", Skill::Jewelrycrafting, &[("bar", 3)]),
            crafted("bar", Skill::Mining, &[("ore", 4)]),
            raw("ore"),
        ]);
        let plan = decompose(&ring, &world).expect("plan");
        let ore = plan.nodes.iter().find(|n| n.item_code == "ore").expect("ore");
        assert_eq!(ore.quantity_needed, 2 * 3 * 4);
        assert_eq!(ore.per_craft, 4);
    }

    #[test]
    fn shared_ingredients_keep_one_node_per_occurrence() {
        let axe = crafted("axe", Skill::Weaponcrafting, &[("plank", 1), ("wood", 2)]);
        let world = catalog(vec![
            axe.clone(),
            crafted("plank", Skill::Woodcutting, &[("wood", 3)]),
            raw("wood"),
        ]);
        let plan = decompose(&axe, &world).expect("plan");
        assert_eq!(plan.nodes.len(), 3);
        assert_eq!(plan.shared_codes(), vec!["wood"]);
    }

    #[test]
    fn children_outrank_parents() {
        let (sword, world) = sword_world();
        let plan = decompose(&sword, &world).expect("plan");
        for node in &plan.nodes {
            if let Some(p) = node.parent {
                assert!(node.priority > plan.nodes[p].priority);
            }
        }
        // First branch before second.
        assert!(plan.nodes[0].priority > plan.nodes[2].priority);
    }

    #[test]
    fn unknown_and_uncraftable_items_are_rejected() {
        let broken = crafted("broken", Skill::Gearcrafting, &[("ghost", 1)]);
        let world = catalog(vec![broken.clone()]);
        assert_eq!(
            decompose(&broken, &world),
            Err(PlanError::UnknownItem("ghost".to_string()))
        );
        assert_eq!(
            decompose(&raw("ore"), &world),
            Err(PlanError::NotCraftable("ore".to_string()))
        );
    }

    #[test]
    fn recipe_cycles_are_detected() {
        let a = crafted("a", Skill::Cooking, &[("b", 1)]);
        let b = crafted("b", Skill::Cooking, &[("a", 1)]);
        let world = catalog(vec![a.clone(), b]);
        assert_eq!(decompose(&a, &world), Err(PlanError::Cycle("a".to_string())));
    }

    #[test]
    fn next_actionable_skips_complete_and_settled_nodes() {
        let (sword, world) = sword_world();
        let mut plan = decompose(&sword, &world).expect("plan");

        plan.reconcile(&character(&[]), &[]);
        assert_eq!(plan.next_actionable().map(|n| n.item_code.as_str()), Some("wood"));

        // Planks finished: the wood under them is settled even though none is left.
        plan.reconcile(&character(&[("plank", 2)]), &[]);
        let next = plan.next_actionable().expect("next");
        assert_eq!(next.item_code, "ore");
        assert!(!next.is_complete());

        plan.reconcile(&character(&[("plank", 2)]), &[ItemStack::new("bar", 1)]);
        assert!(plan.next_actionable().is_none());
        assert!(plan.is_satisfied());
    }

    #[test]
    fn reconcile_splits_bank_and_inventory_without_double_counting() {
        let axe = crafted("axe", Skill::Weaponcrafting, &[("plank", 1), ("wood", 2)]);
        let world = catalog(vec![
            axe.clone(),
            crafted("plank", Skill::Woodcutting, &[("wood", 3)]),
            raw("wood"),
        ]);
        let mut plan = decompose(&axe, &world).expect("plan");
        plan.reconcile(&character(&[("wood", 2)]), &[ItemStack::new("wood", 2)]);

        let wood: Vec<(u32, u32)> = plan
            .nodes
            .iter()
            .filter(|n| n.item_code == "wood")
            .map(|n| (n.quantity_in_inventory, n.quantity_in_bank))
            .collect();
        // Plank's wood comes first and takes the inventory pair plus one banked.
        assert_eq!(wood, vec![(2, 1), (0, 1)]);
    }

    #[test]
    fn finished_intermediate_leaves_its_raw_code_to_siblings() {
        let axe = crafted("axe", Skill::Weaponcrafting, &[("plank", 1), ("wood", 2)]);
        let world = catalog(vec![
            axe.clone(),
            crafted("plank", Skill::Woodcutting, &[("wood", 3)]),
            raw("wood"),
        ]);
        let mut plan = decompose(&axe, &world).expect("plan");
        let me = character(&[("plank", 1), ("wood", 2)]);
        plan.reconcile(&me, &[]);

        let wood: Vec<(u32, u32)> = plan
            .nodes
            .iter()
            .filter(|n| n.item_code == "wood")
            .map(|n| (n.quantity_in_inventory, n.quantity_in_bank))
            .collect();
        assert_eq!(wood, vec![(0, 0), (2, 0)]);
        assert!(plan.is_satisfied());
        assert_eq!(plan.next_step(&me), Some(PlanStep::CraftTarget));
    }

    #[test]
    fn steps_gather_then_craft_then_target() {
        let (sword, world) = sword_world();
        let mut plan = decompose(&sword, &world).expect("plan");

        let me = character(&[("wood", 2)]);
        plan.reconcile(&me, &[]);
        assert!(matches!(
            plan.next_step(&me),
            Some(PlanStep::Obtain { node }) if node.item_code == "wood"
        ));

        let me = character(&[("wood", 3)]);
        plan.reconcile(&me, &[]);
        assert!(matches!(
            plan.next_step(&me),
            Some(PlanStep::Craft { node, quantity: 1 }) if node.item_code == "plank"
        ));

        let me = character(&[("plank", 2), ("bar", 1)]);
        plan.reconcile(&me, &[]);
        assert_eq!(plan.next_step(&me), Some(PlanStep::CraftTarget));
    }

    #[test]
    fn banked_components_trigger_withdraw() {
        let (sword, world) = sword_world();
        let mut plan = decompose(&sword, &world).expect("plan");
        let me = character(&[("plank", 2)]);
        plan.reconcile(&me, &[ItemStack::new("ore", 2)]);
        assert!(matches!(
            plan.next_step(&me),
            Some(PlanStep::Withdraw { node }) if node.item_code == "bar"
        ));
    }
}
