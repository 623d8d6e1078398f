use serde::{Deserialize, Serialize};

/// One inventory slot as reported by the server. Empty slots carry an empty code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InventorySlot {
    pub slot: u32,
    pub code: String,
    pub quantity: u32,
}

impl InventorySlot {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() || self.quantity == 0
    }
}

/// An item code paired with a quantity (bank contents, drops, recipe components).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemStack {
    pub code: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(code: impl Into<String>, quantity: u32) -> Self {
        Self {
            code: code.into(),
            quantity,
        }
    }
}

pub type Inventory = Vec<InventorySlot>;

/// Sums every stack of `code` across a list of stacks.
pub fn count_in(stacks: &[ItemStack], code: &str) -> u32 {
    stacks
        .iter()
        .filter(|s| s.code == code)
        .map(|s| s.quantity)
        .sum()
}
