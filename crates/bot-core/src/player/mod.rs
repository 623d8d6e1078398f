pub mod equipment;
pub mod inventory;
pub mod player_state;
pub mod skills;

pub use equipment::Slot;
pub use inventory::{InventorySlot, ItemStack};
pub use player_state::{CharacterSnapshot, Position, TaskKind, TaskState};
pub use skills::Skill;
