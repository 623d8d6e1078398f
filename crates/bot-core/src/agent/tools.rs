use std::fmt;

/// Every remote action the worker issues. Used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Move,
    Fight,
    Gather,
    Craft,
    Deposit,
    Withdraw,
    AcceptTask,
    CompleteTask,
    Equip,
    Unequip,
}

impl ActionKind {
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Move => "move",
            ActionKind::Fight => "fight",
            ActionKind::Gather => "gather",
            ActionKind::Craft => "craft",
            ActionKind::Deposit => "deposit_bank_item",
            ActionKind::Withdraw => "withdraw_bank_item",
            ActionKind::AcceptTask => "accept_task",
            ActionKind::CompleteTask => "complete_task",
            ActionKind::Equip => "equip",
            ActionKind::Unequip => "unequip",
        }
    }

    /// Actions against account-wide state (the bank) that other characters contend for.
    pub fn touches_shared_resource(self) -> bool {
        matches!(self, ActionKind::Deposit | ActionKind::Withdraw)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
