//! The closed set of scripted behaviors a session can run.
//!
//! Sessions have no AI. They execute exactly one of these primitive actions
//! per tick when scheduled, through the host bridge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive behavior the host knows how to perform for an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Swing at whatever is in reach.
    Attack,
    /// Break the block being looked at.
    Mine,
    /// Use the held item or interact with the facing block.
    UseItem,
    /// Jump if standing on ground.
    Jump,
    /// Toggle sneaking posture.
    Sneak,
    /// Rotate to face the nearest living entity.
    LookAtNearestEntity,
    /// Drop one item from the held stack.
    DropItem,
    /// Drop the entire held stack.
    DropStack,
    /// Drop every inventory slot. Used as the terminal action on removal.
    DropInventory,
    /// Swap main and off hand items.
    SwapHands,
}

impl ActionKind {
    /// All action kinds, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Attack,
        Self::Mine,
        Self::UseItem,
        Self::Jump,
        Self::Sneak,
        Self::LookAtNearestEntity,
        Self::DropItem,
        Self::DropStack,
        Self::DropInventory,
        Self::SwapHands,
    ];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attack => "attack",
            Self::Mine => "mine",
            Self::UseItem => "use_item",
            Self::Jump => "jump",
            Self::Sneak => "sneak",
            Self::LookAtNearestEntity => "look_at_nearest_entity",
            Self::DropItem => "drop_item",
            Self::DropStack => "drop_stack",
            Self::DropInventory => "drop_inventory",
            Self::SwapHands => "swap_hands",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
