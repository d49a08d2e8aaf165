//! Core types shared by the tree, merge, and scheduling layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ItemId: stable integer identity of a node within one tree instance.
///
/// Identities are handed out monotonically and never reused while the tree
/// lives, so a stale id simply stops resolving. `ItemId::NIL` never names a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl ItemId {
    /// The "no item" sentinel.
    pub const NIL: ItemId = ItemId(0);

    /// The identity of the project root; always the first id allocated.
    pub const ROOT: ItemId = ItemId(1);

    pub fn is_nil(self) -> bool {
        self == Self::NIL
    }

    /// Converts `NIL` into `None`.
    pub fn non_nil(self) -> Option<ItemId> {
        if self.is_nil() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<Option<ItemId>> for ItemId {
    fn from(id: Option<ItemId>) -> Self {
        id.unwrap_or(ItemId::NIL)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sort-priority classes. Children are ordered by priority, highest first.
pub mod sort_priority {
    pub const ROOT: i32 = 1000;
    pub const FOLDER: i32 = 500;
    pub const FILE: i32 = 100;
}
