//! "Show all files" visibility policy.

use crate::tree::node::NodeKind;
use serde::{Deserialize, Serialize};

/// Decides which materialized nodes are shown.
///
/// Non-member nodes always exist in the store; the policy only decides whether
/// they take part in the visible sibling chain, so toggling it never needs a
/// re-merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPolicy {
    #[serde(default)]
    pub show_all_files: bool,
}

impl VisibilityPolicy {
    pub fn project_files_only() -> Self {
        Self {
            show_all_files: false,
        }
    }

    pub fn show_all() -> Self {
        Self {
            show_all_files: true,
        }
    }

    pub fn is_visible(&self, kind: NodeKind, member: bool) -> bool {
        kind == NodeKind::Root || member || self.show_all_files
    }
}
