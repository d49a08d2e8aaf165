//! Serializable view of the displayed tree.

use crate::tree::{NodeKind, NodeStore};
use crate::types::ItemId;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotNode {
    pub id: ItemId,
    pub caption: String,
    pub path: PathBuf,
    pub kind: NodeKind,
    pub member: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeSnapshot {
    pub show_all_files: bool,
    pub node_count: usize,
    pub root: SnapshotNode,
}

impl TreeSnapshot {
    /// Capture the displayed part of `store`.
    pub fn capture(store: &NodeStore) -> Self {
        Self {
            show_all_files: store.policy().show_all_files,
            node_count: store.len(),
            root: capture_node(store, store.root()),
        }
    }

    /// Displayed paths in pre-order, root excluded.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack: Vec<&SnapshotNode> = self.root.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node.path.clone());
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

fn capture_node(store: &NodeStore, id: ItemId) -> SnapshotNode {
    let (caption, path, kind, member) = match store.get(id) {
        Some(node) => (
            node.caption().to_string(),
            node.path().to_path_buf(),
            node.kind(),
            node.is_member(),
        ),
        None => (String::new(), PathBuf::new(), NodeKind::Root, true),
    };
    let children = store
        .visible_children(id)
        .map(|child| child.id())
        .collect::<Vec<_>>()
        .into_iter()
        .map(|child| capture_node(store, child))
        .collect();
    SnapshotNode {
        id,
        caption,
        path,
        kind,
        member,
        children,
    }
}
