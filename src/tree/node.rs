//! Project tree node representation

use crate::tree::order::SortKey;
use crate::types::{sort_priority, ItemId};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Node kind tag.
///
/// Whether a file or folder is a declared project member is tracked separately
/// by [`Node::is_member`]; a non-member node is a disk-discovered entry that
/// persisted project metadata does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Folder,
    File,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Folder)
    }

    pub fn default_priority(self) -> i32 {
        match self {
            NodeKind::Root => sort_priority::ROOT,
            NodeKind::Folder => sort_priority::FOLDER,
            NodeKind::File => sort_priority::FILE,
        }
    }
}

/// One file, folder, or the project root.
///
/// Structural links are identities into the owning [`NodeStore`](crate::tree::NodeStore):
/// each level is an intrusive singly linked list (`first_child` / `next_sibling`)
/// with `last_child` cached for the sorted-append fast path.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: ItemId,
    pub(crate) path: PathBuf,
    pub(crate) key: SortKey,
    pub(crate) kind: NodeKind,
    pub(crate) member: bool,
    pub(crate) visible: bool,
    pub(crate) parent: Option<ItemId>,
    pub(crate) first_child: Option<ItemId>,
    pub(crate) last_child: Option<ItemId>,
    pub(crate) next_sibling: Option<ItemId>,
}

impl Node {
    fn new(path: PathBuf, kind: NodeKind, member: bool) -> Self {
        let caption = caption_for(&path);
        Self {
            id: ItemId::NIL,
            key: SortKey::new(kind.default_priority(), caption),
            path,
            kind,
            member,
            visible: true,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
        }
    }

    pub fn root(path: PathBuf) -> Self {
        Self::new(path, NodeKind::Root, true)
    }

    pub fn folder(path: PathBuf, member: bool) -> Self {
        Self::new(path, NodeKind::Folder, member)
    }

    pub fn file(path: PathBuf, member: bool) -> Self {
        Self::new(path, NodeKind::File, member)
    }

    /// Override the sort-priority class derived from the node kind.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.key = SortKey::new(priority, self.key.caption().to_string());
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn caption(&self) -> &str {
        self.key.caption()
    }

    pub fn sort_priority(&self) -> i32 {
        self.key.priority()
    }

    pub fn sort_key(&self) -> &SortKey {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_member(&self) -> bool {
        self.member
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<ItemId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<ItemId> {
        self.next_sibling
    }
}

fn caption_for(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}
