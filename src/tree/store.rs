//! NodeStore
//!
//! Owns every node of one project tree, the identity map, and the path index.
//! Structural links are identities, never references, and every mutation goes
//! through this type so both indexes stay a bijection with the live node set.
//!
//! The store is single-writer: mutations must happen on the thread that
//! created it (the interactive thread).

use crate::error::TreeError;
use crate::tree::node::{Node, NodeKind};
use crate::tree::observer::TreeObserver;
use crate::tree::order::SortKey;
use crate::tree::visibility::VisibilityPolicy;
use crate::types::ItemId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread::{self, ThreadId};
use tracing::trace;

pub struct NodeStore {
    /// Identity map: ItemId -> node
    nodes: HashMap<ItemId, Node>,
    /// Path index: absolute path -> ItemId
    by_path: HashMap<PathBuf, ItemId>,
    next_id: u32,
    policy: VisibilityPolicy,
    observers: Vec<Box<dyn TreeObserver>>,
    writer: ThreadId,
}

impl NodeStore {
    /// Create a store holding only the root node for `root_path`.
    pub fn new(root_path: PathBuf, policy: VisibilityPolicy) -> Self {
        let mut root = Node::root(root_path.clone());
        root.id = ItemId::ROOT;

        let mut nodes = HashMap::new();
        nodes.insert(ItemId::ROOT, root);
        let mut by_path = HashMap::new();
        by_path.insert(root_path, ItemId::ROOT);

        Self {
            nodes,
            by_path,
            next_id: ItemId::ROOT.0 + 1,
            policy,
            observers: Vec::new(),
            writer: thread::current().id(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn TreeObserver>) {
        self.observers.push(observer);
    }

    pub fn root(&self) -> ItemId {
        ItemId::ROOT
    }

    pub fn root_path(&self) -> &Path {
        // The root is never removed from the maps.
        self.nodes
            .get(&ItemId::ROOT)
            .map(|n| n.path.as_path())
            .unwrap_or_else(|| Path::new(""))
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    /// O(1) identity lookup. `NIL` and stale identities resolve to `None`.
    pub fn resolve_identity(&self, id: ItemId) -> Option<&Node> {
        if id.is_nil() {
            return None;
        }
        self.nodes.get(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Node> {
        self.resolve_identity(id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.resolve_identity(id).is_some()
    }

    /// O(1) path lookup.
    pub fn find_by_path(&self, path: &Path) -> Option<ItemId> {
        self.by_path.get(path).copied()
    }

    pub fn path_of(&self, id: ItemId) -> Option<&Path> {
        self.resolve_identity(id).map(|n| n.path.as_path())
    }

    /// Children of `id` in display order, visible or not.
    pub fn children(&self, id: ItemId) -> Children<'_> {
        Children {
            store: self,
            next: self.nodes.get(&id).and_then(|n| n.first_child),
        }
    }

    pub fn visible_children(&self, id: ItemId) -> impl Iterator<Item = &Node> + '_ {
        self.children(id).filter(|n| n.visible)
    }

    /// Whether `id` is visible and so is every ancestor.
    pub fn is_displayed(&self, id: ItemId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            match self.nodes.get(&cur) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Displayed nodes in pre-order, starting below `id`.
    pub fn visible_descendants(&self, id: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut stack: Vec<ItemId> = self.visible_children(id).map(|n| n.id).collect();
        stack.reverse();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            let mut kids: Vec<ItemId> = self.visible_children(cur).map(|n| n.id).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Nodes below `id`, visible or not.
    pub fn descendant_count(&self, id: ItemId) -> usize {
        let mut count = 0;
        let mut stack: Vec<ItemId> = self.children(id).map(|n| n.id).collect();
        while let Some(cur) = stack.pop() {
            count += 1;
            stack.extend(self.children(cur).map(|n| n.id));
        }
        count
    }

    /// Insert `node` under `parent`, preserving sibling order.
    ///
    /// The current last child is compared first, so children arriving already
    /// sorted append in O(1). Returns the new identity. A path that is already
    /// modeled is rejected with [`TreeError::DuplicatePath`].
    pub fn add_child(&mut self, parent: ItemId, mut node: Node) -> Result<ItemId, TreeError> {
        self.assert_writer();

        let parent_node = self.nodes.get(&parent).ok_or(TreeError::NotFound(parent))?;
        if !parent_node.kind.is_container() {
            return Err(TreeError::NotAFolder(parent));
        }
        if let Some(existing) = self.by_path.get(&node.path) {
            return Err(TreeError::DuplicatePath {
                path: node.path.clone(),
                existing: *existing,
            });
        }

        let previous = self.insertion_point(parent, &node.key);

        let id = ItemId(self.next_id);
        self.next_id += 1;
        node.id = id;
        node.parent = Some(parent);
        node.visible = self.policy.is_visible(node.kind, node.member);

        let next = match previous {
            Some(prev) => self.nodes.get(&prev).and_then(|n| n.next_sibling),
            None => self.nodes.get(&parent).and_then(|n| n.first_child),
        };
        node.next_sibling = next;

        let visible = node.visible;
        self.by_path.insert(node.path.clone(), id);
        self.nodes.insert(id, node);

        match previous {
            Some(prev) => {
                if let Some(prev_node) = self.nodes.get_mut(&prev) {
                    prev_node.next_sibling = Some(id);
                }
            }
            None => {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.first_child = Some(id);
                }
            }
        }
        if next.is_none() {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.last_child = Some(id);
            }
        }

        trace!(item = %id, %parent, "Node added");

        if visible && self.is_displayed(parent) {
            let previous_visible = match previous {
                Some(prev) if self.nodes.get(&prev).map(|n| n.visible).unwrap_or(false) => prev,
                None => ItemId::NIL,
                Some(_) => self.previous_visible_sibling(id),
            };
            for observer in &self.observers {
                observer.on_item_added(parent, previous_visible, id);
            }
        }

        Ok(id)
    }

    /// The sibling after which a node with `key` belongs, or `None` for the head.
    fn insertion_point(&self, parent: ItemId, key: &SortKey) -> Option<ItemId> {
        let parent_node = self.nodes.get(&parent)?;
        let last = parent_node.last_child?;
        if let Some(last_node) = self.nodes.get(&last) {
            if last_node.key.display_cmp(key) != Ordering::Greater {
                return Some(last);
            }
        }

        let mut previous = None;
        let mut current = parent_node.first_child;
        while let Some(cur) = current {
            let Some(cur_node) = self.nodes.get(&cur) else {
                break;
            };
            if key.display_cmp(&cur_node.key) == Ordering::Less {
                break;
            }
            previous = Some(cur);
            current = cur_node.next_sibling;
        }
        previous
    }

    /// Immediately preceding visible sibling of `id`, or `NIL`.
    pub fn previous_visible_sibling(&self, id: ItemId) -> ItemId {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return ItemId::NIL;
        };
        let mut last_visible = ItemId::NIL;
        for sibling in self.children(parent) {
            if sibling.id == id {
                break;
            }
            if sibling.visible {
                last_visible = sibling.id;
            }
        }
        last_visible
    }

    /// Remove `id` and all its descendants, children first.
    ///
    /// Every removed node leaves both indexes in the same step. Calling this on
    /// an identity that is no longer in the tree is a no-op returning 0.
    pub fn remove_subtree(&mut self, id: ItemId) -> Result<usize, TreeError> {
        self.assert_writer();

        if id == ItemId::ROOT {
            return Err(TreeError::RootRemoval);
        }
        let Some(node) = self.nodes.get(&id) else {
            return Ok(0);
        };
        let parent = node.parent;
        let displayed = self.is_displayed(id);

        // Pre-order walk; reversed it lists every node after its descendants.
        let mut order: Vec<(ItemId, bool)> = Vec::new();
        let mut stack = vec![(id, displayed)];
        while let Some((cur, shown)) = stack.pop() {
            order.push((cur, shown));
            for child in self.children(cur) {
                stack.push((child.id, shown && child.visible));
            }
        }

        if let Some(parent) = parent {
            self.unlink(parent, id);
        }

        for (cur, _) in order.iter().rev() {
            if let Some(removed) = self.nodes.remove(cur) {
                self.by_path.remove(&removed.path);
            }
        }

        for (cur, shown) in order.iter().rev() {
            if *shown {
                for observer in &self.observers {
                    observer.on_item_removed(*cur);
                }
            }
        }

        trace!(item = %id, removed = order.len(), "Subtree removed");
        Ok(order.len())
    }

    /// Detach `id` from the sibling list of `parent`.
    fn unlink(&mut self, parent: ItemId, id: ItemId) {
        let next = self.nodes.get(&id).and_then(|n| n.next_sibling);

        let mut previous = None;
        let mut current = self.nodes.get(&parent).and_then(|n| n.first_child);
        while let Some(cur) = current {
            if cur == id {
                break;
            }
            previous = Some(cur);
            current = self.nodes.get(&cur).and_then(|n| n.next_sibling);
        }
        if current.is_none() {
            return;
        }

        match previous {
            Some(prev) => {
                if let Some(prev_node) = self.nodes.get_mut(&prev) {
                    prev_node.next_sibling = next;
                }
            }
            None => {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.first_child = next;
                }
            }
        }
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            if parent_node.last_child == Some(id) {
                parent_node.last_child = previous;
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.next_sibling = None;
            node.parent = None;
        }
    }

    /// Drop every node below the root and tell observers to re-fetch.
    pub fn clear(&mut self) {
        self.assert_writer();
        let root_path = self.root_path().to_path_buf();
        self.nodes.retain(|id, _| *id == ItemId::ROOT);
        self.by_path.clear();
        self.by_path.insert(root_path, ItemId::ROOT);
        if let Some(root) = self.nodes.get_mut(&ItemId::ROOT) {
            root.first_child = None;
            root.last_child = None;
        }
        for observer in &self.observers {
            observer.on_invalidate(ItemId::ROOT);
        }
    }

    /// Switch the "show all files" policy and reveal or hide non-member nodes.
    pub fn set_show_all_files(&mut self, show_all_files: bool) {
        self.assert_writer();
        if self.policy.show_all_files == show_all_files {
            return;
        }
        self.policy.show_all_files = show_all_files;
        let policy = self.policy;
        self.apply_visibility(ItemId::ROOT, |node| policy.is_visible(node.kind, node.member));
    }

    /// Update the member flag of `id` and adjust its visibility.
    pub fn set_member(&mut self, id: ItemId, member: bool) -> Result<(), TreeError> {
        self.assert_writer();
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        if node.kind == NodeKind::Root || node.member == member {
            return Ok(());
        }
        node.member = member;
        let policy = self.policy;
        let parent = node.parent.unwrap_or(ItemId::ROOT);
        self.apply_visibility_to(parent, &[id], |n| policy.is_visible(n.kind, n.member));
        Ok(())
    }

    /// Recompute visibility flags below `scope` and fire add/remove
    /// notifications for every node whose displayed state changed.
    fn apply_visibility<F>(&mut self, scope: ItemId, visible: F)
    where
        F: Fn(&Node) -> bool,
    {
        let tops: Vec<ItemId> = self.children(scope).map(|n| n.id).collect();
        self.apply_visibility_to(scope, &tops, visible);
    }

    fn apply_visibility_to<F>(&mut self, parent: ItemId, tops: &[ItemId], visible: F)
    where
        F: Fn(&Node) -> bool,
    {
        let parent_displayed = self.is_displayed(parent);

        // (id, displayed before, displayed after), pre-order.
        let mut changes: Vec<(ItemId, bool, bool)> = Vec::new();
        let mut stack: Vec<(ItemId, bool, bool)> = tops
            .iter()
            .rev()
            .map(|id| (*id, parent_displayed, parent_displayed))
            .collect();
        while let Some((cur, parent_before, parent_after)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&cur) else {
                continue;
            };
            let before = parent_before && node.visible;
            node.visible = visible(&*node);
            let after = parent_after && node.visible;
            changes.push((cur, before, after));

            let mut kids: Vec<ItemId> = self.children(cur).map(|n| n.id).collect();
            kids.reverse();
            stack.extend(kids.into_iter().map(|k| (k, before, after)));
        }

        for (cur, before, after) in changes.iter().rev() {
            if *before && !*after {
                for observer in &self.observers {
                    observer.on_item_removed(*cur);
                }
            }
        }
        for (cur, before, after) in &changes {
            if !*before && *after {
                let parent = self
                    .nodes
                    .get(cur)
                    .and_then(|n| n.parent)
                    .unwrap_or(ItemId::ROOT);
                let previous_visible = self.previous_visible_sibling(*cur);
                for observer in &self.observers {
                    observer.on_item_added(parent, previous_visible, *cur);
                }
            }
        }
    }

    pub fn notify_items_appended(&self, parent: ItemId) {
        if self.is_displayed(parent) {
            for observer in &self.observers {
                observer.on_items_appended(parent);
            }
        }
    }

    pub fn notify_invalidate(&self, parent: ItemId) {
        for observer in &self.observers {
            observer.on_invalidate(parent);
        }
    }

    fn assert_writer(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.writer,
            "NodeStore mutated off the interactive thread"
        );
    }
}

/// Iterator over one sibling list.
pub struct Children<'a> {
    store: &'a NodeStore,
    next: Option<ItemId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.store.nodes.get(&id)?;
        self.next = node.next_sibling;
        Some(node)
    }
}
