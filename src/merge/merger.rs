//! TreeMerger
//!
//! Reconciles NodeStore subtrees against the directories they model. One
//! directory level is an atomic step; recursion goes through the work-list in
//! [`MergeState`], consumed a bounded number of directories per
//! [`continue_merge`](TreeMerger::continue_merge) call.

use crate::merge::listing::{DirectoryListing, EntryFilter, ListedEntry};
use crate::merge::state::{resolve, MergeState, WorkItem};
use crate::project::MembershipOracle;
use crate::tree::{Node, NodeKind, NodeStore, SortKey};
use crate::types::ItemId;
use crate::watch::{ChangeKind, ChangeRecord};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Result of one `continue_merge` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeProgress {
    MoreWork,
    Finished,
}

/// What applying a single change record did.
#[derive(Debug)]
pub enum PathChange {
    /// Outside the tree, or malformed.
    Ignored,
    /// The tree already matched the disk.
    Unchanged,
    Removed { item: ItemId, count: usize },
    Added(ItemId),
    /// The change needs a partial merge (new directory, or an unmodeled parent).
    Merge(MergeState),
    /// The change needs a full merge.
    FullRescan,
}

pub struct TreeMerger {
    filter: EntryFilter,
    dirs_per_slice: usize,
}

/// A child of the directory being reconciled, detached from the store borrow.
struct Existing {
    id: ItemId,
    key: SortKey,
    kind: NodeKind,
    path: PathBuf,
}

impl TreeMerger {
    pub fn new(filter: EntryFilter, dirs_per_slice: usize) -> Self {
        Self {
            filter,
            dirs_per_slice: dirs_per_slice.max(1),
        }
    }

    pub fn filter(&self) -> &EntryFilter {
        &self.filter
    }

    pub fn dirs_per_slice(&self) -> usize {
        self.dirs_per_slice
    }

    /// Reconcile up to `dirs_per_slice` directories from the work-list.
    pub fn continue_merge(
        &self,
        state: &mut MergeState,
        store: &mut NodeStore,
        membership: &dyn MembershipOracle,
    ) -> MergeProgress {
        let mut processed = 0;
        while processed < self.dirs_per_slice {
            let Some(item) = state.next_work() else {
                break;
            };
            if !is_current(store, &item) {
                trace!(item = %item.node, path = %item.path.display(), "Skipping stale work item");
                continue;
            }
            self.reconcile_directory(item, state, store, membership);
            processed += 1;
        }

        if state.is_exhausted() {
            let stats = state.stats();
            debug!(
                scope = %state.scope(),
                directories = stats.directories,
                added = stats.added,
                removed = stats.removed,
                "Merge finished"
            );
            MergeProgress::Finished
        } else {
            trace!(remaining = state.remaining(), "Merge slice done");
            MergeProgress::MoreWork
        }
    }

    /// Drive `state` until its work-list is exhausted. Returns the number of
    /// slices it took.
    pub fn merge_to_completion(
        &self,
        state: &mut MergeState,
        store: &mut NodeStore,
        membership: &dyn MembershipOracle,
    ) -> usize {
        let mut slices = 1;
        while self.continue_merge(state, store, membership) == MergeProgress::MoreWork {
            slices += 1;
        }
        slices
    }

    /// One directory level: list, filter, then a two-pointer scan against the
    /// existing children, which share the listing's order.
    fn reconcile_directory(
        &self,
        item: WorkItem,
        state: &mut MergeState,
        store: &mut NodeStore,
        membership: &dyn MembershipOracle,
    ) {
        let mut live = DirectoryListing::read(&item.path, &self.filter);
        let mut targets: Vec<Option<PathBuf>> = Vec::with_capacity(live.len());
        live.retain(|entry| {
            let target = link_target(entry);
            if let Some(target) = &target {
                if item.is_cycle(target) {
                    debug!(path = %entry.path.display(), target = %target.display(), "Skipping symlink cycle");
                    state.stats_mut().cycles_skipped += 1;
                    return false;
                }
            }
            targets.push(target);
            true
        });

        let existing: Vec<Existing> = store
            .children(item.node)
            .map(|n| Existing {
                id: n.id(),
                key: n.sort_key().clone(),
                kind: n.kind(),
                path: n.path().to_path_buf(),
            })
            .collect();

        // Plan the level first: stale children must leave the store before
        // anything is created, since an entry that changed kind keeps its path.
        let mut stale: Vec<ItemId> = Vec::new();
        let mut fresh: Vec<usize> = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < existing.len() || j < live.len() {
            let order = match (existing.get(i), live.get(j)) {
                (Some(child), Some(entry)) => child.key.display_cmp(&entry.key),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };
            match order {
                Ordering::Less => {
                    stale.push(existing[i].id);
                    i += 1;
                }
                Ordering::Greater => {
                    fresh.push(j);
                    j += 1;
                }
                Ordering::Equal => {
                    let child = &existing[i];
                    if child.kind == NodeKind::Folder {
                        state.push_work(item.child(child.id, child.path.clone(), targets[j].clone()));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        let mut removed = 0;
        for id in stale {
            match store.remove_subtree(id) {
                Ok(count) => removed += count,
                Err(e) => warn!(item = %id, error = %e, "Failed to remove stale node"),
            }
        }

        let mut added = 0usize;
        for j in fresh {
            let entry = &live[j];
            if let Some(id) = self.create(item.node, entry, store, membership) {
                added += 1;
                if entry.is_dir {
                    state.push_work(item.child(id, entry.path.clone(), targets[j].clone()));
                }
            }
        }
        if added > 0 {
            store.notify_items_appended(item.node);
        }

        let stats = state.stats_mut();
        stats.directories += 1;
        stats.added += added;
        stats.removed += removed;
        trace!(path = %item.path.display(), added, removed, "Directory reconciled");
    }

    fn create(
        &self,
        parent: ItemId,
        entry: &ListedEntry,
        store: &mut NodeStore,
        membership: &dyn MembershipOracle,
    ) -> Option<ItemId> {
        let member = membership.is_member(&entry.path);
        let node = if entry.is_dir {
            Node::folder(entry.path.clone(), member)
        } else {
            Node::file(entry.path.clone(), member)
        };
        match store.add_child(parent, node) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(path = %entry.path.display(), error = %e, "Failed to add node");
                None
            }
        }
    }

    /// Apply one change record directly: re-stat the path and make the tree
    /// agree with what is there now.
    pub fn apply_change(
        &self,
        record: &ChangeRecord,
        store: &mut NodeStore,
        membership: &dyn MembershipOracle,
    ) -> PathChange {
        if record.kind == ChangeKind::FullRescan {
            return PathChange::FullRescan;
        }
        let path = record.path.as_path();
        let root = store.root_path();
        if path == root {
            return PathChange::FullRescan;
        }
        if !path.starts_with(root) {
            trace!(path = %path.display(), "Change outside the project root");
            return PathChange::Ignored;
        }

        let modeled = store.find_by_path(path);
        let live = self.filter.probe(path);
        match (modeled, live) {
            (None, None) => PathChange::Unchanged,
            (Some(id), None) => self.remove(store, id),
            (Some(id), Some(entry)) => {
                let kind = store.get(id).map(|n| n.kind());
                if kind == Some(entry.kind()) {
                    return PathChange::Unchanged;
                }
                debug!(path = %path.display(), "Entry changed kind, recreating");
                if let PathChange::Removed { .. } = self.remove(store, id) {
                    self.insert(entry, store, membership)
                } else {
                    PathChange::Unchanged
                }
            }
            (None, Some(entry)) => self.insert(entry, store, membership),
        }
    }

    fn remove(&self, store: &mut NodeStore, id: ItemId) -> PathChange {
        match store.remove_subtree(id) {
            Ok(count) => PathChange::Removed { item: id, count },
            Err(e) => {
                warn!(item = %id, error = %e, "Failed to remove node");
                PathChange::Unchanged
            }
        }
    }

    /// Model a live entry that the tree does not have yet.
    fn insert(
        &self,
        entry: ListedEntry,
        store: &mut NodeStore,
        membership: &dyn MembershipOracle,
    ) -> PathChange {
        let parent_path = entry.path.parent().unwrap_or_else(|| Path::new(""));
        let parent = store
            .find_by_path(parent_path)
            .filter(|id| store.get(*id).map(|n| n.kind().is_container()).unwrap_or(false));
        let Some(parent) = parent else {
            // Parent not modeled yet: reconcile from the nearest modeled folder.
            let anchor = nearest_modeled_folder(store, parent_path);
            if !self.reachable_from(store, anchor, &entry.path) {
                trace!(path = %entry.path.display(), "Change under an excluded directory");
                return PathChange::Ignored;
            }
            debug!(path = %entry.path.display(), anchor = %anchor, "Promoting change to partial merge");
            return PathChange::Merge(MergeState::for_subtree(store, anchor));
        };

        if let Some(target) = link_target(&entry) {
            let Some(parent_item) = WorkItem::for_node(store, parent) else {
                return PathChange::Unchanged;
            };
            if parent_item.is_cycle(&target) {
                debug!(path = %entry.path.display(), target = %target.display(), "Skipping symlink cycle");
                return PathChange::Ignored;
            }
        }

        match self.create(parent, &entry, store, membership) {
            Some(id) if entry.is_dir => PathChange::Merge(MergeState::for_subtree(store, id)),
            Some(id) => PathChange::Added(id),
            None => PathChange::Unchanged,
        }
    }

    /// Whether a merge of `anchor` would descend to `path`: every entry in
    /// between must be listed and must not close a symlink cycle.
    fn reachable_from(&self, store: &NodeStore, anchor: ItemId, path: &Path) -> bool {
        let Some(mut work) = WorkItem::for_node(store, anchor) else {
            return false;
        };
        let anchor_path = work.path.clone();
        let mut between: Vec<&Path> = path.ancestors().take_while(|a| *a != anchor_path.as_path()).collect();
        between.reverse();
        for dir in between {
            let Some(entry) = self.filter.probe(dir) else {
                return false;
            };
            let target = link_target(&entry);
            if target.as_ref().is_some_and(|t| work.is_cycle(t)) {
                return false;
            }
            if dir == path {
                break;
            }
            if !entry.is_dir {
                return false;
            }
            work = work.child(ItemId::NIL, dir.to_path_buf(), target);
        }
        true
    }
}

/// Resolved location of a directory link, `None` for anything else.
fn link_target(entry: &ListedEntry) -> Option<PathBuf> {
    if entry.is_link && entry.is_dir {
        Some(resolve(&entry.path))
    } else {
        None
    }
}

/// A work item is stale once its node is gone or no longer models that path.
fn is_current(store: &NodeStore, item: &WorkItem) -> bool {
    store
        .get(item.node)
        .map(|n| n.path() == item.path && n.kind().is_container())
        .unwrap_or(false)
}

fn nearest_modeled_folder(store: &NodeStore, path: &Path) -> ItemId {
    path.ancestors()
        .filter_map(|a| store.find_by_path(a))
        .find(|id| store.get(*id).map(|n| n.kind().is_container()).unwrap_or(false))
        .unwrap_or(ItemId::ROOT)
}
