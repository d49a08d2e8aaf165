//! MergeState: the externalised work-list of one in-flight reconciliation.

use crate::tree::NodeStore;
use crate::types::ItemId;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// A directory still to be reconciled.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub node: ItemId,
    pub path: PathBuf,
    /// Resolved location of `path` on disk.
    pub canonical: PathBuf,
    /// Resolved locations of the directories a link was followed from on the
    /// way down to `path`.
    pub link_ancestry: Vec<PathBuf>,
}

impl WorkItem {
    /// Work item for a node already in the store.
    ///
    /// Every ancestor between the root and `node` is resolved, so the cycle
    /// check sees links crossed before this subtree was reached.
    pub fn for_node(store: &NodeStore, node: ItemId) -> Option<Self> {
        let path = store.path_of(node)?.to_path_buf();
        let root = store.root_path();
        let link_ancestry = path
            .ancestors()
            .skip(1)
            .take_while(|a| a.starts_with(root))
            .map(resolve)
            .collect();
        Some(Self {
            node,
            canonical: resolve(&path),
            path,
            link_ancestry,
        })
    }

    /// Whether descending into a directory resolving to `target` re-enters
    /// this directory or one of the directories it was reached through.
    pub fn is_cycle(&self, target: &Path) -> bool {
        self.canonical.starts_with(target) || self.link_ancestry.iter().any(|a| a.starts_with(target))
    }

    /// Work item for a child directory that matched the listing.
    ///
    /// `target` is the resolved location when the child is a link.
    pub fn child(&self, node: ItemId, path: PathBuf, target: Option<PathBuf>) -> Self {
        match target {
            Some(target) => {
                let mut link_ancestry = self.link_ancestry.clone();
                link_ancestry.push(self.canonical.clone());
                Self {
                    node,
                    path,
                    canonical: target,
                    link_ancestry,
                }
            }
            None => {
                let name = path.file_name().map(Path::new).unwrap_or_else(|| Path::new(""));
                Self {
                    node,
                    canonical: self.canonical.join(name),
                    path,
                    link_ancestry: self.link_ancestry.clone(),
                }
            }
        }
    }
}

/// Resolve `path` through the OS, keeping it as-is when that fails.
pub(crate) fn resolve(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Running totals for one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub directories: usize,
    pub added: usize,
    pub removed: usize,
    pub cycles_skipped: usize,
}

impl MergeStats {
    /// Structural operations performed so far.
    pub fn operations(&self) -> usize {
        self.added + self.removed
    }
}

/// Work-list of directories remaining to visit, resumable across calls to
/// [`TreeMerger::continue_merge`](crate::merge::TreeMerger::continue_merge).
///
/// A state is discarded and recreated rather than paused: a full rescan that
/// arrives mid-flight replaces it with a fresh root state.
#[derive(Debug)]
pub struct MergeState {
    scope: ItemId,
    work: VecDeque<WorkItem>,
    stats: MergeStats,
}

impl MergeState {
    /// Full reconciliation of the whole tree.
    pub fn for_root(store: &NodeStore) -> Self {
        Self::for_subtree(store, store.root())
    }

    /// Partial reconciliation of the subtree at `node`.
    ///
    /// A node that is gone from the store yields an already finished state.
    pub fn for_subtree(store: &NodeStore, node: ItemId) -> Self {
        let work = WorkItem::for_node(store, node).into_iter().collect();
        Self {
            scope: node,
            work,
            stats: MergeStats::default(),
        }
    }

    pub fn scope(&self) -> ItemId {
        self.scope
    }

    pub fn is_full(&self) -> bool {
        self.scope == ItemId::ROOT
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    pub fn remaining(&self) -> usize {
        self.work.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.work.is_empty()
    }

    pub(crate) fn next_work(&mut self) -> Option<WorkItem> {
        self.work.pop_front()
    }

    pub(crate) fn push_work(&mut self, item: WorkItem) {
        self.work.push_back(item);
    }

    pub(crate) fn stats_mut(&mut self) -> &mut MergeStats {
        &mut self.stats
    }
}
