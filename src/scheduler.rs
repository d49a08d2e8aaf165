//! IdleScheduler
//!
//! Cooperative pump run on the interactive thread. Each host idle signal is
//! one [`tick`](IdleScheduler::tick): at most one merge slice or one queued
//! change, then control goes back to the host.

use crate::merge::{MergeProgress, MergeState, PathChange, TreeMerger};
use crate::project::{ClosingGuard, MembershipOracle};
use crate::tree::NodeStore;
use crate::watch::ChangeQueue;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// What the host should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Work remains; schedule another tick.
    MoreWork,
    /// Nothing queued and no merge in flight. The queue will wake the host
    /// when new work arrives.
    Idle,
    /// The tree is torn down; queued work was discarded.
    Closed,
}

pub struct IdleScheduler {
    queue: Arc<ChangeQueue>,
    merger: TreeMerger,
    merge: Option<MergeState>,
    merges_started: usize,
}

impl IdleScheduler {
    pub fn new(queue: Arc<ChangeQueue>, merger: TreeMerger) -> Self {
        Self {
            queue,
            merger,
            merge: None,
            merges_started: 0,
        }
    }

    pub fn merger(&self) -> &TreeMerger {
        &self.merger
    }

    pub fn is_merging(&self) -> bool {
        self.merge.is_some()
    }

    pub fn merge_state(&self) -> Option<&MergeState> {
        self.merge.as_ref()
    }

    /// Merges started since construction, full and partial.
    pub fn merges_started(&self) -> usize {
        self.merges_started
    }

    /// Replace any in-flight merge with a full one.
    pub fn start_full_merge(&mut self, store: &NodeStore) {
        if let Some(old) = self.merge.take() {
            debug!(scope = %old.scope(), remaining = old.remaining(), "Full rescan replaces in-flight merge");
        }
        self.begin(MergeState::for_root(store));
    }

    /// Drop the in-flight merge, if any.
    pub fn discard(&mut self) {
        self.merge = None;
    }

    pub fn tick(
        &mut self,
        store: &mut NodeStore,
        membership: &dyn MembershipOracle,
        guard: &dyn ClosingGuard,
    ) -> TickOutcome {
        if guard.is_closing() {
            self.merge = None;
            let dropped = self.queue.clear();
            debug!(dropped, "Tree closing, discarding queued work");
            return TickOutcome::Closed;
        }

        if self.queue.take_full_rescan() {
            self.start_full_merge(store);
        }

        if let Some(state) = self.merge.as_mut() {
            if self.merger.continue_merge(state, store, membership) == MergeProgress::MoreWork {
                return TickOutcome::MoreWork;
            }
            if let Some(done) = self.merge.take() {
                let stats = done.stats();
                info!(
                    full = done.is_full(),
                    directories = stats.directories,
                    added = stats.added,
                    removed = stats.removed,
                    "Reconciliation complete"
                );
            }
            return self.settle();
        }

        if let Some(record) = self.queue.try_dequeue() {
            trace!(path = %record.path.display(), kind = ?record.kind, "Applying change");
            match self.merger.apply_change(&record, store, membership) {
                PathChange::Merge(state) => self.begin(state),
                PathChange::FullRescan => self.start_full_merge(store),
                PathChange::Removed { item, count } => {
                    debug!(%item, count, path = %record.path.display(), "Removed");
                }
                PathChange::Added(item) => {
                    debug!(%item, path = %record.path.display(), "Added");
                }
                PathChange::Unchanged | PathChange::Ignored => {}
            }
        }
        self.settle()
    }

    fn begin(&mut self, state: MergeState) {
        self.merges_started += 1;
        debug!(scope = %state.scope(), full = state.is_full(), "Merge started");
        self.merge = Some(state);
    }

    fn settle(&self) -> TickOutcome {
        if self.merge.is_some() || !self.queue.is_empty() {
            return TickOutcome::MoreWork;
        }
        // A producer may have enqueued since the emptiness check; it then
        // skipped the wake-up, so keep draining.
        if self.queue.finish_drain() {
            TickOutcome::Idle
        } else {
            TickOutcome::MoreWork
        }
    }
}
