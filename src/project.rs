//! ProjectTree
//!
//! One tree instance: the store, the change intake, the idle scheduler, and
//! the deferred presentation actions, wired to the collaborators the host
//! provides (membership oracle, closing guard, confirmation prompt).

mod confirm;
mod membership;
mod snapshot;

pub use confirm::{ConfirmPrompt, ConfirmRequest, ConfirmResponse, FixedResponse};
pub use membership::{AllMembers, ClosingFlag, ClosingGuard, ManifestMembership, MembershipOracle};
pub use snapshot::{SnapshotNode, TreeSnapshot};

use crate::config::SyncConfig;
use crate::deferred::{DeferredAction, DeferredActionMap, DeferredState, Presenter};
use crate::error::{SyncError, TreeError};
use crate::merge::{EntryFilter, TreeMerger};
use crate::scheduler::{IdleScheduler, TickOutcome};
use crate::tree::{NodeKind, NodeStore, TracingObserver, TreeObserver};
use crate::types::ItemId;
use crate::watch::{ChangeQueue, ChangeWatcher, IdleWaker};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ProjectTree {
    store: NodeStore,
    queue: Arc<ChangeQueue>,
    watcher: Option<ChangeWatcher>,
    scheduler: IdleScheduler,
    deferred: DeferredActionMap,
    membership: Box<dyn MembershipOracle>,
    closing: ClosingFlag,
    closed: bool,
}

impl ProjectTree {
    /// Open a tree for the directory at `root`. The tree starts with only its
    /// root node; call [`request_full_rescan`](Self::request_full_rescan) or
    /// [`populate`](Self::populate) to fill it.
    pub fn open(
        root: &Path,
        config: &SyncConfig,
        membership: Box<dyn MembershipOracle>,
    ) -> Result<Self, SyncError> {
        let root = dunce::canonicalize(root).map_err(|source| TreeError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(TreeError::Io {
                path: root,
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            }
            .into());
        }

        let mut store = NodeStore::new(root.clone(), config.visibility);
        store.add_observer(Box::new(TracingObserver));
        let queue = Arc::new(ChangeQueue::new(
            config.queue.max_pending,
            config.watch.max_path_len,
        ));
        let merger = TreeMerger::new(
            EntryFilter::new(&root, &config.project),
            config.merge.dirs_per_slice,
        );
        info!(root = %root.display(), show_all_files = config.visibility.show_all_files, "Project tree opened");

        Ok(Self {
            store,
            scheduler: IdleScheduler::new(Arc::clone(&queue), merger),
            queue,
            watcher: None,
            deferred: DeferredActionMap::new(),
            membership,
            closing: ClosingFlag::new(),
            closed: false,
        })
    }

    pub fn root(&self) -> ItemId {
        self.store.root()
    }

    pub fn root_path(&self) -> &Path {
        self.store.root_path()
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn scheduler(&self) -> &IdleScheduler {
        &self.scheduler
    }

    pub fn add_observer(&mut self, observer: Box<dyn TreeObserver>) {
        self.store.add_observer(observer);
    }

    pub fn resolve(&self, path: &Path) -> Option<ItemId> {
        self.store.find_by_path(path)
    }

    pub fn resolve_id(&self, id: ItemId) -> Option<&Path> {
        self.store.path_of(id)
    }

    /// The queue notifier threads feed. Hosts without a watcher can enqueue
    /// records here directly.
    pub fn queue(&self) -> Arc<ChangeQueue> {
        Arc::clone(&self.queue)
    }

    /// A flag the host can set from anywhere to stop further processing.
    pub fn closing_guard(&self) -> ClosingFlag {
        self.closing.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start OS change notification for the whole root.
    pub fn attach_watcher(&mut self) -> Result<(), SyncError> {
        self.ensure_open()?;
        if self.watcher.is_some() {
            return Ok(());
        }
        let queue = Arc::clone(&self.queue);
        let watcher = ChangeWatcher::new(move |notification| queue.record_notification(notification))?;
        watcher.observe_folder(self.store.root_path(), true)?;
        info!(root = %self.store.root_path().display(), "Watching project root");
        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn watcher(&self) -> Option<&ChangeWatcher> {
        self.watcher.as_ref()
    }

    pub fn set_idle_waker(&self, waker: Arc<dyn IdleWaker>) {
        self.queue.set_waker(waker);
    }

    pub fn request_full_rescan(&self) {
        self.queue.request_full_rescan();
    }

    /// One host idle signal.
    pub fn on_idle(&mut self) -> TickOutcome {
        if self.closed {
            return TickOutcome::Closed;
        }
        let outcome = self
            .scheduler
            .tick(&mut self.store, self.membership.as_ref(), &self.closing);
        if outcome == TickOutcome::Closed {
            self.close();
            return outcome;
        }
        let store = &self.store;
        let dropped = self.deferred.retain_targets(|id| store.contains(id));
        if dropped > 0 {
            debug!(dropped, "Dropped deferred actions for removed items");
        }
        outcome
    }

    /// Tick until the scheduler reports idle (or closed). Returns the number
    /// of ticks.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ticks = 0;
        loop {
            ticks += 1;
            if self.on_idle() != TickOutcome::MoreWork {
                return ticks;
            }
        }
    }

    /// Full merge, driven to completion.
    pub fn populate(&mut self) -> usize {
        self.request_full_rescan();
        self.run_until_idle()
    }

    pub fn show_all_files(&self) -> bool {
        self.store.policy().show_all_files
    }

    pub fn set_show_all_files(&mut self, show_all_files: bool) {
        self.store.set_show_all_files(show_all_files);
    }

    /// Swap the membership oracle and re-query it for the whole tree.
    pub fn set_membership(&mut self, membership: Box<dyn MembershipOracle>) -> Result<usize, SyncError> {
        self.membership = membership;
        self.refresh_membership(self.store.root())
    }

    /// Re-query membership for the subtree at `id` and update member flags.
    /// Returns the number of nodes whose flag changed.
    pub fn refresh_membership(&mut self, id: ItemId) -> Result<usize, SyncError> {
        self.ensure_open()?;
        if !self.store.contains(id) {
            return Err(TreeError::NotFound(id).into());
        }

        let mut targets = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.store.get(cur) {
                if node.kind() != NodeKind::Root {
                    targets.push((cur, node.path().to_path_buf(), node.is_member()));
                }
            }
            let mut kids: Vec<ItemId> = self.store.children(cur).map(|n| n.id()).collect();
            kids.reverse();
            stack.extend(kids);
        }

        let mut changed = 0;
        for (target, path, was_member) in targets {
            let member = self.membership.is_member(&path);
            if member != was_member {
                self.store.set_member(target, member)?;
                changed += 1;
            }
        }
        debug!(item = %id, changed, "Membership refreshed");
        Ok(changed)
    }

    /// Delete the item at `id` from disk after the user confirms, then drop
    /// it from the tree. Returns the number of nodes removed.
    pub fn delete_from_disk(&mut self, id: ItemId, prompt: &dyn ConfirmPrompt) -> Result<usize, SyncError> {
        self.ensure_open()?;
        if id == self.store.root() {
            return Err(TreeError::RootRemoval.into());
        }
        let node = self.store.get(id).ok_or(TreeError::NotFound(id))?;
        let request = ConfirmRequest {
            item: id,
            path: node.path().to_path_buf(),
            kind: node.kind(),
            descendants: self.store.descendant_count(id),
        };
        if prompt.confirm(&request) == ConfirmResponse::Declined {
            info!(path = %request.path.display(), "Delete declined");
            return Err(SyncError::Cancelled);
        }

        let path = request.path;
        if let Some(watcher) = &self.watcher {
            watcher.ignore_path(&path, true);
        }
        let result = if request.kind == NodeKind::Folder {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Some(watcher) = &self.watcher {
            watcher.ignore_path(&path, false);
        }
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Already gone from disk");
            }
            Err(source) => return Err(TreeError::Io { path, source }.into()),
        }

        let removed = self.store.remove_subtree(id)?;
        let store = &self.store;
        self.deferred.retain_targets(|target| store.contains(target));
        info!(path = %path.display(), removed, "Deleted from disk");
        Ok(removed)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot::capture(&self.store)
    }

    pub fn bind_presenter(&mut self, presenter: Box<dyn Presenter>) -> usize {
        self.deferred.bind(presenter)
    }

    /// Apply `action` to `id` now, or once the presenter has materialized it.
    pub fn defer_action(&mut self, id: ItemId, action: DeferredAction) -> Result<DeferredState, SyncError> {
        self.ensure_open()?;
        if !self.store.contains(id) {
            return Err(TreeError::NotFound(id).into());
        }
        Ok(self.deferred.defer(id, action))
    }

    pub fn deferred_state(&self, id: ItemId) -> Option<DeferredState> {
        self.deferred.state_of(id)
    }

    /// The presenter materialized `id`.
    pub fn notify_materialized(&mut self, id: ItemId) -> usize {
        self.deferred.on_item_materialized(id)
    }

    /// The whole project was attached to its container; resolve every
    /// pending action.
    pub fn notify_attached(&mut self) -> usize {
        self.deferred.on_batch_materialized()
    }

    /// Tear the tree down: stop observing, discard queued work and any
    /// in-flight merge, and clear the store. Later ticks return `Closed`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closing.set_closing();
        if let Some(watcher) = self.watcher.take() {
            watcher.stop_all();
        }
        self.queue.clear_waker();
        let dropped = self.queue.clear();
        self.scheduler.discard();
        self.store.clear();
        self.deferred.retain_targets(|_| false);
        self.closed = true;
        info!(dropped, "Project tree closed");
    }

    fn ensure_open(&self) -> Result<(), SyncError> {
        if self.closed || self.closing.is_closing() {
            Err(SyncError::Closed)
        } else {
            Ok(())
        }
    }
}
