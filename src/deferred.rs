//! DeferredActionMap
//!
//! Holds presentation actions aimed at nodes the presentation layer has not
//! materialized yet, and replays them in FIFO order once it has.

use crate::types::ItemId;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// Opaque handle a presenter uses for one materialized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresentationHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum DeferredAction {
    Expand,
    Collapse,
    Select,
    SetDecoration(String),
}

/// State of the actions targeting one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    /// No presenter is bound, so nothing can be resolved yet.
    Unbound,
    /// A presenter is bound but has not materialized the node.
    Pending,
    Applied,
}

/// The presentation layer, as seen from the core.
pub trait Presenter {
    /// Handle for `id`, or `None` while the node is not materialized.
    fn handle_for(&self, id: ItemId) -> Option<PresentationHandle>;

    fn apply(&mut self, handle: PresentationHandle, action: &DeferredAction);
}

#[derive(Default)]
pub struct DeferredActionMap {
    presenter: Option<Box<dyn Presenter>>,
    pending: VecDeque<(ItemId, DeferredAction)>,
    applied: HashSet<ItemId>,
}

impl DeferredActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.presenter.is_some()
    }

    /// Wire up the presenter and replay whatever it can already resolve.
    pub fn bind(&mut self, presenter: Box<dyn Presenter>) -> usize {
        self.presenter = Some(presenter);
        self.resolve(|_| true)
    }

    pub fn unbind(&mut self) -> Option<Box<dyn Presenter>> {
        self.presenter.take()
    }

    /// Apply `action` to `id` now if possible, otherwise hold it.
    ///
    /// An action never overtakes earlier actions still held for the same
    /// target.
    pub fn defer(&mut self, id: ItemId, action: DeferredAction) -> DeferredState {
        let blocked = self.pending.iter().any(|(target, _)| *target == id);
        if !blocked {
            if let Some(presenter) = self.presenter.as_mut() {
                if let Some(handle) = presenter.handle_for(id) {
                    presenter.apply(handle, &action);
                    self.applied.insert(id);
                    return DeferredState::Applied;
                }
            }
        }
        trace!(item = %id, ?action, "Deferring action");
        self.pending.push_back((id, action));
        self.blocked_state()
    }

    /// The presenter materialized `id`; replay its actions.
    pub fn on_item_materialized(&mut self, id: ItemId) -> usize {
        self.resolve(|target| target == id)
    }

    /// Batch materialization (e.g. the whole project was attached): try every
    /// pending target, not just one.
    pub fn on_batch_materialized(&mut self) -> usize {
        let applied = self.resolve(|_| true);
        if !self.pending.is_empty() {
            debug!(remaining = self.pending.len(), "Deferred actions still unresolved after batch");
        }
        applied
    }

    /// Forget everything held for `id`; used when the node leaves the tree.
    pub fn discard(&mut self, id: ItemId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|(target, _)| *target != id);
        self.applied.remove(&id);
        before - self.pending.len()
    }

    /// Forget actions whose target no longer satisfies `is_live`.
    pub fn retain_targets<F>(&mut self, is_live: F) -> usize
    where
        F: Fn(ItemId) -> bool,
    {
        let before = self.pending.len();
        self.pending.retain(|(target, _)| is_live(*target));
        self.applied.retain(|target| is_live(*target));
        before - self.pending.len()
    }

    pub fn state_of(&self, id: ItemId) -> Option<DeferredState> {
        if self.pending.iter().any(|(target, _)| *target == id) {
            Some(self.blocked_state())
        } else if self.applied.contains(&id) {
            Some(DeferredState::Applied)
        } else {
            None
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn blocked_state(&self) -> DeferredState {
        if self.presenter.is_some() {
            DeferredState::Pending
        } else {
            DeferredState::Unbound
        }
    }

    /// Replay, in FIFO order, every held action whose target matches `select`
    /// and resolves to a handle. A target that fails to resolve keeps all of
    /// its later actions held too.
    fn resolve<F>(&mut self, select: F) -> usize
    where
        F: Fn(ItemId) -> bool,
    {
        let Some(presenter) = self.presenter.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        let mut unresolved: HashSet<ItemId> = HashSet::new();
        let mut kept = VecDeque::with_capacity(self.pending.len());
        for (id, action) in self.pending.drain(..) {
            if !select(id) || unresolved.contains(&id) {
                kept.push_back((id, action));
                continue;
            }
            match presenter.handle_for(id) {
                Some(handle) => {
                    presenter.apply(handle, &action);
                    self.applied.insert(id);
                    applied += 1;
                }
                None => {
                    unresolved.insert(id);
                    kept.push_back((id, action));
                }
            }
        }
        self.pending = kept;
        if applied > 0 {
            debug!(applied, "Replayed deferred actions");
        }
        applied
    }
}
