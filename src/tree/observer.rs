//! Mutation notifications fanned out to external collaborators.

use crate::types::ItemId;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Receives structural notifications from a [`NodeStore`](crate::tree::NodeStore).
///
/// Notifications are only sent for nodes that are displayed (visible with a
/// visible ancestor chain). All methods run on the interactive thread.
pub trait TreeObserver {
    /// `previous_visible` is the immediately preceding displayed sibling, or `ItemId::NIL`.
    fn on_item_added(&self, _parent: ItemId, _previous_visible: ItemId, _item: ItemId) {}

    fn on_item_removed(&self, _item: ItemId) {}

    /// Bulk-append hint, sent after a merge step added children under `parent`.
    fn on_items_appended(&self, _parent: ItemId) {}

    /// The structure under `parent` changed wholesale; consumers should re-fetch.
    fn on_invalidate(&self, _parent: ItemId) {}
}

/// A recorded notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEvent {
    Added {
        parent: ItemId,
        previous_visible: ItemId,
        item: ItemId,
    },
    Removed(ItemId),
    Appended(ItemId),
    Invalidated(ItemId),
}

/// Observer that appends every notification to a shared log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<TreeEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<TreeEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn snapshot(&self) -> Vec<TreeEvent> {
        self.events.borrow().clone()
    }

    /// Count of add and remove notifications, ignoring hints.
    pub fn structural_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, TreeEvent::Added { .. } | TreeEvent::Removed(_)))
            .count()
    }
}

impl TreeObserver for EventLog {
    fn on_item_added(&self, parent: ItemId, previous_visible: ItemId, item: ItemId) {
        self.events.borrow_mut().push(TreeEvent::Added {
            parent,
            previous_visible,
            item,
        });
    }

    fn on_item_removed(&self, item: ItemId) {
        self.events.borrow_mut().push(TreeEvent::Removed(item));
    }

    fn on_items_appended(&self, parent: ItemId) {
        self.events.borrow_mut().push(TreeEvent::Appended(parent));
    }

    fn on_invalidate(&self, parent: ItemId) {
        self.events.borrow_mut().push(TreeEvent::Invalidated(parent));
    }
}

/// Observer that logs notifications at debug level.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl TreeObserver for TracingObserver {
    fn on_item_added(&self, parent: ItemId, previous_visible: ItemId, item: ItemId) {
        debug!(%parent, previous = %previous_visible, %item, "Item added");
    }

    fn on_item_removed(&self, item: ItemId) {
        debug!(%item, "Item removed");
    }

    fn on_items_appended(&self, parent: ItemId) {
        debug!(%parent, "Items appended");
    }

    fn on_invalidate(&self, parent: ItemId) {
        debug!(%parent, "Subtree invalidated");
    }
}
