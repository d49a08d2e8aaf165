use crate::integration::support::Fixture;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use treesync::deferred::{DeferredAction, DeferredState, PresentationHandle, Presenter};
use treesync::types::ItemId;

#[derive(Clone, Default)]
struct TreeView {
    shown: Rc<RefCell<HashSet<ItemId>>>,
    log: Rc<RefCell<Vec<(ItemId, DeferredAction)>>>,
}

impl Presenter for TreeView {
    fn handle_for(&self, id: ItemId) -> Option<PresentationHandle> {
        self.shown
            .borrow()
            .contains(&id)
            .then_some(PresentationHandle(u64::from(id.0)))
    }

    fn apply(&mut self, handle: PresentationHandle, action: &DeferredAction) {
        self.log.borrow_mut().push((ItemId(handle.0 as u32), action.clone()));
    }
}

#[test]
fn action_before_materialization_applies_exactly_once() {
    let fx = Fixture::new();
    fx.write("src/lib.rs");
    let mut tree = fx.open();
    tree.populate();
    let src = tree.resolve(&fx.path("src")).unwrap();

    let view = TreeView::default();
    tree.bind_presenter(Box::new(view.clone()));
    assert_eq!(
        tree.defer_action(src, DeferredAction::Expand).unwrap(),
        DeferredState::Pending
    );
    assert!(view.log.borrow().is_empty());

    view.shown.borrow_mut().insert(src);
    assert_eq!(tree.notify_materialized(src), 1);
    assert_eq!(tree.notify_materialized(src), 0);
    assert_eq!(tree.notify_attached(), 0);
    assert_eq!(*view.log.borrow(), vec![(src, DeferredAction::Expand)]);
    assert_eq!(tree.deferred_state(src), Some(DeferredState::Applied));
}

#[test]
fn unbound_actions_wait_for_attach() {
    let fx = Fixture::new();
    fx.write("a.txt");
    fx.write("b.txt");
    let mut tree = fx.open();
    tree.populate();
    let a = tree.resolve(&fx.path("a.txt")).unwrap();
    let b = tree.resolve(&fx.path("b.txt")).unwrap();

    assert_eq!(
        tree.defer_action(a, DeferredAction::Select).unwrap(),
        DeferredState::Unbound
    );
    tree.defer_action(b, DeferredAction::SetDecoration("modified".into()))
        .unwrap();

    let view = TreeView::default();
    assert_eq!(tree.bind_presenter(Box::new(view.clone())), 0);
    view.shown.borrow_mut().extend([a, b]);
    assert_eq!(tree.notify_attached(), 2);
    assert_eq!(view.log.borrow().len(), 2);
}

#[test]
fn actions_for_removed_items_are_dropped() {
    let fx = Fixture::new();
    fx.write("gone.txt");
    let mut tree = fx.open();
    tree.populate();
    let gone = tree.resolve(&fx.path("gone.txt")).unwrap();
    tree.defer_action(gone, DeferredAction::Select).unwrap();

    std::fs::remove_file(fx.path("gone.txt")).unwrap();
    tree.populate();
    assert_eq!(tree.deferred_state(gone), None);
    assert!(tree.defer_action(gone, DeferredAction::Select).is_err());
}
