#![cfg(unix)]

use crate::integration::support::Fixture;
use std::os::unix::fs::symlink;

#[test]
fn link_to_ancestor_terminates() {
    let fx = Fixture::new();
    fx.write("A/file.txt");
    symlink(fx.path("A"), fx.path("A/link")).unwrap();

    let mut tree = fx.open();
    tree.populate();

    assert!(tree.resolve(&fx.path("A/file.txt")).is_some());
    assert!(tree.resolve(&fx.path("A/link")).is_none());
    assert_eq!(tree.store().len(), 3);
}

#[test]
fn link_to_self_is_skipped() {
    let fx = Fixture::new();
    fx.mkdir("A");
    symlink(fx.path("A"), fx.path("A/me")).unwrap();
    symlink(&fx.root, fx.path("root-link")).unwrap();

    let mut tree = fx.open();
    tree.populate();
    assert_eq!(tree.store().len(), 2);
}

#[test]
fn sibling_links_do_not_ping_pong() {
    let fx = Fixture::new();
    fx.write("a/x.txt");
    fx.write("b/y.txt");
    symlink(fx.path("b"), fx.path("a/to_b")).unwrap();
    symlink(fx.path("a"), fx.path("b/to_a")).unwrap();

    let mut tree = fx.open();
    tree.populate();

    // a, a/x.txt, a/to_b, a/to_b/y.txt, b, b/y.txt, b/to_a, b/to_a/x.txt
    assert!(tree.resolve(&fx.path("a/to_b/y.txt")).is_some());
    assert!(tree.resolve(&fx.path("a/to_b/to_a")).is_none());
    assert!(tree.resolve(&fx.path("b/to_a/to_b")).is_none());
    assert_eq!(tree.store().len(), 9);
}

#[test]
fn link_outside_the_tree_is_followed() {
    let outside = Fixture::new();
    outside.write("shared/lib.rs");
    let fx = Fixture::new();
    symlink(outside.path("shared"), fx.path("vendor")).unwrap();

    let mut tree = fx.open();
    tree.populate();
    assert!(tree.resolve(&fx.path("vendor/lib.rs")).is_some());
}

#[test]
fn cycle_created_while_watching_is_ignored() {
    let fx = Fixture::new();
    fx.mkdir("A");
    let mut tree = fx.open();
    tree.populate();

    symlink(fx.path("A"), fx.path("A/again")).unwrap();
    tree.queue()
        .enqueue_path(fx.path("A/again"), treesync::watch::ChangeKind::Modified);
    tree.run_until_idle();
    assert!(tree.resolve(&fx.path("A/again")).is_none());
}

#[test]
fn change_beneath_a_cyclic_link_starts_no_merge() {
    let fx = Fixture::new();
    fx.write("A/file.txt");
    symlink(fx.path("A"), fx.path("A/loop")).unwrap();
    let mut tree = fx.open();
    tree.populate();
    let merges = tree.scheduler().merges_started();

    tree.queue()
        .enqueue_path(fx.path("A/loop/file.txt"), treesync::watch::ChangeKind::Modified);
    tree.run_until_idle();
    assert_eq!(tree.scheduler().merges_started(), merges);
    assert!(tree.resolve(&fx.path("A/loop/file.txt")).is_none());
}
