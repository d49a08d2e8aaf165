use crate::integration::support::{displayed, Fixture};
use std::fs;
use treesync::tree::{EventLog, TreeEvent};

#[test]
fn second_merge_produces_no_operations() {
    let fx = Fixture::new();
    fx.write("src/main.rs");
    fx.write("src/util/mod.rs");
    fx.write("Cargo.toml");
    fx.mkdir("empty");

    let mut tree = fx.open();
    tree.populate();
    assert_eq!(displayed(&tree), fx.disk_entries());

    let log = EventLog::new();
    tree.add_observer(Box::new(log.clone()));
    tree.populate();
    assert_eq!(log.structural_count(), 0);
}

#[test]
fn full_merge_converges_after_mutations() {
    let fx = Fixture::new();
    fx.write("a/one.txt");
    fx.write("a/two.txt");
    fx.write("b/deep/three.txt");
    fx.write("top.txt");

    let mut tree = fx.open();
    tree.populate();

    // Create, delete, rename files and folders with no notifications at all.
    fs::remove_file(fx.path("a/one.txt")).unwrap();
    fs::rename(fx.path("a/two.txt"), fx.path("a/renamed.txt")).unwrap();
    fs::rename(fx.path("b"), fx.path("c")).unwrap();
    fx.write("c/deep/new/four.txt");
    fs::remove_file(fx.path("top.txt")).unwrap();
    fx.mkdir("top.txt");

    tree.populate();
    assert_eq!(displayed(&tree), fx.disk_entries());
    assert!(tree.resolve(&fx.path("b")).is_none());
    assert!(tree.resolve(&fx.path("b/deep/three.txt")).is_none());
}

#[test]
fn file_replaced_by_folder_of_same_name_converges() {
    let fx = Fixture::new();
    fx.write("thing");
    let mut tree = fx.open();
    tree.populate();
    let old = tree.resolve(&fx.path("thing")).unwrap();

    fs::remove_file(fx.path("thing")).unwrap();
    fx.write("thing/inner.txt");
    tree.populate();
    assert_eq!(displayed(&tree), fx.disk_entries());
    assert_ne!(tree.resolve(&fx.path("thing")), Some(old));

    fs::remove_dir_all(fx.path("thing")).unwrap();
    fx.write("thing");
    tree.populate();
    assert_eq!(displayed(&tree), fx.disk_entries());

    let log = EventLog::new();
    tree.add_observer(Box::new(log.clone()));
    tree.populate();
    assert_eq!(log.structural_count(), 0);
}

#[test]
fn hidden_entries_never_enter_the_tree() {
    let fx = Fixture::new();
    fx.write("app.proj");
    fx.write("app.proj.user");
    fx.write("All.sln");
    fx.write("src/lib.rs");
    #[cfg(unix)]
    fx.write(".git/HEAD");

    let mut config = treesync::config::SyncConfig::default();
    config.visibility.show_all_files = true;
    config.project.metadata_file = Some("app.proj".into());
    let mut tree = fx.open_with(config);
    tree.populate();

    let shown = displayed(&tree);
    assert_eq!(
        shown.into_iter().collect::<Vec<_>>(),
        vec![fx.path("src"), fx.path("src/lib.rs")]
    );
}

#[test]
fn removed_folder_notifies_children_first() {
    let fx = Fixture::new();
    fx.write("gen/out.o");

    let mut tree = fx.open();
    tree.populate();
    let gen = tree.resolve(&fx.path("gen")).unwrap();
    let out = tree.resolve(&fx.path("gen/out.o")).unwrap();

    let log = EventLog::new();
    tree.add_observer(Box::new(log.clone()));
    fs::remove_dir_all(fx.path("gen")).unwrap();
    tree.populate();

    assert_eq!(log.take(), vec![TreeEvent::Removed(out), TreeEvent::Removed(gen)]);
    assert!(!tree.store().contains(gen));
    assert!(!tree.store().contains(out));
}

#[test]
fn toggling_show_all_files_needs_no_merge() {
    let fx = Fixture::new();
    fx.write("declared.rs");
    fx.write("scratch/notes.txt");

    let config = treesync::config::SyncConfig::default();
    let root = fx.root.clone();
    let mut tree = treesync::project::ProjectTree::open(
        &fx.root,
        &config,
        Box::new(treesync::project::ManifestMembership::new(&root, ["declared.rs"])),
    )
    .unwrap();
    tree.populate();
    assert_eq!(displayed(&tree).len(), 1);
    let nodes = tree.store().len();

    tree.set_show_all_files(true);
    assert_eq!(displayed(&tree), fx.disk_entries());
    assert_eq!(tree.store().len(), nodes);

    tree.set_show_all_files(false);
    assert_eq!(displayed(&tree).len(), 1);
}
