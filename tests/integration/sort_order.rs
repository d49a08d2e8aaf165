use proptest::prelude::*;
use std::cmp::Ordering;
use std::path::PathBuf;
use treesync::error::TreeError;
use treesync::tree::{Node, NodeStore, VisibilityPolicy};
use treesync::types::ItemId;

const NAMES: &[&str] = &[
    "a", "A", "b", "B.txt", "b.txt", "main.rs", "Main.rs", "zeta", "Ärger", "ärger", "_", "10", "9",
];

#[derive(Debug, Clone)]
enum Op {
    Add { name: usize, folder: bool, parent: usize },
    Remove { index: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NAMES.len(), any::<bool>(), 0usize..8)
            .prop_map(|(name, folder, parent)| Op::Add { name, folder, parent }),
        1 => (0usize..64).prop_map(|index| Op::Remove { index }),
    ]
}

fn assert_sorted(store: &NodeStore, id: ItemId) {
    let keys: Vec<_> = store.children(id).map(|n| n.sort_key().clone()).collect();
    for pair in keys.windows(2) {
        assert_eq!(
            pair[0].display_cmp(&pair[1]),
            Ordering::Less,
            "{:?} should precede {:?}",
            pair[0],
            pair[1]
        );
    }
    for child in store.children(id) {
        assert_sorted(store, child.id());
    }
}

proptest! {
    #[test]
    fn children_stay_totally_ordered(ops in prop::collection::vec(op(), 1..80)) {
        let mut store = NodeStore::new(PathBuf::from("/p"), VisibilityPolicy::show_all());
        let mut folders = vec![store.root()];
        let mut live = Vec::new();

        for op in ops {
            match op {
                Op::Add { name, folder, parent } => {
                    let parent = folders[parent % folders.len()];
                    let path = store.path_of(parent).unwrap().join(NAMES[name]);
                    let node = if folder {
                        Node::folder(path, true)
                    } else {
                        Node::file(path, true)
                    };
                    let id = match store.add_child(parent, node) {
                        Ok(id) => id,
                        Err(TreeError::DuplicatePath { existing, .. }) => {
                            prop_assert!(live.contains(&existing));
                            continue;
                        }
                        Err(e) => panic!("unexpected error: {}", e),
                    };
                    if store.get(id).unwrap().kind().is_container() {
                        folders.push(id);
                    }
                    live.push(id);
                }
                Op::Remove { index } => {
                    if live.is_empty() {
                        continue;
                    }
                    let id = live[index % live.len()];
                    store.remove_subtree(id).unwrap();
                    live.retain(|n| store.contains(*n));
                    folders.retain(|n| store.contains(*n));
                }
            }
            assert_sorted(&store, store.root());
        }

        prop_assert_eq!(store.len(), 1 + live.len());
        for id in &live {
            let path = store.path_of(*id).unwrap().to_path_buf();
            prop_assert_eq!(store.find_by_path(&path), Some(*id));
        }
    }
}

#[test]
fn descending_caption_order_is_kept() {
    let mut store = NodeStore::new(PathBuf::from("/p"), VisibilityPolicy::show_all());
    let root = store.root();
    for name in ["apple", "Banana", "cherry", "src"] {
        let path = PathBuf::from("/p").join(name);
        let node = if name == "src" {
            Node::folder(path, true)
        } else {
            Node::file(path, true)
        };
        store.add_child(root, node).unwrap();
    }
    let captions: Vec<_> = store.children(root).map(|n| n.caption().to_string()).collect();
    assert_eq!(captions, vec!["src", "cherry", "Banana", "apple"]);
}
