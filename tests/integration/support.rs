//! Shared fixtures: temp project roots and disk/tree comparisons.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use treesync::config::SyncConfig;
use treesync::project::{AllMembers, ProjectTree};
use treesync::tree::VisibilityPolicy;
use walkdir::WalkDir;

pub struct Fixture {
    // Held so the directory outlives the tree.
    _temp: TempDir,
    pub root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp.path()).unwrap();
        Self { _temp: temp, root }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, rel).unwrap();
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.path(rel)).unwrap();
    }

    pub fn open(&self) -> ProjectTree {
        self.open_with(SyncConfig {
            visibility: VisibilityPolicy::show_all(),
            ..SyncConfig::default()
        })
    }

    pub fn open_with(&self, config: SyncConfig) -> ProjectTree {
        ProjectTree::open(&self.root, &config, Box::new(AllMembers)).unwrap()
    }

    /// Every non-hidden entry below the root, as the tree should model it.
    pub fn disk_entries(&self) -> BTreeSet<PathBuf> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_dot(e.path()))
            .filter_map(Result::ok)
            .map(|e| e.into_path())
            .collect()
    }
}

fn is_dot(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

pub fn displayed(tree: &ProjectTree) -> BTreeSet<PathBuf> {
    tree.snapshot().paths().into_iter().collect()
}
