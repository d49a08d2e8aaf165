//! Collaborators consumed by the core: project membership and the closing guard.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// "Is `path` declared in persisted project metadata?"
pub trait MembershipOracle {
    fn is_member(&self, path: &Path) -> bool;
}

impl<F> MembershipOracle for F
where
    F: Fn(&Path) -> bool,
{
    fn is_member(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Every discovered entry is a member.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllMembers;

impl MembershipOracle for AllMembers {
    fn is_member(&self, _path: &Path) -> bool {
        true
    }
}

/// Membership from an explicit list of declared paths.
///
/// A folder on the way to a declared path is a member as well, so declared
/// items never sit under a hidden parent.
#[derive(Debug, Clone, Default)]
pub struct ManifestMembership {
    declared: HashSet<PathBuf>,
}

impl ManifestMembership {
    /// `paths` may be absolute or relative to `root`.
    pub fn new<I, P>(root: &Path, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut declared = HashSet::new();
        for path in paths {
            let path = root.join(path.as_ref());
            for ancestor in path.ancestors() {
                if ancestor == root || !ancestor.starts_with(root) {
                    break;
                }
                if !declared.insert(ancestor.to_path_buf()) {
                    break;
                }
            }
        }
        Self { declared }
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

impl MembershipOracle for ManifestMembership {
    fn is_member(&self, path: &Path) -> bool {
        self.declared.contains(path)
    }
}

/// "Is the project closing?"
pub trait ClosingGuard {
    fn is_closing(&self) -> bool;
}

/// Shareable closing flag; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct ClosingFlag(Arc<AtomicBool>);

impl ClosingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_closing(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ClosingGuard for ClosingFlag {
    fn is_closing(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
