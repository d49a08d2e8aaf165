//! Change records and raw notification translation.

use notify::event::ModifyKind;
use notify::{Event, EventKind};
use std::ops::BitOr;
use std::path::{Path, PathBuf};

/// What the consumer should do about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Modified,
    Deleted,
    /// Reconcile the whole tree; supersedes queued per-path records.
    FullRescan,
}

/// One pending change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeRecord {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeRecord {
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Deleted,
        }
    }

    pub fn full_rescan() -> Self {
        Self {
            path: PathBuf::new(),
            kind: ChangeKind::FullRescan,
        }
    }

    /// Build a per-path record, dropping paths that cannot be acted on safely.
    ///
    /// Relative paths and paths longer than `max_path_len` bytes yield `None`.
    pub fn checked(path: &Path, kind: ChangeKind, max_path_len: usize) -> Option<Self> {
        if !path.is_absolute() || path.as_os_str().len() > max_path_len {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            kind,
        })
    }

    pub fn is_full_rescan(&self) -> bool {
        self.kind == ChangeKind::FullRescan
    }
}

/// Raw flag set carried by a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChangeFlags(u8);

impl ChangeFlags {
    pub const NONE: ChangeFlags = ChangeFlags(0);
    pub const CREATED: ChangeFlags = ChangeFlags(1);
    pub const TIME_CHANGED: ChangeFlags = ChangeFlags(1 << 1);
    pub const DELETED: ChangeFlags = ChangeFlags(1 << 2);
    pub const RENAMED: ChangeFlags = ChangeFlags(1 << 3);
    pub const ATTRIBUTES: ChangeFlags = ChangeFlags(1 << 4);
    /// The provider lost events and asks for a full rescan.
    pub const RESCAN: ChangeFlags = ChangeFlags(1 << 5);

    pub fn contains(self, other: ChangeFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ChangeFlags {
    type Output = ChangeFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        ChangeFlags(self.0 | rhs.0)
    }
}

/// Paths reported together by one provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchNotification {
    pub paths: Vec<PathBuf>,
    pub flags: ChangeFlags,
}

impl WatchNotification {
    pub fn new(paths: Vec<PathBuf>, flags: ChangeFlags) -> Self {
        Self { paths, flags }
    }

    /// Per-path records for this notification, or a single full rescan.
    pub fn into_records(self, max_path_len: usize) -> Vec<ChangeRecord> {
        if self.flags.contains(ChangeFlags::RESCAN) {
            return vec![ChangeRecord::full_rescan()];
        }
        let kind = if self.flags.contains(ChangeFlags::DELETED) {
            ChangeKind::Deleted
        } else {
            ChangeKind::Modified
        };
        self.paths
            .iter()
            .filter_map(|p| {
                let record = ChangeRecord::checked(p, kind, max_path_len);
                if record.is_none() {
                    tracing::trace!(path = %p.display(), "Dropping change for unusable path");
                }
                record
            })
            .collect()
    }
}

/// Translate a provider event into a notification.
///
/// Access events carry no structural information and are dropped.
pub(crate) fn translate_event(event: &Event) -> Option<WatchNotification> {
    if event.need_rescan() {
        return Some(WatchNotification::new(
            event.paths.clone(),
            ChangeFlags::RESCAN,
        ));
    }

    let flags = match event.kind {
        EventKind::Create(_) => ChangeFlags::CREATED,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeFlags::RENAMED,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeFlags::ATTRIBUTES,
        EventKind::Modify(_) => ChangeFlags::TIME_CHANGED,
        EventKind::Remove(_) => ChangeFlags::DELETED,
        EventKind::Access(_) => return None,
        EventKind::Any | EventKind::Other => ChangeFlags::TIME_CHANGED,
    };

    if event.paths.is_empty() {
        return None;
    }
    Some(WatchNotification::new(event.paths.clone(), flags))
}
