//! ChangeWatcher: OS change notification for observed files and folders.

use crate::error::WatchError;
use crate::watch::events::{translate_event, ChangeFlags, WatchNotification};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How a path is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    File,
    Folder { recursive: bool },
}

/// Wraps the platform watcher.
///
/// The handler runs on the provider's notifier thread, never on the
/// interactive thread; it should only construct change records and enqueue
/// them.
pub struct ChangeWatcher {
    watcher: Mutex<RecommendedWatcher>,
    files: RwLock<HashSet<PathBuf>>,
    folders: RwLock<HashMap<PathBuf, Subscription>>,
    ignored: Arc<RwLock<HashSet<PathBuf>>>,
}

impl ChangeWatcher {
    /// Create the watcher. Fails with [`WatchError::ProviderUnavailable`] if
    /// the platform notification facility cannot be initialised.
    pub fn new<F>(handler: F) -> Result<Self, WatchError>
    where
        F: Fn(WatchNotification) + Send + Sync + 'static,
    {
        let ignored: Arc<RwLock<HashSet<PathBuf>>> = Arc::new(RwLock::new(HashSet::new()));
        let ignored_in_callback = Arc::clone(&ignored);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(mut notification) = translate_event(&event) else {
                    return;
                };
                {
                    let ignored = ignored_in_callback.read();
                    if !ignored.is_empty() {
                        notification
                            .paths
                            .retain(|p| !ignored.iter().any(|i| p.starts_with(i)));
                    }
                }
                if notification.paths.is_empty() && !notification.flags.contains(ChangeFlags::RESCAN) {
                    trace!("Notification suppressed");
                    return;
                }
                handler(notification);
            }
            Err(e) => {
                warn!(error = %e, "Watch error");
            }
        })
        .map_err(WatchError::ProviderUnavailable)?;

        Ok(Self {
            watcher: Mutex::new(watcher),
            files: RwLock::new(HashSet::new()),
            folders: RwLock::new(HashMap::new()),
            ignored,
        })
    }

    /// Observe a single file. Re-observing is a no-op.
    pub fn observe_file(&self, path: &Path) -> Result<(), WatchError> {
        let mut files = self.files.write();
        if files.contains(path) {
            return Ok(());
        }
        self.watcher
            .lock()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Subscribe {
                path: path.to_path_buf(),
                source,
            })?;
        files.insert(path.to_path_buf());
        debug!(path = %path.display(), "Observing file");
        Ok(())
    }

    /// Observe a folder, recursively by default. Re-observing is a no-op.
    pub fn observe_folder(&self, path: &Path, recursive: bool) -> Result<(), WatchError> {
        let mut folders = self.folders.write();
        if folders.contains_key(path) {
            return Ok(());
        }
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.watcher
            .lock()
            .watch(path, mode)
            .map_err(|source| WatchError::Subscribe {
                path: path.to_path_buf(),
                source,
            })?;
        folders.insert(path.to_path_buf(), Subscription::Folder { recursive });
        debug!(path = %path.display(), recursive, "Observing folder");
        Ok(())
    }

    /// Returns whether a subscription existed.
    pub fn stop_observing_file(&self, path: &Path) -> bool {
        let existed = self.files.write().remove(path);
        if existed {
            self.unwatch(path);
        }
        existed
    }

    /// Returns whether a subscription existed.
    pub fn stop_observing_folder(&self, path: &Path) -> bool {
        let existed = self.folders.write().remove(path).is_some();
        if existed {
            self.unwatch(path);
        }
        existed
    }

    /// Drop every subscription.
    pub fn stop_all(&self) {
        let files: Vec<PathBuf> = self.files.write().drain().collect();
        let folders: Vec<PathBuf> = self.folders.write().drain().map(|(p, _)| p).collect();
        for path in files.iter().chain(folders.iter()) {
            self.unwatch(path);
        }
    }

    /// Suppress (or restore) delivery for `path` and everything below it.
    ///
    /// Used while an internal operation touches the path; the caller must
    /// release the suppression when done.
    pub fn ignore_path(&self, path: &Path, ignore: bool) {
        let mut ignored = self.ignored.write();
        if ignore {
            ignored.insert(path.to_path_buf());
        } else {
            ignored.remove(path);
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.read().iter().any(|i| path.starts_with(i))
    }

    pub fn subscription(&self, path: &Path) -> Option<Subscription> {
        if self.files.read().contains(path) {
            return Some(Subscription::File);
        }
        self.folders.read().get(path).copied()
    }

    fn unwatch(&self, path: &Path) {
        if let Err(e) = self.watcher.lock().unwatch(path) {
            debug!(path = %path.display(), error = %e, "Unwatch failed");
        }
    }
}
