//! Directory listing with the hidden-entry policy applied.

use crate::config::ProjectFilesConfig;
use crate::tree::{NodeKind, SortKey};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// One live entry of a directory, already filtered.
#[derive(Debug, Clone)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub key: SortKey,
    pub is_dir: bool,
    /// The entry itself is a symlink (or reparse point).
    pub is_link: bool,
}

impl ListedEntry {
    pub fn kind(&self) -> NodeKind {
        if self.is_dir {
            NodeKind::Folder
        } else {
            NodeKind::File
        }
    }
}

/// Exclusion rules applied to every entry before it is considered for the tree.
///
/// An entry is hidden when it is the project metadata file, its per-user
/// companion, or a solution-level file; when it has vanished by the time it is
/// probed; or when it carries hidden or system attributes. Probe errors other
/// than disappearance leave the entry visible.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    metadata_file: Option<PathBuf>,
    user_file: Option<PathBuf>,
    solution_extensions: Vec<String>,
}

impl EntryFilter {
    pub fn new(root: &Path, project: &ProjectFilesConfig) -> Self {
        let metadata_file = project.metadata_file.as_ref().map(|p| root.join(p));
        let user_file = metadata_file.as_ref().map(|p| {
            let mut name = p.as_os_str().to_os_string();
            name.push(&project.user_file_suffix);
            PathBuf::from(name)
        });
        Self {
            metadata_file,
            user_file,
            solution_extensions: project
                .solution_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_hidden(&self, path: &Path) -> bool {
        if self.metadata_file.as_deref() == Some(path) || self.user_file.as_deref() == Some(path) {
            return true;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if self
                .solution_extensions
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
            {
                return true;
            }
        }
        match fs::symlink_metadata(path) {
            Ok(meta) => has_hidden_attributes(path, &meta),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "Entry vanished while probing, hiding");
                true
            }
            Err(e) => {
                trace!(path = %path.display(), error = %e, "Attribute probe failed, treating as visible");
                false
            }
        }
    }

    /// Stat a single path and turn it into a listed entry, or `None` when it is
    /// gone or hidden.
    pub fn probe(&self, path: &Path) -> Option<ListedEntry> {
        if self.is_hidden(path) {
            return None;
        }
        let meta = fs::symlink_metadata(path).ok()?;
        Some(entry_for(path.to_path_buf(), meta.file_type().is_symlink(), meta.is_dir()))
    }
}

#[cfg(windows)]
fn has_hidden_attributes(_path: &Path, meta: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
    meta.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0
}

#[cfg(not(windows))]
fn has_hidden_attributes(path: &Path, _meta: &fs::Metadata) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn entry_for(path: PathBuf, is_link: bool, is_dir: bool) -> ListedEntry {
    // A link counts as a directory when its target is one.
    let is_dir = if is_link {
        fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false)
    } else {
        is_dir
    };
    let kind = if is_dir {
        NodeKind::Folder
    } else {
        NodeKind::File
    };
    let caption = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ListedEntry {
        key: SortKey::new(kind.default_priority(), caption),
        path,
        is_dir,
        is_link,
    }
}

/// The immediate, filtered entries of one directory in display order.
pub struct DirectoryListing;

impl DirectoryListing {
    /// List `dir`. A directory that cannot be read (or no longer exists) yields
    /// an empty listing.
    pub fn read(dir: &Path, filter: &EntryFilter) -> Vec<ListedEntry> {
        let mut entries: Vec<ListedEntry> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    trace!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| !filter.is_hidden(entry.path()))
            .map(|entry| {
                let file_type = entry.file_type();
                entry_for(entry.into_path(), file_type.is_symlink(), file_type.is_dir())
            })
            .collect();
        entries.sort_by(|a, b| a.key.display_cmp(&b.key));
        entries
    }
}
