//! Configuration
//!
//! `SyncConfig` is assembled by [`ConfigLoader`] from defaults, an optional
//! global file, an optional workspace file, and `TREESYNC__*` environment
//! variables, in that order of increasing precedence.

mod loader;

pub use loader::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::tree::VisibilityPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Workspace config file name, looked up in the project root.
pub const WORKSPACE_CONFIG_FILE: &str = ".treesync.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub visibility: VisibilityPolicy,
    #[serde(default)]
    pub project: ProjectFilesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Merge slicing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Directories reconciled per `continue_merge` call
    #[serde(default = "default_dirs_per_slice")]
    pub dirs_per_slice: usize,
}

fn default_dirs_per_slice() -> usize {
    8
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            dirs_per_slice: default_dirs_per_slice(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Pending per-path records before the queue collapses into a full rescan
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_max_pending() -> usize {
    10_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Longest path, in bytes, a change record may carry
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,
}

#[cfg(windows)]
fn default_max_path_len() -> usize {
    260
}

#[cfg(not(windows))]
fn default_max_path_len() -> usize {
    4096
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_path_len: default_max_path_len(),
        }
    }
}

/// Files the hidden policy always excludes from the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFilesConfig {
    /// Project metadata file, relative to the root
    #[serde(default)]
    pub metadata_file: Option<PathBuf>,

    /// Suffix appended to the metadata file name to form its per-user companion
    #[serde(default = "default_user_file_suffix")]
    pub user_file_suffix: String,

    /// Extensions of solution-level files
    #[serde(default = "default_solution_extensions")]
    pub solution_extensions: Vec<String>,
}

fn default_user_file_suffix() -> String {
    ".user".to_string()
}

fn default_solution_extensions() -> Vec<String> {
    vec!["sln".to_string()]
}

impl Default for ProjectFilesConfig {
    fn default() -> Self {
        Self {
            metadata_file: None,
            user_file_suffix: default_user_file_suffix(),
            solution_extensions: default_solution_extensions(),
        }
    }
}
