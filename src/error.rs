//! Error types for the synchronisation core.

use crate::types::ItemId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by NodeStore mutations and disk operations on tree items.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    #[error("The project root cannot be removed")]
    RootRemoval,

    #[error("Item {0} is not a folder")]
    NotAFolder(ItemId),

    #[error("{path} is already modeled as {existing}")]
    DuplicatePath { path: PathBuf, existing: ItemId },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the OS change-notification wrapper.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The notification provider could not be constructed. The subsystem cannot
    /// run without it, so this is fatal for the tree instance.
    #[error("File change notification provider unavailable: {0}")]
    ProviderUnavailable(#[source] notify::Error),

    #[error("Failed to observe {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Top-level error for tree-instance operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Project tree has been closed")]
    Closed,
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}
