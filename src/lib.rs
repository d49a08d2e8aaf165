//! Treesync: Incremental Project Tree Synchronisation
//!
//! Keeps an in-memory project tree in step with an externally mutable
//! directory on disk. OS change notifications are queued from notifier
//! threads; an idle-driven scheduler on the interactive thread drains them and
//! advances a resumable, sliced directory merge.

pub mod cli;
pub mod config;
pub mod deferred;
pub mod error;
pub mod logging;
pub mod merge;
pub mod project;
pub mod scheduler;
pub mod tree;
pub mod types;
pub mod watch;
