//! Directory-to-tree reconciliation: listing and exclusion rules, the
//! resumable merge state, and the merger itself.

mod listing;
mod merger;
mod state;

pub use listing::{DirectoryListing, EntryFilter, ListedEntry};
pub use merger::{MergeProgress, PathChange, TreeMerger};
pub use state::{MergeState, MergeStats, WorkItem};
