//! Change intake: OS notifications, change records, and the coalescing queue.

mod events;
mod queue;
mod watcher;

pub use events::{ChangeFlags, ChangeKind, ChangeRecord, WatchNotification};
pub use queue::{ChangeQueue, IdleWaker};
pub use watcher::{ChangeWatcher, Subscription};
