//! In-memory project tree: nodes, ordering, visibility, and the owning store.

pub mod node;
pub mod observer;
pub mod order;
pub mod store;
pub mod visibility;

pub use node::{Node, NodeKind};
pub use observer::{EventLog, TracingObserver, TreeEvent, TreeObserver};
pub use order::SortKey;
pub use store::{Children, NodeStore};
pub use visibility::VisibilityPolicy;
