//! ChangeQueue
//!
//! Multi-producer, single-consumer FIFO of pending change records shared
//! between notifier threads and the interactive thread. Enqueue never blocks
//! on the consumer and applies one coalescing rule: once a `FullRescan` sits at
//! the head, per-path records are redundant and are dropped, and requesting a
//! `FullRescan` discards the per-path records already queued.

use crate::watch::events::{ChangeKind, ChangeRecord, WatchNotification};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

/// Asks the host for another idle pass.
///
/// Called from producer threads when work arrives and no drain is scheduled,
/// so the scheduler runs even if the host has no further idle signals pending.
pub trait IdleWaker: Send + Sync {
    fn request_idle(&self);
}

struct Pending {
    records: VecDeque<ChangeRecord>,
    drain_scheduled: bool,
}

impl Pending {
    fn head_is_full_rescan(&self) -> bool {
        self.records
            .front()
            .map(ChangeRecord::is_full_rescan)
            .unwrap_or(false)
    }

    fn collapse_to_full_rescan(&mut self) {
        self.records.clear();
        self.records.push_back(ChangeRecord::full_rescan());
    }
}

pub struct ChangeQueue {
    pending: Mutex<Pending>,
    waker: RwLock<Option<Arc<dyn IdleWaker>>>,
    max_pending: usize,
    max_path_len: usize,
}

impl ChangeQueue {
    pub fn new(max_pending: usize, max_path_len: usize) -> Self {
        Self {
            pending: Mutex::new(Pending {
                records: VecDeque::new(),
                drain_scheduled: false,
            }),
            waker: RwLock::new(None),
            max_pending: max_pending.max(1),
            max_path_len,
        }
    }

    pub fn set_waker(&self, waker: Arc<dyn IdleWaker>) {
        *self.waker.write() = Some(waker);
    }

    pub fn clear_waker(&self) {
        *self.waker.write() = None;
    }

    /// Append records, applying the coalescing rule.
    ///
    /// A `FullRescan` among `records` behaves like [`request_full_rescan`](Self::request_full_rescan).
    /// When the queue would grow past its bound, everything collapses into a
    /// single `FullRescan`.
    pub fn enqueue<I>(&self, records: I)
    where
        I: IntoIterator<Item = ChangeRecord>,
    {
        let wake = {
            let mut pending = self.pending.lock();
            let mut added = false;
            for record in records {
                if record.is_full_rescan() {
                    if !pending.head_is_full_rescan() {
                        pending.collapse_to_full_rescan();
                    }
                    added = true;
                    continue;
                }
                if pending.head_is_full_rescan() {
                    trace!(path = %record.path.display(), "Full rescan pending, dropping per-path change");
                    continue;
                }
                if pending.records.len() >= self.max_pending {
                    debug!(
                        max_pending = self.max_pending,
                        "Change queue bound reached, collapsing into full rescan"
                    );
                    pending.collapse_to_full_rescan();
                    added = true;
                    continue;
                }
                pending.records.push_back(record);
                added = true;
            }
            Self::schedule_drain(&mut pending, added)
        };
        if wake {
            self.wake();
        }
    }

    pub fn enqueue_path(&self, path: impl Into<std::path::PathBuf>, kind: ChangeKind) {
        self.enqueue([ChangeRecord {
            path: path.into(),
            kind,
        }]);
    }

    pub fn request_full_rescan(&self) {
        self.enqueue([ChangeRecord::full_rescan()]);
    }

    /// Entry point for notifier-thread callbacks.
    pub fn record_notification(&self, notification: WatchNotification) {
        let records = notification.into_records(self.max_path_len);
        if !records.is_empty() {
            self.enqueue(records);
        }
    }

    /// Non-blocking; `None` once drained.
    pub fn try_dequeue(&self) -> Option<ChangeRecord> {
        self.pending.lock().records.pop_front()
    }

    /// Pop the head if it is a `FullRescan`.
    pub fn take_full_rescan(&self) -> bool {
        let mut pending = self.pending.lock();
        if pending.head_is_full_rescan() {
            pending.records.pop_front();
            true
        } else {
            false
        }
    }

    /// Mark the drain finished if nothing is queued.
    ///
    /// Returns `true` when the queue was empty; the next enqueue will then wake
    /// the host again.
    pub fn finish_drain(&self) -> bool {
        let mut pending = self.pending.lock();
        if pending.records.is_empty() {
            pending.drain_scheduled = false;
            true
        } else {
            false
        }
    }

    /// Discard everything queued.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.records.len();
        pending.records.clear();
        pending.drain_scheduled = false;
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().records.is_empty()
    }

    fn schedule_drain(pending: &mut Pending, added: bool) -> bool {
        if added && !pending.drain_scheduled {
            pending.drain_scheduled = true;
            true
        } else {
            false
        }
    }

    fn wake(&self) {
        if let Some(waker) = self.waker.read().as_ref() {
            waker.request_idle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl IdleWaker for CountingWaker {
        fn request_idle(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn drain(queue: &ChangeQueue) -> Vec<ChangeRecord> {
        std::iter::from_fn(|| queue.try_dequeue()).collect()
    }

    #[test]
    fn per_path_records_keep_insertion_order() {
        let queue = ChangeQueue::new(100, 4096);
        queue.enqueue([
            ChangeRecord::modified("/p/b"),
            ChangeRecord::deleted("/p/a"),
        ]);
        queue.enqueue_path("/p/c", ChangeKind::Modified);
        assert_eq!(
            drain(&queue),
            vec![
                ChangeRecord::modified("/p/b"),
                ChangeRecord::deleted("/p/a"),
                ChangeRecord::modified("/p/c"),
            ]
        );
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn full_rescan_supersedes_queued_records() {
        let queue = ChangeQueue::new(100, 4096);
        for i in 0..10 {
            queue.enqueue_path(format!("/p/{}", i), ChangeKind::Modified);
        }
        queue.request_full_rescan();
        queue.enqueue_path("/p/late", ChangeKind::Modified);
        queue.request_full_rescan();

        assert_eq!(drain(&queue), vec![ChangeRecord::full_rescan()]);
    }

    #[test]
    fn overflow_collapses_into_full_rescan() {
        let queue = ChangeQueue::new(3, 4096);
        for i in 0..5 {
            queue.enqueue_path(format!("/p/{}", i), ChangeKind::Modified);
        }
        assert_eq!(drain(&queue), vec![ChangeRecord::full_rescan()]);
    }

    #[test]
    fn waker_fires_once_per_drain() {
        let queue = ChangeQueue::new(100, 4096);
        let waker = Arc::new(CountingWaker::default());
        queue.set_waker(waker.clone());

        queue.enqueue_path("/p/a", ChangeKind::Modified);
        queue.enqueue_path("/p/b", ChangeKind::Modified);
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);

        assert!(!queue.finish_drain());
        drain(&queue);
        assert!(queue.finish_drain());

        queue.enqueue_path("/p/c", ChangeKind::Modified);
        assert_eq!(waker.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn take_full_rescan_only_pops_rescan_head() {
        let queue = ChangeQueue::new(100, 4096);
        queue.enqueue_path("/p/a", ChangeKind::Modified);
        assert!(!queue.take_full_rescan());
        queue.request_full_rescan();
        assert!(queue.take_full_rescan());
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_producers_do_not_lose_records() {
        let queue = Arc::new(ChangeQueue::new(10_000, 4096));
        let mut handles = Vec::new();
        for t in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    queue.enqueue_path(format!("/p/{}/{}", t, i), ChangeKind::Modified);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 400);
    }

    #[test]
    fn notification_records_respect_path_limit() {
        let queue = ChangeQueue::new(100, 16);
        queue.record_notification(WatchNotification::new(
            vec![
                std::path::PathBuf::from("/short"),
                std::path::PathBuf::from("/a/very/long/path/indeed"),
            ],
            crate::watch::ChangeFlags::CREATED,
        ));
        assert_eq!(drain(&queue), vec![ChangeRecord::modified("/short")]);
    }
}
