use crate::integration::support::Fixture;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use treesync::scheduler::TickOutcome;
use treesync::watch::{ChangeFlags, ChangeKind, IdleWaker, WatchNotification};

#[derive(Default)]
struct CountingWaker(AtomicUsize);

impl IdleWaker for CountingWaker {
    fn request_idle(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn delete_then_nested_create_converges() {
    let fx = Fixture::new();
    fx.write("src/a.txt");
    let mut tree = fx.open();
    tree.populate();
    tree.attach_watcher().unwrap();
    assert!(tree.resolve(&fx.path("src/a.txt")).is_some());

    fs::remove_file(fx.path("src/a.txt")).unwrap();
    fx.write("src/sub/b.txt");

    // What the notifier thread would deliver, in order.
    let queue = tree.queue();
    queue.record_notification(WatchNotification::new(
        vec![fx.path("src/a.txt")],
        ChangeFlags::DELETED,
    ));
    queue.record_notification(WatchNotification::new(
        vec![fx.path("src/sub/b.txt")],
        ChangeFlags::CREATED,
    ));

    tree.on_idle();
    tree.on_idle();
    tree.request_full_rescan();
    tree.run_until_idle();

    for rel in ["src", "src/sub", "src/sub/b.txt"] {
        assert!(tree.resolve(&fx.path(rel)).is_some(), "missing {}", rel);
    }
    assert!(tree.resolve(&fx.root).is_some());
    assert!(tree.resolve(&fx.path("src/a.txt")).is_none());
}

#[test]
fn per_path_changes_then_full_rescan_schedule_one_merge() {
    let fx = Fixture::new();
    for i in 0..20 {
        fx.write(&format!("f{}.txt", i));
    }
    let mut tree = fx.open();
    let queue = tree.queue();
    for i in 0..20 {
        queue.enqueue_path(fx.path(&format!("f{}.txt", i)), ChangeKind::Modified);
    }
    tree.request_full_rescan();
    assert_eq!(queue.len(), 1);

    tree.run_until_idle();
    assert_eq!(tree.scheduler().merges_started(), 1);
    assert_eq!(tree.store().len(), 21);
}

#[test]
fn one_wake_per_drain() {
    let fx = Fixture::new();
    fx.write("x.txt");
    fx.write("y.txt");
    let mut tree = fx.open();
    let waker = Arc::new(CountingWaker::default());
    tree.set_idle_waker(waker.clone());

    let queue = tree.queue();
    queue.enqueue_path(fx.path("x.txt"), ChangeKind::Modified);
    queue.enqueue_path(fx.path("y.txt"), ChangeKind::Modified);
    assert_eq!(waker.0.load(Ordering::SeqCst), 1);

    assert_eq!(tree.on_idle(), TickOutcome::MoreWork);
    assert_eq!(tree.on_idle(), TickOutcome::Idle);

    // The drain finished, so new work must wake the host again.
    queue.enqueue_path(fx.path("x.txt"), ChangeKind::Modified);
    assert_eq!(waker.0.load(Ordering::SeqCst), 2);
}

#[cfg(unix)]
#[test]
fn changes_under_hidden_directories_start_no_merge() {
    let fx = Fixture::new();
    fx.write("src/lib.rs");
    fx.write(".git/HEAD");
    let mut tree = fx.open();
    tree.populate();
    let merges = tree.scheduler().merges_started();

    let queue = tree.queue();
    queue.enqueue_path(fx.path(".git/HEAD"), ChangeKind::Modified);
    fx.write(".git/refs/heads/main");
    queue.enqueue_path(fx.path(".git/refs/heads/main"), ChangeKind::Modified);
    tree.run_until_idle();

    assert_eq!(tree.scheduler().merges_started(), merges);
    assert!(tree.resolve(&fx.path(".git")).is_none());
    assert!(tree.resolve(&fx.path(".git/HEAD")).is_none());
}

#[test]
fn overlong_paths_are_dropped() {
    let fx = Fixture::new();
    let mut config = treesync::config::SyncConfig::default();
    config.watch.max_path_len = fx.root.as_os_str().len() + 8;
    let tree = fx.open_with(config);

    let queue = tree.queue();
    queue.record_notification(WatchNotification::new(
        vec![fx.path("a-rather-long-file-name.txt")],
        ChangeFlags::CREATED,
    ));
    assert!(queue.is_empty());
}

#[test]
fn watcher_delivers_changes_eventually() {
    let fx = Fixture::new();
    let mut tree = fx.open();
    tree.populate();
    tree.attach_watcher().unwrap();

    fx.write("late.txt");
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while tree.resolve(&fx.path("late.txt")).is_none() && std::time::Instant::now() < deadline {
        tree.on_idle();
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    assert!(tree.resolve(&fx.path("late.txt")).is_some());
    tree.close();
    assert!(tree.watcher().is_none());
}
