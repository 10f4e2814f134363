//! Change detection racing a manual rescan.

mod common;

use std::time::{Duration, Instant};

use bc_server::watcher::run_watcher;
use common::TestHarness;
use tokio_util::sync::CancellationToken;

fn title(h: &TestHarness, book: &str) -> Option<String> {
    h.ctx.library.book(&h.book_id(book)).map(|b| b.title.clone())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edit_during_manual_rescan_is_not_lost() {
    let h = TestHarness::with_config(|c| {
        c.watch.enabled = true;
        c.watch.settle_time_secs = 0;
    });
    // Directories are scanned in name order, so "0" is done before the
    // rescan blocks on "a".
    h.write("0", "01.mp3", "duration=10;album=Old");
    h.write("a", "01.mp3", "duration=10;album=Slow");
    h.rescan().await;

    // Changed before the watcher starts, so only the manual rescan sees it
    // and re-reads "a" slowly.
    h.write("a", "01.mp3", "duration=10;album=Slow;sleep=2500");

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(run_watcher(h.ctx.clone(), cancel.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let ctx = h.ctx.clone();
    let manual = tokio::spawn(async move { ctx.rescan().await });
    while !h.ctx.library.is_rescanning() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    h.write("0", "01.mp3", "duration=10;album=Newer");

    manual.await.unwrap().unwrap();
    assert_eq!(title(&h, "0").as_deref(), Some("Old"));

    let deadline = Instant::now() + Duration::from_secs(10);
    while title(&h, "0").as_deref() != Some("Newer") {
        assert!(Instant::now() < deadline, "edit to book 0 was never picked up");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    cancel.cancel();
    watcher.await.unwrap();
}
