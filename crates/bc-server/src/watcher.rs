//! Library change detection.
//!
//! Watches the library roots for file-system events and rescans once they
//! have gone quiet for `settle_time`. An optional poll interval rescans
//! unconditionally, for mounts where events are not delivered. Every trigger
//! goes through the coalescing [`AppContext::rescan`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

type Pending = Arc<Mutex<HashMap<PathBuf, Instant>>>;

/// Run the watcher until `cancel` fires.
pub async fn run_watcher(ctx: AppContext, cancel: CancellationToken) {
    let watch_config = ctx.config.watch.clone();
    let poll_interval = (watch_config.poll_interval_secs > 0)
        .then(|| Duration::from_secs(watch_config.poll_interval_secs));

    if !watch_config.enabled && poll_interval.is_none() {
        tracing::info!("File watcher and poller disabled");
        return;
    }

    let settle_time = Duration::from_secs(watch_config.settle_time_secs);

    // Paths with recent events (path -> last seen time).
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

    let watcher = if watch_config.enabled {
        start_notify(ctx.library.roots(), pending.clone())
    } else {
        None
    };

    let mut last_poll = Instant::now();
    // Set when a trigger hit a running rescan that may already have passed
    // the changed directory.
    let mut retry = false;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = cancel.cancelled() => { break; }
        }

        let now = Instant::now();
        let settled = take_settled(&pending, now, settle_time);
        let poll_due = poll_interval.is_some_and(|p| now.duration_since(last_poll) >= p);

        let retry_due = std::mem::take(&mut retry);

        if settled.is_empty() && !poll_due && !retry_due {
            continue;
        }
        if poll_due {
            last_poll = now;
        }

        tracing::debug!(
            changed = settled.len(),
            poll = poll_due,
            retry = retry_due,
            "Triggering rescan"
        );
        match ctx.rescan().await {
            Ok(report) => {
                if report.added + report.updated + report.removed > 0 {
                    tracing::info!(
                        added = report.added,
                        updated = report.updated,
                        removed = report.removed,
                        books = report.books,
                        "Library updated"
                    );
                }
                for issue in &report.issues {
                    tracing::warn!("Scan issue: {issue}");
                }
            }
            Err(bc_core::Error::RescanInProgress) => {
                tracing::debug!("Rescan already running; retrying once it finishes");
                retry = true;
            }
            Err(e) => tracing::warn!(error = %e, "Rescan failed"),
        }
    }

    tracing::info!("File watcher stopped");
    drop(watcher);
}

fn start_notify(roots: &[PathBuf], pending: Pending) -> Option<RecommendedWatcher> {
    let mut watcher = match notify::recommended_watcher(
        move |res: Result<notify::Event, notify::Error>| {
            let Ok(event) = res else {
                return;
            };
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            let mut map = pending.lock();
            for path in event.paths {
                map.insert(path, Instant::now());
            }
        },
    ) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Failed to create file watcher: {e}");
            return None;
        }
    };

    for root in roots {
        if !root.exists() {
            tracing::warn!("Library root does not exist: {}", root.display());
            continue;
        }
        match watcher.watch(root, RecursiveMode::Recursive) {
            Ok(()) => tracing::info!("Watching library root: {}", root.display()),
            Err(e) => tracing::warn!("Failed to watch {}: {e}", root.display()),
        }
    }

    Some(watcher)
}

/// Remove and return paths whose last event is at least `settle_time` old.
fn take_settled(pending: &Pending, now: Instant, settle_time: Duration) -> Vec<PathBuf> {
    let mut settled = Vec::new();
    pending.lock().retain(|path, last_seen| {
        if now.duration_since(*last_seen) >= settle_time {
            settled.push(path.clone());
            false
        } else {
            true
        }
    });
    settled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_quiet_paths_settle() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let start = Instant::now();
        pending.lock().insert(PathBuf::from("/lib/a/01.mp3"), start);
        pending
            .lock()
            .insert(PathBuf::from("/lib/b/01.mp3"), start + Duration::from_secs(4));

        let settled = take_settled(&pending, start + Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(settled, vec![PathBuf::from("/lib/a/01.mp3")]);
        assert_eq!(pending.lock().len(), 1);

        let settled = take_settled(&pending, start + Duration::from_secs(9), Duration::from_secs(5));
        assert_eq!(settled.len(), 1);
        assert!(pending.lock().is_empty());
    }
}
