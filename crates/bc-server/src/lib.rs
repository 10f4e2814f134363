//! bc-server: HTTP surface, background watcher, and server lifecycle.
//!
//! This crate ties the library index, feed renderer, and transcoder together
//! into a running server:
//!
//! - Axum router serving feeds, media bytes (with ranges and conditional GET)
//!   and covers
//! - File system watcher / poller that triggers coalesced rescans
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod router;
pub mod routes;
pub mod streaming;
pub mod watcher;

use std::net::SocketAddr;
use std::sync::Arc;

use bc_core::config::Config;
use bc_probe::{SymphoniaTagReader, TagReader};
use tokio_util::sync::CancellationToken;

pub use context::AppContext;
pub use router::build_router;

/// Start the bookcast server.
///
/// Builds the [`AppContext`], runs the initial scan, and serves HTTP until a
/// shutdown signal arrives.
pub async fn start(config: Config) -> bc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let reader: Arc<dyn TagReader> = Arc::new(SymphoniaTagReader::new());
    let ctx = AppContext::new(config.clone(), reader);

    match &ctx.transcoder {
        Some(t) => tracing::info!(
            encoder = %t.encoder().path.display(),
            "Transcoding enabled"
        ),
        None => tracing::info!("Transcoding unavailable"),
    }

    let report = ctx.rescan().await?;
    tracing::info!(
        books = report.books,
        issues = report.issues.len(),
        duration_ms = report.duration_ms,
        "Initial scan complete"
    );
    for issue in &report.issues {
        tracing::warn!("Scan issue: {issue}");
    }

    let cancel = CancellationToken::new();

    let watcher_ctx = ctx.clone();
    let watcher_cancel = cancel.clone();
    let watcher_handle = tokio::spawn(async move {
        watcher::run_watcher(watcher_ctx, watcher_cancel).await;
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| bc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| bc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .map_err(|e| bc_core::Error::Internal(format!("Server error: {e}")))?;

    cancel.cancel();
    let _ = watcher_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
