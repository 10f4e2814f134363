//! Shared application context.
//!
//! [`AppContext`] is handed to every route handler via Axum state. The library
//! index owns the current snapshot; handlers look books up per request and
//! never keep them across a rescan.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use bc_av::{Encoder, Transcoder};
use bc_core::config::Config;
use bc_feed::FeedContext;
use bc_library::{BookAssembler, LibraryIndex, RescanReport};
use bc_probe::TagReader;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub library: Arc<LibraryIndex>,
    /// `None` when transcoding is disabled or no encoder was found.
    pub transcoder: Option<Transcoder>,
}

impl AppContext {
    /// Build the context from configuration. The library starts empty.
    pub fn new(config: Config, reader: Arc<dyn TagReader>) -> Self {
        let assembler = BookAssembler::new(reader, config.library.clone());
        let library = Arc::new(LibraryIndex::new(assembler));
        let transcoder = Encoder::discover(&config.transcode)
            .map(|encoder| Transcoder::new(encoder, config.transcode.bitrate.clone()));

        Self {
            config: Arc::new(config),
            library,
            transcoder,
        }
    }

    /// Run a library rescan on the blocking pool.
    ///
    /// Returns [`bc_core::Error::RescanInProgress`] when one is already running.
    pub async fn rescan(&self) -> bc_core::Result<RescanReport> {
        let library = Arc::clone(&self.library);
        tokio::task::spawn_blocking(move || library.rescan())
            .await
            .map_err(|e| bc_core::Error::Internal(format!("rescan task failed: {e}")))?
    }

    /// Base URL for links in feeds: the configured public URL, else derived
    /// from the request's `Host` header.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = self.config.server.public_url.as_deref() {
            return url.trim_end_matches('/').to_string();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{host}")
    }

    pub fn feed_context(&self, headers: &HeaderMap) -> FeedContext {
        FeedContext::new(self.base_url(headers)).with_ttl(self.config.feed.ttl_minutes)
    }
}
