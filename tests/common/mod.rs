//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temporary library root, a config
//! pointing at it, and a full [`AppContext`] whose tag reader parses plain
//! `key=value;` text files instead of real audio.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bc_core::config::Config;
use bc_core::{BookId, Container, Error, FileId};
use bc_library::RescanReport;
use bc_probe::{TagReader, TrackTags};
use bc_server::{build_router, AppContext};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

/// Tag reader for text fixtures: `duration=60;title=Intro;album=Book`.
/// A body starting with `CORRUPT` fails like an unparseable container;
/// `sleep=<ms>` blocks the read.
pub struct FakeReader;

impl TagReader for FakeReader {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn supports(&self, path: &Path) -> bool {
        Container::from_path(path).is_some()
    }

    fn read(&self, path: &Path) -> bc_core::Result<TrackTags> {
        let body = std::fs::read_to_string(path)?;
        if body.starts_with("CORRUPT") {
            return Err(Error::corrupt(path, "no sync word"));
        }
        let container = Container::from_path(path)
            .ok_or_else(|| Error::UnsupportedFormat { path: path.to_path_buf() })?;
        let mut tags = TrackTags::new(container);
        for pair in body.trim().split(';').filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key.trim() {
                "duration" => tags.duration = value.parse().ok(),
                "title" => tags.title = Some(value.into()),
                "album" => tags.album = Some(value.into()),
                "artist" => tags.artist = Some(value.into()),
                "track" => tags.track_number = value.parse().ok(),
                "codec" => tags.codec = Some(value.into()),
                "sleep" => {
                    let millis = value.parse().unwrap_or(0);
                    std::thread::sleep(Duration::from_millis(millis));
                }
                _ => {}
            }
        }
        Ok(tags)
    }
}

pub struct TestHarness {
    pub root: TempDir,
    pub ctx: AppContext,
}

impl TestHarness {
    /// Harness with watching and transcoding disabled.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Harness whose config is adjusted by `f` before the context is built.
    pub fn with_config(f: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("failed to create library root");
        let mut config = Config::default();
        config.library.roots = vec![root.path().to_path_buf()];
        config.watch.enabled = false;
        config.transcode.enabled = false;
        f(&mut config);

        let ctx = AppContext::new(config, Arc::new(FakeReader));
        Self { root, ctx }
    }

    pub fn book_dir(&self, name: &str) -> PathBuf {
        let dir = self.root.path().join(name);
        std::fs::create_dir_all(&dir).expect("failed to create book dir");
        dir
    }

    /// Write `body` to `book/file`, creating the book directory.
    pub fn write(&self, book: &str, file: &str, body: impl AsRef<[u8]>) -> PathBuf {
        let path = self.book_dir(book).join(file);
        std::fs::write(&path, body).expect("failed to write fixture");
        path
    }

    /// Write a fixture padded with spaces to exactly `size` bytes.
    pub fn write_sized(&self, book: &str, file: &str, tags: &str, size: usize) -> Vec<u8> {
        let mut body = tags.as_bytes().to_vec();
        assert!(body.len() <= size, "tags longer than requested size");
        body.resize(size, b' ');
        self.write(book, file, &body);
        body
    }

    pub fn book_id(&self, name: &str) -> BookId {
        BookId::for_directory(&self.root.path().join(name))
    }

    pub fn file_id(&self, book: &str, file: &str) -> FileId {
        FileId::for_file(&self.book_id(book), file)
    }

    pub fn file_url(&self, book: &str, file: &str) -> String {
        format!("/books/{}/files/{}", self.book_id(book), self.file_id(book, file))
    }

    pub async fn rescan(&self) -> RescanReport {
        self.ctx.rescan().await.expect("rescan failed")
    }

    pub fn router(&self) -> Router {
        build_router(self.ctx.clone())
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }
}

/// Collect a response body into bytes.
pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

/// Collect a response body into a string.
pub async fn body_to_string(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).unwrap()
}

/// A minimal MP3 file: an ID3v2.3 tag with Latin-1 text frames such as
/// `("TALB", "My Album")`, then `frames` silent MPEG-1 Layer III frames at
/// 128 kbit/s, 44.1 kHz (1152 samples, 417 bytes each).
pub fn mp3_fixture(tags: &[(&str, &str)], frames: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for (id, text) in tags {
        assert_eq!(id.len(), 4, "frame ids are four bytes");
        body.extend_from_slice(id.as_bytes());
        body.extend_from_slice(&(text.len() as u32 + 1).to_be_bytes());
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(text.as_bytes());
    }

    let mut out = Vec::new();
    if !tags.is_empty() {
        let len = body.len() as u32;
        out.extend_from_slice(b"ID3\x03\x00\x00");
        out.extend([21, 14, 7, 0].map(|shift| ((len >> shift) & 0x7f) as u8));
        out.extend(body);
    }
    for _ in 0..frames {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        out.extend(frame);
    }
    out
}
