//! Book listing, feed, and cover handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::Response;
use axum::Json;
use bc_core::{CoverRef, Error};
use bc_feed::{render_feed, RSS_CONTENT_TYPE};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::find_book;
use crate::context::AppContext;
use crate::error::AppError;
use crate::streaming::{self, Validators};

/// Summary row returned by `GET /books`.
#[derive(Debug, Serialize)]
pub struct BookSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub files: usize,
    /// Total duration in seconds.
    pub duration: f64,
    pub chapters: usize,
    pub feed_url: String,
}

/// GET /books
pub async fn list_books(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Json<Vec<BookSummary>> {
    let feed = ctx.feed_context(&headers);
    let snapshot = ctx.library.snapshot();
    let books = snapshot
        .books()
        .map(|book| BookSummary {
            id: book.id.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            files: book.files.len(),
            duration: book.total_duration(),
            chapters: book.chapters.len(),
            feed_url: feed.feed_url(book),
        })
        .collect();
    Json(books)
}

/// GET /books/{id}/feed.xml
///
/// The ETag is a digest of the rendered document, so any change that alters
/// the output (including the base URL) invalidates cached copies.
pub async fn get_feed(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let book = find_book(&ctx, &id)?;
    let xml = render_feed(&book, &ctx.feed_context(&headers))?;

    let digest = hex::encode(Sha256::digest(xml.as_bytes()));
    let validators = Validators {
        etag: format!("\"{}\"", &digest[..32]),
        last_modified: book.modified,
    };
    if validators.not_modified(&headers) {
        return Ok(streaming::not_modified_response(&validators)?);
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, RSS_CONTENT_TYPE)
        .header(header::ETAG, &validators.etag)
        .header(header::LAST_MODIFIED, validators.last_modified_header())
        .body(Body::from(xml))
        .map_err(|e| Error::Internal(format!("building response: {e}")).into())
}

/// GET /books/{id}/cover
///
/// Only local covers are served; a cover given as a URL is linked directly
/// from the feed.
pub async fn get_cover(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let book = find_book(&ctx, &id)?;
    let cover = book.cover.as_ref().ok_or_else(|| Error::not_found("cover", &id))?;
    let (CoverRef::File(path), Some(mime)) = (cover, cover.mime_type()) else {
        return Err(Error::not_found("cover", &id).into());
    };
    let response = streaming::serve_file(path, mime, &headers, method == Method::HEAD).await?;
    Ok(response)
}
