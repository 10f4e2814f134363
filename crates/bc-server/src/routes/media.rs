//! Audio file delivery.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::Response;
use bc_av::TargetFormat;
use bc_core::{Error, FileId};
use serde::Deserialize;

use super::find_book;
use crate::context::AppContext;
use crate::error::AppError;
use crate::streaming;

#[derive(Debug, Default, Deserialize)]
pub struct MediaQuery {
    /// Requested output format (`mp3`, `opus`, `ogg`).
    pub format: Option<String>,
}

/// GET /books/{id}/files/{file_id}
///
/// Without `format`, or when it names the source format, the file is served
/// from disk with range and conditional semantics. Otherwise the output of
/// the encoder is streamed as 200 with no length, `Accept-Ranges: none`, and
/// any `Range` header ignored.
pub async fn get_file(
    State(ctx): State<AppContext>,
    Path((id, file_id)): Path<(String, String)>,
    Query(query): Query<MediaQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let book = find_book(&ctx, &id)?;
    let file = book
        .file(&FileId::from_raw(file_id.as_str()))
        .ok_or_else(|| Error::not_found("file", &file_id))?;
    let head = method == Method::HEAD;

    let target = match query.format.as_deref().filter(|f| !f.is_empty()) {
        Some(f) => Some(f.parse::<TargetFormat>()?),
        None => None,
    };

    let Some(target) = target.filter(|t| !t.matches(file)) else {
        return Ok(streaming::serve_file(&file.path, file.mime_type(), &headers, head).await?);
    };

    let transcoder = ctx
        .transcoder
        .as_ref()
        .ok_or_else(|| Error::transcode("encoder", "transcoding is not available"))?;

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, target.mime_type())
        .header(header::ACCEPT_RANGES, "none")
        .header(header::CACHE_CONTROL, "no-cache");

    let body = if head {
        Body::empty()
    } else {
        tracing::debug!(book = %book.id, file = %file.file_name, format = %target, "Transcoding");
        Body::from_stream(transcoder.stream(&file.path, target).await?)
    };

    builder
        .body(body)
        .map_err(|e| Error::Internal(format!("building response: {e}")).into())
}
