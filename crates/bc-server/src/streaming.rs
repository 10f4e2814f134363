//! Byte-range and conditional request handling for on-disk resources.
//!
//! Files are streamed with `ReaderStream` in 64KB chunks, so a slow client
//! applies backpressure to disk reads and a disconnect drops the file handle.

use std::path::Path;
use std::time::SystemTime;

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use bc_core::Error;

/// Read size for file bodies.
const CHUNK_SIZE: usize = 64 * 1024;

/// Format used for `Last-Modified` and friends.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Outcome of evaluating a `Range` header against a resource size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// Serve the whole resource.
    Full,
    /// Serve `start..=end`.
    Partial { start: u64, end: u64 },
    /// The range starts beyond the resource.
    Unsatisfiable,
}

/// Resolve a `Range` header value for a resource of `size` bytes.
///
/// Only single `bytes=` ranges are honoured. Multi-range and malformed
/// headers fall back to [`RangeSpec::Full`]. Open ends are clamped to the
/// last byte; `bytes=-N` selects the final `N` bytes.
pub fn resolve_range(value: Option<&str>, size: u64) -> RangeSpec {
    let Some(value) = value else {
        return RangeSpec::Full;
    };
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return RangeSpec::Full;
    };
    if spec.contains(',') {
        return RangeSpec::Full;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return RangeSpec::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let Ok(suffix) = end.parse::<u64>() else {
            return RangeSpec::Full;
        };
        if suffix == 0 || size == 0 {
            return RangeSpec::Unsatisfiable;
        }
        return RangeSpec::Partial {
            start: size.saturating_sub(suffix),
            end: size - 1,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return RangeSpec::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return RangeSpec::Full,
        }
    };

    if start >= size {
        return RangeSpec::Unsatisfiable;
    }
    let last = size - 1;
    RangeSpec::Partial {
        start,
        end: end.map_or(last, |e| e.min(last)),
    }
}

/// Cache validators for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Quoted strong entity tag.
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl Validators {
    /// Validators for a file, derived from its size and mtime.
    pub fn for_file(size: u64, modified: SystemTime) -> Self {
        let last_modified = DateTime::<Utc>::from(modified);
        let nanos = last_modified.timestamp_nanos_opt().unwrap_or_default();
        Self {
            etag: format!("\"{size:x}-{nanos:x}\""),
            last_modified,
        }
    }

    pub fn last_modified_header(&self) -> String {
        format_http_date(&self.last_modified)
    }

    /// Whether a conditional GET can be answered with 304.
    ///
    /// `If-None-Match` takes precedence; `If-Modified-Since` is only
    /// consulted when it is absent.
    pub fn not_modified(&self, headers: &HeaderMap) -> bool {
        if let Some(inm) = header_str(headers, header::IF_NONE_MATCH) {
            return etag_list_matches(inm, &self.etag);
        }
        match header_str(headers, header::IF_MODIFIED_SINCE).and_then(parse_http_date) {
            Some(since) => self.last_modified.timestamp() <= since.timestamp(),
            None => false,
        }
    }

    /// Whether an `If-Range` precondition (if any) still holds.
    pub fn if_range_holds(&self, headers: &HeaderMap) -> bool {
        let Some(value) = header_str(headers, header::IF_RANGE) else {
            return true;
        };
        let value = value.trim();
        if value.starts_with('"') {
            return value == self.etag;
        }
        parse_http_date(value).is_some_and(|d| d.timestamp() == self.last_modified.timestamp())
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn etag_list_matches(list: &str, etag: &str) -> bool {
    list.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format(HTTP_DATE).to_string()
}

/// Parse an IMF-fixdate, falling back to general RFC 2822.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, HTTP_DATE)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc2822(value)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}

/// A 304 response carrying the validators.
pub fn not_modified_response(validators: &Validators) -> Result<Response, Error> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::ETAG, &validators.etag)
        .header(header::LAST_MODIFIED, validators.last_modified_header())
        .body(Body::empty())
        .map_err(|e| Error::Internal(format!("building response: {e}")))
}

/// Serve a file from disk with range and conditional semantics.
///
/// Metadata is read at request time, so a file replaced since the last scan
/// is served with its current size and validators. When `head` is set the
/// file is not opened.
pub async fn serve_file(
    path: &Path,
    content_type: &str,
    headers: &HeaderMap,
    head: bool,
) -> Result<Response, Error> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::not_found("file", path.display()),
        _ => Error::Io { source: e },
    })?;
    let size = metadata.len();
    let validators = Validators::for_file(size, metadata.modified()?);

    if validators.not_modified(headers) {
        return not_modified_response(&validators);
    }

    let range = if validators.if_range_holds(headers) {
        resolve_range(header_str(headers, header::RANGE), size)
    } else {
        RangeSpec::Full
    };

    let (status, start, length) = match range {
        RangeSpec::Full => (StatusCode::OK, 0, size),
        RangeSpec::Partial { start, end } => (StatusCode::PARTIAL_CONTENT, start, end - start + 1),
        RangeSpec::Unsatisfiable => return Err(Error::RangeNotSatisfiable { size }),
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::ETAG, &validators.etag)
        .header(header::LAST_MODIFIED, validators.last_modified_header());
    if status == StatusCode::PARTIAL_CONTENT {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {start}-{}/{size}", start + length - 1),
        );
    }

    let body = if head || length == 0 {
        Body::empty()
    } else {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found("file", path.display()),
            _ => Error::Io { source: e },
        })?;
        if start > 0 {
            file.seek(std::io::SeekFrom::Start(start)).await?;
        }
        // Take limits reads to exactly `length` bytes.
        Body::from_stream(ReaderStream::with_capacity(file.take(length), CHUNK_SIZE))
    };

    builder
        .body(body)
        .map_err(|e| Error::Internal(format!("building response: {e}")))
}
