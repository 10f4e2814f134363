//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, AppError>`; any [`bc_core::Error`] converts with
//! `?` and renders as a JSON body with a matching status code.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: bc_core::Error,
}

impl AppError {
    pub fn new(inner: bc_core::Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &bc_core::Error {
        &self.inner
    }
}

impl From<bc_core::Error> for AppError {
    fn from(e: bc_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in handler"
            );
        }

        let code = match &self.inner {
            bc_core::Error::NotFound { .. } => "not_found",
            bc_core::Error::Validation(_) => "validation_error",
            bc_core::Error::RescanInProgress => "rescan_in_progress",
            bc_core::Error::UnsupportedFormat { .. } => "unsupported_format",
            bc_core::Error::CorruptFile { .. } => "corrupt_file",
            bc_core::Error::Scan { .. } => "scan_error",
            bc_core::Error::Schema { .. } => "schema_error",
            bc_core::Error::InvalidChapter(_) => "invalid_chapter",
            bc_core::Error::EmptyDirectory(_) => "empty_directory",
            bc_core::Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            bc_core::Error::Transcode { .. } => "transcode_error",
            bc_core::Error::Io { .. } => "io_error",
            bc_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let bc_core::Error::RangeNotSatisfiable { size } = self.inner {
            if let Ok(value) = format!("bytes */{size}").parse() {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::new(bc_core::Error::not_found("book", "abc"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rescan_in_progress_produces_409() {
        let response = AppError::new(bc_core::Error::RescanInProgress).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unsatisfiable_range_carries_content_range() {
        let response =
            AppError::new(bc_core::Error::RangeNotSatisfiable { size: 1000 }).into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
    }

    #[test]
    fn transcode_failure_is_bad_gateway() {
        let response =
            AppError::new(bc_core::Error::transcode("ffmpeg", "boom")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
