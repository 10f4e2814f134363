//! Library maintenance handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::context::AppContext;
use crate::error::AppError;

/// POST /library/rescan
///
/// Runs a rescan and returns its report with 202. A request arriving while
/// a rescan is running is coalesced into it and answered with 409.
pub async fn rescan(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let report = ctx.rescan().await?;
    tracing::info!(
        books = report.books,
        added = report.added,
        updated = report.updated,
        removed = report.removed,
        issues = report.issues.len(),
        "Manual rescan finished"
    );
    Ok((StatusCode::ACCEPTED, Json(report)))
}
