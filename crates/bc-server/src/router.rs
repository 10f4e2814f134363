//! Axum router construction.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// Build the complete Axum router.
///
/// `get` routes also answer `HEAD`; handlers that stream from disk skip
/// opening the file for those.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/books", get(routes::books::list_books))
        .route("/books/{id}/feed.xml", get(routes::books::get_feed))
        .route("/books/{id}/cover", get(routes::books::get_cover))
        .route("/books/{id}/files/{file_id}", get(routes::media::get_file))
        .route("/library/rescan", post(routes::library::rescan))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}
