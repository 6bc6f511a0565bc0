use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::Router;
use tower_http::decompression::RequestDecompressionLayer;

/// Builds the HTTP router. Gzip request bodies are decoded before the
/// request logger and handlers see them.
pub fn build_http_app(state: AppState) -> Router {
    api::routes()
        .with_state(state)
        .layer(middleware::from_fn(logging::request_logging))
        .layer(RequestDecompressionLayer::new())
}
