use axum::routing::{get, post};
use axum::Router;
use recon_resolver::IdentityResolver;
use tower_http::trace::TraceLayer;

use crate::handler;

/// Build the axum router with all endpoints.
pub fn build_router(resolver: IdentityResolver) -> Router {
    Router::new()
        .route("/identify", post(handler::identify_handler))
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(resolver)
}
