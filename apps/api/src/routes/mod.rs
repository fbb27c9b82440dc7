pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/shortlist", post(handlers::handle_shortlist))
        .route("/api/v1/package", post(handlers::handle_package))
        .route("/api/v1/corpus/reload", post(handlers::handle_reload))
        .route(
            "/api/v1/items/:item_id/bullets",
            get(handlers::handle_item_bullets),
        )
        .with_state(state)
}
