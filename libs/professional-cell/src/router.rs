use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn professional_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{professional_id}", get(handlers::get_professional))
        .route(
            "/{professional_id}/availability",
            get(handlers::get_availability),
        )
        .route(
            "/{professional_id}/availability",
            patch(handlers::edit_availability),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
