use std::sync::Arc;

use axum::{routing::get, Router};

use parent_cell::router::parent_routes;
use professional_cell::router::professional_routes;
use session_cell::router::session_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "TutorLink API is running!" }))
        .nest("/parents", parent_routes(state.clone()))
        .nest("/professionals", professional_routes(state.clone()))
        .nest("/sessions", session_routes(state))
}
