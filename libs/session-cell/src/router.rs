use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn session_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Booking
        .route("/assign", post(handlers::assign_session))
        .route("/{session_id}/code", patch(handlers::set_session_code))
        // Lifecycle
        .route("/{session_id}/confirm", post(handlers::confirm_session))
        .route("/{session_id}/status", patch(handlers::update_session_status))
        .route("/{session_id}", delete(handlers::remove_session))
        // Verification
        .route("/verify", post(handlers::verify_session))
        // Reads
        .route("/my", get(handlers::get_my_sessions))
        .route("/upcoming", get(handlers::get_upcoming_sessions))
        .route("/assigned-profiles", get(handlers::get_assigned_profiles))
        .route("/all", get(handlers::get_all_sessions))
        .route("/{session_id}", get(handlers::get_session))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
