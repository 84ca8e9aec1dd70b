use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::EditAvailabilityRequest;
use crate::services::{AvailabilityService, ProfessionalService};

#[axum::debug_handler]
pub async fn get_professional(
    State(state): State<Arc<AppConfig>>,
    Path(professional_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ProfessionalService::new(&state);

    let professional = service
        .get_professional(&professional_id, auth.token())
        .await?;

    Ok(Json(json!(professional)))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(professional_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let availability = service
        .get_weekly_availability(&professional_id, auth.token())
        .await?;

    Ok(Json(json!({ "availability": availability })))
}

/// Professionals edit their own grid; admins can edit anyone's.
#[axum::debug_handler]
pub async fn edit_availability(
    State(state): State<Arc<AppConfig>>,
    Path(professional_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<EditAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let role = user.role.as_deref().unwrap_or("");
    if role != "professional" && role != "admin" {
        return Err(AppError::Auth(
            "Only professionals can edit availability".to_string(),
        ));
    }

    let service = AvailabilityService::new(&state);

    let slots = service
        .edit_availability(
            &professional_id,
            request.day,
            request.time_slots,
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "day": request.day,
        "time_slots": slots
    })))
}
