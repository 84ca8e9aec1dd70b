use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::services::ParentService;

#[axum::debug_handler]
pub async fn get_parent(
    State(state): State<Arc<AppConfig>>,
    Path(parent_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ParentService::new(&state);

    let parent = service.get_parent(&parent_id, auth.token()).await?;

    Ok(Json(json!(parent)))
}
