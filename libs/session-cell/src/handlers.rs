use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AssignSessionRequest, ConfirmSessionRequest, SessionListQuery, SetCodeRequest,
    UpdateStatusRequest, VerifyCodeRequest,
};
use crate::services::{
    BookingService, LifecycleService, SessionQueryService, VerificationService,
};

#[derive(Debug, Deserialize, Default)]
pub struct AllSessionsQuery {
    pub parent_id: Option<uuid::Uuid>,
    pub professional_id: Option<uuid::Uuid>,
    pub status: Option<crate::models::SessionStatus>,
    pub subject: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl AllSessionsQuery {
    fn list(&self) -> SessionListQuery {
        SessionListQuery {
            parent_id: self.parent_id,
            professional_id: self.professional_id,
            status: self.status,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

fn require_role(user: &User, allowed: &[&str]) -> Result<(), AppError> {
    let role = user.role.as_deref().unwrap_or("");
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Auth(format!(
            "Role {:?} is not allowed to perform this action",
            role
        )))
    }
}

#[axum::debug_handler]
pub async fn assign_session(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AssignSessionRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = BookingService::new(&state);
    let outcome = service
        .assign_professional(request, &user.id, auth.token())
        .await?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn set_session_code(
    State(state): State<Arc<AppConfig>>,
    Path(session_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetCodeRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = BookingService::new(&state);
    let outcome = service
        .set_session_code(&session_id, &request.code, &user.id, auth.token())
        .await?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn confirm_session(
    State(state): State<Arc<AppConfig>>,
    Path(session_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ConfirmSessionRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["professional", "admin"])?;

    let service = LifecycleService::new(&state);
    let outcome = service
        .confirm_session(&session_id, request, auth.token())
        .await?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn update_session_status(
    State(state): State<Arc<AppConfig>>,
    Path(session_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["professional", "admin"])?;

    let service = LifecycleService::new(&state);
    let outcome = service
        .update_session_status(&session_id, request.status, auth.token())
        .await?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn remove_session(
    State(state): State<Arc<AppConfig>>,
    Path(session_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = LifecycleService::new(&state);
    let outcome = service.remove_session(&session_id, auth.token()).await?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn verify_session(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["professional", "admin"])?;

    let service = VerificationService::new(&state);
    let session = service
        .verify_session_by_code(&request.parent_id.to_string(), &request.code, auth.token())
        .await?;

    Ok(Json(json!({ "session": session })))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<Arc<AppConfig>>,
    Path(session_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = SessionQueryService::new(&state);
    let session = service.get_session(&session_id, auth.token()).await?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn get_my_sessions(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SessionListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = SessionQueryService::new(&state);
    let sessions = service
        .get_my_sessions(&user, &query, auth.token())
        .await?;

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_upcoming_sessions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = SessionQueryService::new(&state);
    let sessions = service.get_upcoming_sessions(&user, auth.token()).await?;

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_assigned_profiles(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = SessionQueryService::new(&state);
    let profiles = service.get_assigned_profiles(&user, auth.token()).await?;

    Ok(Json(json!({ "profiles": profiles })))
}

#[axum::debug_handler]
pub async fn get_all_sessions(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AllSessionsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = SessionQueryService::new(&state);
    let sessions = service
        .get_all_sessions(&query.list(), query.subject.as_deref(), auth.token())
        .await?;

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}
