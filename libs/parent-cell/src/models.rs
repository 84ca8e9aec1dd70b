use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub childs_name: Option<String>,
    pub childs_grade: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Error, Debug)]
pub enum ParentError {
    #[error("Parent not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<ParentError> for AppError {
    fn from(err: ParentError) -> Self {
        match err {
            ParentError::NotFound(msg) => AppError::NotFound(msg),
            ParentError::Database(msg) => AppError::Database(msg),
        }
    }
}
