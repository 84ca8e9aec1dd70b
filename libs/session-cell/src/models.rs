use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use professional_cell::models::Weekday;
use shared_models::error::AppError;

/// Session lifecycle. A session is created `Upcoming` (assigned but not
/// scheduled), becomes `Confirmed` once a concrete slot is reserved, and
/// ends `Completed` or `Canceled`. Terminal states accept no transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Upcoming,
    Confirmed,
    Completed,
    Canceled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Upcoming => "Upcoming",
            SessionStatus::Confirmed => "Confirmed",
            SessionStatus::Completed => "Completed",
            SessionStatus::Canceled => "Canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Canceled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub professional_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub day: Option<Weekday>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub subject: Option<String>,
    pub status: SessionStatus,
    pub code: Option<String>,
    #[serde(default)]
    pub is_session_verified: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Direct conversation between the two parties of a session. `user_a` is
/// always the parent and `user_b` the professional, so find-or-create can
/// key on a single ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignSessionRequest {
    pub parent_id: Uuid,
    pub professional_id: Uuid,
    pub code: String,
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetCodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmSessionRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub parent_id: Uuid,
    pub code: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct SessionListQuery {
    pub parent_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// Result of a booking operation. `warnings` carries failures from
/// best-effort side effects (email, notifications, slot release) that did
/// not roll the operation back.
#[derive(Debug, Serialize)]
pub struct SessionOutcome {
    pub session: SessionRecord,
    pub warnings: Vec<String>,
}

impl SessionOutcome {
    pub fn clean(session: SessionRecord) -> Self {
        Self {
            session,
            warnings: Vec::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Professional not found: {0}")]
    ProfessionalNotFound(String),

    #[error("Professional has no open availability slots")]
    NoOpenSlots,

    #[error("Session code already in use: {0}")]
    CodeConflict(String),

    #[error("Invalid session code")]
    InvalidCode,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("The selected time slot is not available")]
    SlotNotAvailable,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(msg) => AppError::NotFound(msg),
            SessionError::ParentNotFound(msg) => AppError::NotFound(msg),
            SessionError::ProfessionalNotFound(msg) => AppError::NotFound(msg),
            SessionError::NoOpenSlots => {
                AppError::BadRequest("Professional has no open availability slots".to_string())
            }
            SessionError::CodeConflict(msg) => {
                AppError::Conflict(format!("Session code already in use: {}", msg))
            }
            SessionError::InvalidCode => AppError::BadRequest("Invalid session code".to_string()),
            SessionError::InvalidTransition { from, to } => AppError::Conflict(format!(
                "Cannot move session from {} to {}",
                from, to
            )),
            SessionError::SlotNotAvailable => {
                AppError::Conflict("The selected time slot is not available".to_string())
            }
            SessionError::Validation(msg) => AppError::ValidationError(msg),
            SessionError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<parent_cell::models::ParentError> for SessionError {
    fn from(err: parent_cell::models::ParentError) -> Self {
        use parent_cell::models::ParentError;
        match err {
            ParentError::NotFound(msg) => SessionError::ParentNotFound(msg),
            ParentError::Database(msg) => SessionError::Database(msg),
        }
    }
}

impl From<professional_cell::models::ProfessionalError> for SessionError {
    fn from(err: professional_cell::models::ProfessionalError) -> Self {
        use professional_cell::models::ProfessionalError;
        match err {
            ProfessionalError::NotFound(msg) => SessionError::ProfessionalNotFound(msg),
            ProfessionalError::SlotNotAvailable => SessionError::SlotNotAvailable,
            ProfessionalError::SlotNotFound => {
                SessionError::NotFound("No booked slot matches the session time".to_string())
            }
            ProfessionalError::OverlappingSlots(msg) | ProfessionalError::Validation(msg) => {
                SessionError::Validation(msg)
            }
            ProfessionalError::Database(msg) => SessionError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_capitalized() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Upcoming).unwrap(),
            "\"Upcoming\""
        );
        let status: SessionStatus = serde_json::from_str("\"Canceled\"").unwrap();
        assert_eq!(status, SessionStatus::Canceled);
    }

    #[test]
    fn terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Canceled.is_terminal());
        assert!(!SessionStatus::Upcoming.is_terminal());
        assert!(!SessionStatus::Confirmed.is_terminal());
    }
}
