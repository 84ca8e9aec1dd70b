use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{SessionError, SessionRecord};

/// Verification of a session by its code, performed by the professional at
/// the start of the session against the code the parent received by email.
pub struct VerificationService {
    supabase: SupabaseClient,
}

impl VerificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Look up the parent's session by code, tolerating stray whitespace
    /// and case differences when searching, but requiring an exact match to
    /// actually verify. No candidate at all is `NotFound`; a near miss
    /// (wrong case) is `InvalidCode`, so the caller can tell a typo from a
    /// code that does not exist.
    pub async fn verify_session_by_code(
        &self,
        parent_id: &str,
        code: &str,
        auth_token: &str,
    ) -> Result<SessionRecord, SessionError> {
        let normalized = code.trim();
        if normalized.is_empty() {
            return Err(SessionError::Validation(
                "Session code must not be empty".to_string(),
            ));
        }

        let path = format!(
            "/rest/v1/sessions?parent_id=eq.{}&code=ilike.{}&is_deleted=eq.false",
            parent_id,
            urlencoding::encode(normalized)
        );

        let candidates: Vec<SessionRecord> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        if candidates.is_empty() {
            return Err(SessionError::NotFound(format!(
                "No session found for code {}",
                normalized
            )));
        }

        let session = candidates
            .into_iter()
            .find(|s| s.code.as_deref() == Some(normalized))
            .ok_or_else(|| {
                debug!("Code {} matched only case-insensitively", normalized);
                SessionError::InvalidCode
            })?;

        let body = json!({
            "is_session_verified": true,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(
                Method::PATCH,
                &format!("/rest/v1/sessions?id=eq.{}", session.id),
                Some(auth_token),
                body,
            )
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::NotFound(format!("Session {} not found", session.id)))?;

        let verified: SessionRecord =
            serde_json::from_value(row).map_err(|e| SessionError::Database(e.to_string()))?;

        info!("Session {} verified by code", verified.id);
        Ok(verified)
    }
}
