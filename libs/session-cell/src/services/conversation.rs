use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Conversation, SessionError};

/// Find-or-create for the individual conversation between a parent and a
/// professional. Idempotent, so it is safe to run before the session row is
/// created: re-running a failed booking reuses the same conversation.
pub struct ConversationService {
    supabase: SupabaseClient,
}

impl ConversationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn find_or_create_individual(
        &self,
        parent_id: Uuid,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<Conversation, SessionError> {
        let path = format!(
            "/rest/v1/conversations?user_a=eq.{}&user_b=eq.{}&type=eq.individual&limit=1",
            parent_id, professional_id
        );

        let existing: Vec<Conversation> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        if let Some(conversation) = existing.into_iter().next() {
            debug!("Reusing conversation {}", conversation.id);
            return Ok(conversation);
        }

        let body = json!({
            "user_a": parent_id,
            "user_b": professional_id,
            "type": "individual",
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(Method::POST, "/rest/v1/conversations", Some(auth_token), body)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            SessionError::Database("Failed to create conversation".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| SessionError::Database(e.to_string()))
    }
}
