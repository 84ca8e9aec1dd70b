use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Parent, ParentError};

pub struct ParentService {
    supabase: SupabaseClient,
}

impl ParentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_parent(
        &self,
        parent_id: &str,
        auth_token: &str,
    ) -> Result<Parent, ParentError> {
        debug!("Fetching parent: {}", parent_id);

        let path = format!(
            "/rest/v1/parents?id=eq.{}&is_deleted=eq.false&limit=1",
            parent_id
        );

        let rows: Vec<Parent> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ParentError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ParentError::NotFound(format!("Parent {} not found", parent_id)))
    }
}
