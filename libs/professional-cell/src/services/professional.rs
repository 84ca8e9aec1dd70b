use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Professional, ProfessionalError};

pub struct ProfessionalService {
    supabase: SupabaseClient,
}

impl ProfessionalService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_professional(
        &self,
        professional_id: &str,
        auth_token: &str,
    ) -> Result<Professional, ProfessionalError> {
        debug!("Fetching professional: {}", professional_id);

        let path = format!(
            "/rest/v1/professionals?id=eq.{}&is_deleted=eq.false&limit=1",
            professional_id
        );

        let rows: Vec<Professional> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        rows.into_iter().next().ok_or_else(|| {
            ProfessionalError::NotFound(format!("Professional {} not found", professional_id))
        })
    }

    /// Existence check used before assigning a professional to a session.
    pub async fn professional_exists(
        &self,
        professional_id: &str,
        auth_token: &str,
    ) -> Result<bool, ProfessionalError> {
        match self.get_professional(professional_id, auth_token).await {
            Ok(_) => Ok(true),
            Err(ProfessionalError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
