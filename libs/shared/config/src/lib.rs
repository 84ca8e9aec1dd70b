use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_API_URL not set, assignment emails will be skipped");
                    String::new()
                }),
            email_api_key: env::var("EMAIL_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_API_KEY not set, assignment emails will be skipped");
                    String::new()
                }),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@tutorlink.example".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Email delivery is optional; booking still succeeds without it.
    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty() && !self.email_api_key.is_empty()
    }
}
