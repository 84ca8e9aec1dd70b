use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use parent_cell::models::Parent;
use professional_cell::models::Professional;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

/// Post-commit side effects of a booking: the assignment email to the
/// parent and one in-app notification per party. Everything here is best
/// effort: failures are logged, collected as warnings, and never bubble up
/// as errors, since the session row is already committed.
pub struct DispatchService {
    config: AppConfig,
    supabase: SupabaseClient,
    http: reqwest::Client,
}

impl DispatchService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
            supabase: SupabaseClient::new(config),
            http: reqwest::Client::new(),
        }
    }

    pub async fn dispatch_assignment(
        &self,
        actor_id: &str,
        parent: &Parent,
        professional: &Professional,
        code: &str,
        auth_token: &str,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.send_assignment_email(parent, professional, code).await {
            warn!("Assignment email failed: {}", e);
            warnings.push(format!("Assignment email not sent: {}", e));
        }

        let parent_message = format!(
            "{} has been assigned as your child's tutor. Your session code is {}.",
            professional.name, code
        );
        if let Err(e) = self
            .create_notification(actor_id, parent.user_id, "session_assigned", &parent_message, auth_token)
            .await
        {
            warn!("Parent notification failed: {}", e);
            warnings.push(format!("Parent notification not created: {}", e));
        }

        let professional_message = format!(
            "You have been assigned a new session with {}.",
            parent.name
        );
        if let Err(e) = self
            .create_notification(
                actor_id,
                professional.user_id,
                "session_assigned",
                &professional_message,
                auth_token,
            )
            .await
        {
            warn!("Professional notification failed: {}", e);
            warnings.push(format!("Professional notification not created: {}", e));
        }

        warnings
    }

    async fn send_assignment_email(
        &self,
        parent: &Parent,
        professional: &Professional,
        code: &str,
    ) -> Result<(), String> {
        if !self.config.is_email_configured() {
            return Err("email delivery is not configured".to_string());
        }

        let to = parent
            .email
            .as_deref()
            .ok_or_else(|| "parent has no email address".to_string())?;

        let html = format!(
            "<div style=\"font-family:sans-serif\">\
             <h2>Your tutoring session is booked</h2>\
             <p>Hi {},</p>\
             <p>{} has been assigned as your child's tutor.</p>\
             <p>Share this code with your tutor at the start of the session:</p>\
             <p style=\"font-size:24px;font-weight:bold;letter-spacing:2px\">{}</p>\
             </div>",
            parent.name, professional.name, code
        );

        let body = json!({
            "from": self.config.email_from,
            "to": to,
            "subject": "Your tutoring session code",
            "html": html,
        });

        let response = self
            .http
            .post(&self.config.email_api_url)
            .bearer_auth(&self.config.email_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("email API returned {}", response.status()));
        }

        debug!("Assignment email sent to {}", to);
        Ok(())
    }

    async fn create_notification(
        &self,
        sender_id: &str,
        recipient_id: Uuid,
        kind: &str,
        message: &str,
        auth_token: &str,
    ) -> Result<(), String> {
        let body = json!({
            "sender_id": sender_id,
            "recipient_id": recipient_id,
            "type": kind,
            "message": message,
            "is_read": false,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(Method::POST, "/rest/v1/notifications", Some(auth_token), body)
            .await
            .map_err(|e| e.to_string())?;

        if rows.is_empty() {
            return Err("notification row was not created".to_string());
        }

        Ok(())
    }
}
