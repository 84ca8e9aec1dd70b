use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use parent_cell::services::ParentService;
use professional_cell::services::{AvailabilityService, ProfessionalService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    AssignSessionRequest, SessionError, SessionOutcome, SessionRecord, SessionStatus,
};
use crate::services::{ConversationService, DispatchService, SessionQueryService};

/// Booking coordinator. Orders each operation so that all validations and
/// idempotent writes happen before the single session INSERT or PATCH that
/// commits the booking; with no partial state to clean up, any failure
/// before the commit point leaves the store exactly as it was.
pub struct BookingService {
    supabase: SupabaseClient,
    parents: ParentService,
    professionals: ProfessionalService,
    availability: AvailabilityService,
    conversations: ConversationService,
    dispatch: DispatchService,
    queries: SessionQueryService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            parents: ParentService::new(config),
            professionals: ProfessionalService::new(config),
            availability: AvailabilityService::new(config),
            conversations: ConversationService::new(config),
            dispatch: DispatchService::new(config),
            queries: SessionQueryService::new(config),
        }
    }

    /// Assign a professional to a parent and create the session in
    /// `Upcoming`. The open-slot check here is a weak pre-check: it filters
    /// out professionals with nothing open, but the slot itself is only
    /// reserved later, at confirmation.
    pub async fn assign_professional(
        &self,
        request: AssignSessionRequest,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<SessionOutcome, SessionError> {
        let code = request.code.trim();
        if code.is_empty() {
            return Err(SessionError::Validation(
                "Session code must not be empty".to_string(),
            ));
        }

        let parent = self
            .parents
            .get_parent(&request.parent_id.to_string(), auth_token)
            .await?;

        let professional = self
            .professionals
            .get_professional(&request.professional_id.to_string(), auth_token)
            .await?;

        let has_open = self
            .availability
            .has_any_open_slot(&professional.id.to_string(), auth_token)
            .await?;
        if !has_open {
            return Err(SessionError::NoOpenSlots);
        }

        if let Some(holder) = self
            .queries
            .find_active_code_holder(code, None, auth_token)
            .await?
        {
            debug!("Code {} already held by session {}", code, holder.id);
            return Err(SessionError::CodeConflict(code.to_string()));
        }

        let conversation = self
            .conversations
            .find_or_create_individual(parent.id, professional.id, auth_token)
            .await?;

        // Commit point: everything above is a read or idempotent.
        let body = json!({
            "parent_id": parent.id,
            "professional_id": professional.id,
            "conversation_id": conversation.id,
            "subject": request.subject,
            "status": SessionStatus::Upcoming,
            "code": code,
            "is_session_verified": false,
            "is_deleted": false,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(Method::POST, "/rest/v1/sessions", Some(auth_token), body)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::Database("Failed to create session".to_string()))?;
        let session: SessionRecord =
            serde_json::from_value(row).map_err(|e| SessionError::Database(e.to_string()))?;

        info!(
            "Session {} created: parent {} with professional {}",
            session.id, parent.id, professional.id
        );

        let warnings = self
            .dispatch
            .dispatch_assignment(actor_id, &parent, &professional, code, auth_token)
            .await;

        Ok(SessionOutcome { session, warnings })
    }

    /// Replace the code on an `Upcoming` session, then re-send the
    /// assignment email with the new code (best effort).
    pub async fn set_session_code(
        &self,
        session_id: &str,
        code: &str,
        actor_id: &str,
        auth_token: &str,
    ) -> Result<SessionOutcome, SessionError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SessionError::Validation(
                "Session code must not be empty".to_string(),
            ));
        }

        let session = self.queries.get_session(session_id, auth_token).await?;
        if session.status != SessionStatus::Upcoming {
            return Err(SessionError::Validation(format!(
                "Only upcoming sessions can have their code changed (session is {})",
                session.status
            )));
        }

        let parent = self
            .parents
            .get_parent(&session.parent_id.to_string(), auth_token)
            .await?;
        let professional = self
            .professionals
            .get_professional(&session.professional_id.to_string(), auth_token)
            .await?;

        if self
            .queries
            .find_active_code_holder(code, Some(session_id), auth_token)
            .await?
            .is_some()
        {
            return Err(SessionError::CodeConflict(code.to_string()));
        }

        let body = json!({
            "code": code,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(
                Method::PATCH,
                &format!("/rest/v1/sessions?id=eq.{}", session_id),
                Some(auth_token),
                body,
            )
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::NotFound(format!("Session {} not found", session_id)))?;
        let updated: SessionRecord =
            serde_json::from_value(row).map_err(|e| SessionError::Database(e.to_string()))?;

        let warnings = self
            .dispatch
            .dispatch_assignment(actor_id, &parent, &professional, code, auth_token)
            .await;

        Ok(SessionOutcome {
            session: updated,
            warnings,
        })
    }
}
