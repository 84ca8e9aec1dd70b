use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};

use professional_cell::models::{parse_grid_time, ProfessionalError, Weekday};
use professional_cell::services::{AvailabilityService, ProfessionalService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    ConfirmSessionRequest, SessionError, SessionOutcome, SessionRecord, SessionStatus,
};
use crate::services::SessionQueryService;

/// Allowed status moves: `Upcoming -> Confirmed`, then `Confirmed` ends in
/// `Completed` or `Canceled`. An `Upcoming` session can also be canceled
/// outright. Terminal states admit nothing.
pub fn validate_status_transition(
    from: SessionStatus,
    to: SessionStatus,
) -> Result<(), SessionError> {
    let allowed = matches!(
        (from, to),
        (SessionStatus::Upcoming, SessionStatus::Confirmed)
            | (SessionStatus::Upcoming, SessionStatus::Canceled)
            | (SessionStatus::Confirmed, SessionStatus::Completed)
            | (SessionStatus::Confirmed, SessionStatus::Canceled)
    );

    if allowed {
        Ok(())
    } else {
        Err(SessionError::InvalidTransition { from, to })
    }
}

pub struct LifecycleService {
    supabase: SupabaseClient,
    availability: AvailabilityService,
    professionals: ProfessionalService,
    queries: SessionQueryService,
}

impl LifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            availability: AvailabilityService::new(config),
            professionals: ProfessionalService::new(config),
            queries: SessionQueryService::new(config),
        }
    }

    /// Both lifecycle writes require the session's professional to still
    /// exist; a vanished profile is a 404, not a slot error.
    async fn ensure_professional_exists(
        &self,
        session: &SessionRecord,
        auth_token: &str,
    ) -> Result<(), SessionError> {
        let exists = self
            .professionals
            .professional_exists(&session.professional_id.to_string(), auth_token)
            .await?;

        if exists {
            Ok(())
        } else {
            Err(SessionError::ProfessionalNotFound(format!(
                "Professional {} not found",
                session.professional_id
            )))
        }
    }

    /// Confirm a session onto a concrete slot. The slot is reserved before
    /// the session is touched, so losing the reservation race leaves the
    /// session exactly as it was. If the session write then fails, the
    /// reservation is compensated by releasing the slot again.
    pub async fn confirm_session(
        &self,
        session_id: &str,
        request: ConfirmSessionRequest,
        auth_token: &str,
    ) -> Result<SessionOutcome, SessionError> {
        parse_grid_time(&request.start_time)?;
        parse_grid_time(&request.end_time)?;

        let session = self.queries.get_session(session_id, auth_token).await?;
        self.ensure_professional_exists(&session, auth_token).await?;
        validate_status_transition(session.status, SessionStatus::Confirmed)?;

        let day = Weekday::from_date(request.date);
        let professional_id = session.professional_id.to_string();

        self.availability
            .reserve_slot(
                &professional_id,
                day,
                &request.start_time,
                &request.end_time,
                auth_token,
            )
            .await?;

        let body = json!({
            "day": day,
            "date": request.date,
            "start_time": request.start_time,
            "end_time": request.end_time,
            "status": SessionStatus::Confirmed,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let patched = self
            .supabase
            .mutate_returning(
                Method::PATCH,
                &format!("/rest/v1/sessions?id=eq.{}", session_id),
                Some(auth_token),
                body,
            )
            .await;

        let row = match patched {
            Ok(mut rows) if !rows.is_empty() => rows.remove(0),
            outcome => {
                // Undo the reservation so the slot does not leak.
                if let Err(release_err) = self
                    .availability
                    .release_slot(
                        &professional_id,
                        day,
                        &request.start_time,
                        &request.end_time,
                        auth_token,
                    )
                    .await
                {
                    warn!(
                        "Failed to release slot after confirm failure for session {}: {}",
                        session_id, release_err
                    );
                }

                return Err(match outcome {
                    Ok(_) => SessionError::NotFound(format!("Session {} not found", session_id)),
                    Err(e) => SessionError::Database(e.to_string()),
                });
            }
        };

        let updated: SessionRecord =
            serde_json::from_value(row).map_err(|e| SessionError::Database(e.to_string()))?;

        info!(
            "Session {} confirmed for {} {}-{}",
            session_id, request.date, request.start_time, request.end_time
        );

        Ok(SessionOutcome::clean(updated))
    }

    /// Move a session to `Completed` or `Canceled` and free its slot. A
    /// missing booked slot is reported as a warning on the result rather
    /// than failing the transition.
    pub async fn update_session_status(
        &self,
        session_id: &str,
        target: SessionStatus,
        auth_token: &str,
    ) -> Result<SessionOutcome, SessionError> {
        if !target.is_terminal() {
            return Err(SessionError::Validation(format!(
                "Status update only accepts Completed or Canceled, got {}",
                target
            )));
        }

        let session = self.queries.get_session(session_id, auth_token).await?;
        self.ensure_professional_exists(&session, auth_token).await?;
        validate_status_transition(session.status, target)?;

        let body = json!({
            "status": target,
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

        let mut warnings = Vec::new();
        if session.status == SessionStatus::Confirmed {
            if let Some(warning) = self.try_release(&session, auth_token).await {
                warnings.push(warning);
            }
        }

        info!("Session {} moved to {}", session_id, target);

        Ok(SessionOutcome {
            session: updated,
            warnings,
        })
    }

    /// Soft-delete a session. A confirmed session's slot is released first;
    /// if that fails the deletion still goes through, with a warning.
    pub async fn remove_session(
        &self,
        session_id: &str,
        auth_token: &str,
    ) -> Result<SessionOutcome, SessionError> {
        let session = self.queries.get_session(session_id, auth_token).await?;

        let mut warnings = Vec::new();
        if session.status == SessionStatus::Confirmed {
            if let Some(warning) = self.try_release(&session, auth_token).await {
                warnings.push(warning);
            }
        }

        let body = json!({
            "is_deleted": true,
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

        info!("Session {} removed", session_id);

        Ok(SessionOutcome {
            session: updated,
            warnings,
        })
    }

    /// Best-effort slot release for a confirmed session. Returns the
    /// warning to attach to the result when the release fails.
    async fn try_release(&self, session: &SessionRecord, auth_token: &str) -> Option<String> {
        let (day, start, end) = match (&session.day, &session.start_time, &session.end_time) {
            (Some(day), Some(start), Some(end)) => (*day, start.clone(), end.clone()),
            _ => {
                warn!(
                    "Confirmed session {} has no slot fields to release",
                    session.id
                );
                return Some(format!(
                    "Session {} is confirmed but carries no slot to release",
                    session.id
                ));
            }
        };

        match self
            .availability
            .release_slot(
                &session.professional_id.to_string(),
                day,
                &start,
                &end,
                auth_token,
            )
            .await
        {
            Ok(_) => None,
            Err(ProfessionalError::SlotNotFound) => {
                warn!(
                    "No booked slot found while releasing {} {}-{} for session {}",
                    day, start, end, session.id
                );
                Some(format!(
                    "No booked slot matched {} {}-{}; availability grid may need review",
                    day, start, end
                ))
            }
            Err(e) => {
                warn!("Slot release failed for session {}: {}", session.id, e);
                Some(format!("Slot release failed: {}", e))
            }
        }
    }
}
