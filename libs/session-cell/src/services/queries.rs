use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use parent_cell::models::Parent;
use professional_cell::models::Professional;

use crate::models::{SessionError, SessionListQuery, SessionRecord, SessionStatus};

/// Read-side queries over the sessions table. All plain PostgREST GETs;
/// soft-deleted rows are always filtered out.
pub struct SessionQueryService {
    supabase: SupabaseClient,
}

impl SessionQueryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_session(
        &self,
        session_id: &str,
        auth_token: &str,
    ) -> Result<SessionRecord, SessionError> {
        let path = format!(
            "/rest/v1/sessions?id=eq.{}&is_deleted=eq.false&limit=1",
            session_id
        );

        let rows: Vec<SessionRecord> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| SessionError::NotFound(format!("Session {} not found", session_id)))
    }

    /// Sessions visible to the calling user, scoped through their parent or
    /// professional profile row.
    pub async fn get_my_sessions(
        &self,
        user: &User,
        query: &SessionListQuery,
        auth_token: &str,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        let (column, profile_id) = self.resolve_profile(user, auth_token).await?;

        let mut path = format!(
            "/rest/v1/sessions?{}=eq.{}&is_deleted=eq.false",
            column, profile_id
        );
        if let Some(status) = query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        path.push_str(&format!(
            "&order=created_at.desc&limit={}&offset={}",
            query.limit.unwrap_or(50),
            query.offset.unwrap_or(0)
        ));

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))
    }

    /// Upcoming workload: parents see `Upcoming` sessions, professionals see
    /// both `Upcoming` and `Confirmed`.
    pub async fn get_upcoming_sessions(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        let (column, profile_id) = self.resolve_profile(user, auth_token).await?;

        let status_filter = if column == "professional_id" {
            "status=in.(Upcoming,Confirmed)"
        } else {
            "status=eq.Upcoming"
        };

        let path = format!(
            "/rest/v1/sessions?{}=eq.{}&{}&is_deleted=eq.false&order=created_at.desc",
            column, profile_id, status_filter
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))
    }

    /// Admin listing with optional subject and status filters.
    pub async fn get_all_sessions(
        &self,
        query: &SessionListQuery,
        subject: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        let mut path = "/rest/v1/sessions?is_deleted=eq.false".to_string();

        if let Some(parent_id) = query.parent_id {
            path.push_str(&format!("&parent_id=eq.{}", parent_id));
        }
        if let Some(professional_id) = query.professional_id {
            path.push_str(&format!("&professional_id=eq.{}", professional_id));
        }
        if let Some(status) = query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        if let Some(subject) = subject {
            path.push_str(&format!("&subject=eq.{}", urlencoding::encode(subject)));
        }
        path.push_str(&format!(
            "&order=created_at.desc&limit={}&offset={}",
            query.limit.unwrap_or(50),
            query.offset.unwrap_or(0)
        ));

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))
    }

    /// Profiles on the other side of the caller's non-deleted sessions:
    /// professionals for a parent, parents for a professional.
    pub async fn get_assigned_profiles(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<serde_json::Value, SessionError> {
        let (column, profile_id) = self.resolve_profile(user, auth_token).await?;

        let path = format!(
            "/rest/v1/sessions?{}=eq.{}&is_deleted=eq.false",
            column, profile_id
        );
        let sessions: Vec<SessionRecord> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        let mut counterpart_ids: Vec<Uuid> = Vec::new();
        for session in &sessions {
            let id = if column == "parent_id" {
                session.professional_id
            } else {
                session.parent_id
            };
            if !counterpart_ids.contains(&id) {
                counterpart_ids.push(id);
            }
        }

        if counterpart_ids.is_empty() {
            return Ok(serde_json::json!([]));
        }

        let id_list = counterpart_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        if column == "parent_id" {
            let profiles: Vec<Professional> = self
                .supabase
                .request(
                    Method::GET,
                    &format!(
                        "/rest/v1/professionals?id=in.({})&is_deleted=eq.false",
                        id_list
                    ),
                    Some(auth_token),
                    None,
                )
                .await
                .map_err(|e| SessionError::Database(e.to_string()))?;
            Ok(serde_json::json!(profiles))
        } else {
            let profiles: Vec<Parent> = self
                .supabase
                .request(
                    Method::GET,
                    &format!("/rest/v1/parents?id=in.({})&is_deleted=eq.false", id_list),
                    Some(auth_token),
                    None,
                )
                .await
                .map_err(|e| SessionError::Database(e.to_string()))?;
            Ok(serde_json::json!(profiles))
        }
    }

    /// Sessions with the supplied code that are still `Upcoming`. Used for
    /// the active-code uniqueness check; `exclude_session_id` lets updates
    /// skip the row being edited.
    pub async fn find_active_code_holder(
        &self,
        code: &str,
        exclude_session_id: Option<&str>,
        auth_token: &str,
    ) -> Result<Option<SessionRecord>, SessionError> {
        let mut path = format!(
            "/rest/v1/sessions?code=eq.{}&status=eq.{}&is_deleted=eq.false",
            urlencoding::encode(code),
            SessionStatus::Upcoming
        );
        if let Some(id) = exclude_session_id {
            path.push_str(&format!("&id=neq.{}", id));
        }
        path.push_str("&limit=1");

        let rows: Vec<SessionRecord> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SessionError::Database(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Resolve the caller's profile row (parent or professional) from their
    /// auth user id, returning the sessions column to filter on.
    async fn resolve_profile(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<(&'static str, Uuid), SessionError> {
        let role = user.role.as_deref().unwrap_or("");
        debug!("Resolving {} profile for user {}", role, user.id);

        match role {
            "parent" => {
                let rows: Vec<Parent> = self
                    .supabase
                    .request(
                        Method::GET,
                        &format!(
                            "/rest/v1/parents?user_id=eq.{}&is_deleted=eq.false&limit=1",
                            user.id
                        ),
                        Some(auth_token),
                        None,
                    )
                    .await
                    .map_err(|e| SessionError::Database(e.to_string()))?;
                let parent = rows.into_iter().next().ok_or_else(|| {
                    SessionError::ParentNotFound(format!("No parent profile for user {}", user.id))
                })?;
                Ok(("parent_id", parent.id))
            }
            "professional" => {
                let rows: Vec<Professional> = self
                    .supabase
                    .request(
                        Method::GET,
                        &format!(
                            "/rest/v1/professionals?user_id=eq.{}&is_deleted=eq.false&limit=1",
                            user.id
                        ),
                        Some(auth_token),
                        None,
                    )
                    .await
                    .map_err(|e| SessionError::Database(e.to_string()))?;
                let professional = rows.into_iter().next().ok_or_else(|| {
                    SessionError::ProfessionalNotFound(format!(
                        "No professional profile for user {}",
                        user.id
                    ))
                })?;
                Ok(("professional_id", professional.id))
            }
            other => Err(SessionError::Validation(format!(
                "Role {:?} has no session scope",
                other
            ))),
        }
    }
}
