use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            email_api_url: String::new(),
            email_api_key: String::new(),
            email_from: "no-reply@test.example".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn parent(email: &str) -> Self {
        Self::new(email, "parent")
    }

    pub fn professional(email: &str) -> Self {
        Self::new(email, "professional")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows used by the wiremock-backed handler tests.
pub struct MockSupabaseRows;

impl MockSupabaseRows {
    pub fn parent_row(parent_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": parent_id,
            "user_id": Uuid::new_v4(),
            "name": name,
            "email": "parent@example.com",
            "childs_name": "Test Child",
            "childs_grade": "Grade 5",
            "phone_number": "+10000000000",
            "profile_image": null,
            "is_deleted": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn professional_row(professional_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": professional_id,
            "user_id": Uuid::new_v4(),
            "name": name,
            "bio": "Experienced tutor",
            "phone_number": "+10000000001",
            "profile_image": null,
            "qualification": "MSc Mathematics",
            "subjects": ["Mathematics"],
            "is_deleted": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn slot_row(
        professional_id: &str,
        day: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "professional_id": professional_id,
            "day": day,
            "start_time": start_time,
            "end_time": end_time,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn session_row(
        session_id: &str,
        parent_id: &str,
        professional_id: &str,
        status: &str,
        code: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "id": session_id,
            "parent_id": parent_id,
            "professional_id": professional_id,
            "conversation_id": null,
            "day": null,
            "date": null,
            "start_time": null,
            "end_time": null,
            "subject": "Mathematics",
            "status": status,
            "code": code,
            "is_session_verified": false,
            "is_deleted": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn confirmed_session_row(
        session_id: &str,
        parent_id: &str,
        professional_id: &str,
        day: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
    ) -> serde_json::Value {
        json!({
            "id": session_id,
            "parent_id": parent_id,
            "professional_id": professional_id,
            "conversation_id": null,
            "day": day,
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "subject": "Mathematics",
            "status": "Confirmed",
            "code": "ABC123",
            "is_session_verified": false,
            "is_deleted": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(!app_config.is_email_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::professional("pro@example.com");
        assert_eq!(user.email, "pro@example.com");
        assert_eq!(user.role, "professional");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::parent("parent@example.com");
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_token_roundtrip() {
        let config = TestConfig::default();
        let user = TestUser::parent("parent@example.com");
        let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

        let validated = crate::jwt::validate_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role, Some("parent".to_string()));
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = TestConfig::default();
        let user = TestUser::parent("parent@example.com");
        let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

        assert!(crate::jwt::validate_token(&token, &config.jwt_secret).is_err());
    }
}
