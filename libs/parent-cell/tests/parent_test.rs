use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parent_cell::models::ParentError;
use parent_cell::services::ParentService;
use shared_config::AppConfig;
use shared_utils::test_utils::{MockSupabaseRows, TestConfig};

fn test_config(mock_uri: &str) -> AppConfig {
    TestConfig {
        supabase_url: mock_uri.to_string(),
        ..Default::default()
    }
    .to_app_config()
}

#[tokio::test]
async fn get_parent_returns_profile() {
    let mock_server = MockServer::start().await;
    let parent_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/parents"))
        .and(query_param("id", format!("eq.{}", parent_id)))
        .and(query_param("is_deleted", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::parent_row(&parent_id, "Pat Parent")
        ])))
        .mount(&mock_server)
        .await;

    let service = ParentService::new(&test_config(&mock_server.uri()));
    let parent = service.get_parent(&parent_id, "token").await.unwrap();

    assert_eq!(parent.name, "Pat Parent");
    assert!(!parent.is_deleted);
}

#[tokio::test]
async fn get_parent_misses_on_deleted_or_unknown() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/parents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = ParentService::new(&test_config(&mock_server.uri()));
    let result = service.get_parent(&Uuid::new_v4().to_string(), "token").await;

    assert_matches!(result, Err(ParentError::NotFound(_)));
}
