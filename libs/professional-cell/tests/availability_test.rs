use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use professional_cell::handlers;
use professional_cell::models::{
    EditAvailabilityRequest, ProfessionalError, SlotStatus, TimeSlot, Weekday,
};
use professional_cell::services::AvailabilityService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseRows, TestConfig};

fn test_config(mock_uri: &str) -> AppConfig {
    TestConfig {
        supabase_url: mock_uri.to_string(),
        ..Default::default()
    }
    .to_app_config()
}

fn test_state(mock_uri: &str) -> Arc<AppConfig> {
    Arc::new(test_config(mock_uri))
}

fn auth_header() -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer("test-token").unwrap())
}

fn user_extension(role: &str) -> Extension<User> {
    Extension(User {
        id: Uuid::new_v4().to_string(),
        email: Some(format!("{}@example.com", role)),
        role: Some(role.to_string()),
        metadata: None,
        created_at: Some(chrono::Utc::now()),
    })
}

#[tokio::test]
async fn reserve_slot_flips_available_to_booked() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("professional_id", format!("eq.{}", professional_id)))
        .and(query_param("day", "eq.Monday"))
        .and(query_param("start_time", "eq.09:00"))
        .and(query_param("end_time", "eq.10:00"))
        .and(query_param("status", "eq.available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::slot_row(&professional_id, "Monday", "09:00", "10:00", "booked")
        ])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let slot = service
        .reserve_slot(&professional_id, Weekday::Monday, "09:00", "10:00", "token")
        .await
        .unwrap();

    assert_eq!(slot.status, SlotStatus::Booked);
    assert_eq!(slot.day, Weekday::Monday);
}

#[tokio::test]
async fn reserve_slot_reports_lost_race_as_not_available() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    // Empty representation: the predicate matched no available row.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("status", "eq.available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let result = service
        .reserve_slot(&professional_id, Weekday::Monday, "09:00", "10:00", "token")
        .await;

    assert_matches!(result, Err(ProfessionalError::SlotNotAvailable));
}

#[tokio::test]
async fn release_slot_misses_loudly() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("status", "eq.booked"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let result = service
        .release_slot(&professional_id, Weekday::Friday, "14:00", "15:00", "token")
        .await;

    assert_matches!(result, Err(ProfessionalError::SlotNotFound));
}

#[tokio::test]
async fn release_slot_returns_slot_to_pool() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("status", "eq.booked"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::slot_row(&professional_id, "Friday", "14:00", "15:00", "available")
        ])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let slot = service
        .release_slot(&professional_id, Weekday::Friday, "14:00", "15:00", "token")
        .await
        .unwrap();

    assert_eq!(slot.status, SlotStatus::Available);
}

#[tokio::test]
async fn has_any_open_slot_checks_for_available_rows() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("status", "eq.available"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::slot_row(&professional_id, "Tuesday", "10:00", "11:00", "available")
        ])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    assert!(service
        .has_any_open_slot(&professional_id, "token")
        .await
        .unwrap());
}

#[tokio::test]
async fn has_any_open_slot_false_when_grid_is_full() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    assert!(!service
        .has_any_open_slot(&professional_id, "token")
        .await
        .unwrap());
}

async fn mount_professional_mock(mock_server: &MockServer, professional_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::professional_row(professional_id, "Taylor Tutor")
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn edit_availability_inserts_missing_slot() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    mount_professional_mock(&mock_server, &professional_id).await;

    // No stored rows for the day, no existing row for the range.
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseRows::slot_row(&professional_id, "Wednesday", "09:00", "10:00", "available")
        ])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let slots = service
        .edit_availability(
            &professional_id,
            Weekday::Wednesday,
            vec![TimeSlot {
                start_time: "09:00".to_string(),
                end_time: "10:00".to_string(),
                status: SlotStatus::Available,
            }],
            "token",
        )
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].status, SlotStatus::Available);
}

#[tokio::test]
async fn edit_availability_rejects_overlapping_submission() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let result = service
        .edit_availability(
            &professional_id,
            Weekday::Thursday,
            vec![
                TimeSlot {
                    start_time: "09:00".to_string(),
                    end_time: "11:00".to_string(),
                    status: SlotStatus::Available,
                },
                TimeSlot {
                    start_time: "10:00".to_string(),
                    end_time: "12:00".to_string(),
                    status: SlotStatus::Available,
                },
            ],
            "token",
        )
        .await;

    assert_matches!(result, Err(ProfessionalError::OverlappingSlots(_)));
    // Nothing may reach the store when validation fails.
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_availability_rejects_overlap_with_stored_row() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    mount_professional_mock(&mock_server, &professional_id).await;

    // The day already has a 09:00-10:00 row; a straddling 09:30-10:30
    // submission is not an identity match and must be refused.
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::slot_row(&professional_id, "Monday", "09:00", "10:00", "available")
        ])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let result = service
        .edit_availability(
            &professional_id,
            Weekday::Monday,
            vec![TimeSlot {
                start_time: "09:30".to_string(),
                end_time: "10:30".to_string(),
                status: SlotStatus::Available,
            }],
            "token",
        )
        .await;

    assert_matches!(result, Err(ProfessionalError::OverlappingSlots(_)));

    let writes = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/rest/v1/availability_slots" && r.method.as_str() != "GET")
        .count();
    assert_eq!(writes, 0);
}

#[tokio::test]
async fn edit_availability_resubmitting_booked_range_leaves_it_booked() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    mount_professional_mock(&mock_server, &professional_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::slot_row(&professional_id, "Monday", "09:00", "10:00", "booked")
        ])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let slots = service
        .edit_availability(
            &professional_id,
            Weekday::Monday,
            vec![TimeSlot {
                start_time: "09:00".to_string(),
                end_time: "10:00".to_string(),
                status: SlotStatus::Available,
            }],
            "token",
        )
        .await
        .unwrap();

    // Identity match on a booked row is not a conflict, and the booking
    // survives the edit.
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].status, SlotStatus::Booked);

    let writes = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/rest/v1/availability_slots" && r.method.as_str() != "GET")
        .count();
    assert_eq!(writes, 0);
}

#[tokio::test]
async fn edit_availability_requires_existing_professional() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server.uri()));

    let result = service
        .edit_availability(
            &Uuid::new_v4().to_string(),
            Weekday::Monday,
            vec![TimeSlot {
                start_time: "09:00".to_string(),
                end_time: "10:00".to_string(),
                status: SlotStatus::Available,
            }],
            "token",
        )
        .await;

    assert_matches!(result, Err(ProfessionalError::NotFound(_)));

    let grid_requests = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/rest/v1/availability_slots")
        .count();
    assert_eq!(grid_requests, 0);
}

#[tokio::test]
async fn edit_availability_handler_rejects_parent_role() {
    let mock_server = MockServer::start().await;
    let state = test_state(&mock_server.uri());

    let result = handlers::edit_availability(
        State(state),
        Path(Uuid::new_v4().to_string()),
        auth_header(),
        user_extension("parent"),
        Json(EditAvailabilityRequest {
            day: Weekday::Monday,
            time_slots: vec![],
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn get_availability_handler_groups_by_day() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseRows::slot_row(&professional_id, "Monday", "09:00", "10:00", "available"),
            MockSupabaseRows::slot_row(&professional_id, "Monday", "10:00", "11:00", "booked"),
            MockSupabaseRows::slot_row(&professional_id, "Friday", "14:00", "15:00", "available"),
        ])))
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server.uri());

    let Json(body) = handlers::get_availability(
        State(state),
        Path(professional_id),
        auth_header(),
    )
    .await
    .unwrap();

    let days = body["availability"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["time_slots"].as_array().unwrap().len(), 2);
}
