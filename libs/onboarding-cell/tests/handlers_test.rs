use assert_matches::assert_matches;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onboarding_cell::handlers::*;
use onboarding_cell::models::*;
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_utils::test_utils::{auth_header, TestConfig, TestUser};

const TOKEN: &str = "test-token";

fn payload() -> OnboardingRequest {
    serde_json::from_value(json!({
        "organization": {
            "name_ar": "مستوصف الأمل",
            "name_en": "Al Amal Medical",
            "slug": "al-amal",
            "email": "admin@alamal.test"
        },
        "complexes": [
            {"key": "main", "name_en": "Main Complex", "city": "Jeddah"}
        ],
        "departments": [
            {"key": "peds", "complex_key": "main", "name_en": "Pediatrics", "code": "peds"}
        ],
        "clinics": [
            {"key": "peds-1", "complex_key": "main", "department_key": "peds", "name_en": "Pediatrics 1", "license_number": "LIC-100"}
        ],
        "services": [
            {"key": "visit", "clinic_key": "peds-1", "name_en": "Visit", "price": 200.0, "duration_minutes": 30}
        ],
        "working_hours": [
            {"owner_type": "complex", "owner_key": "main", "days": [
                {"day_of_week": 0, "is_working": true, "open_time": "08:00:00", "close_time": "20:00:00"}
            ]},
            {"owner_type": "clinic", "owner_key": "peds-1", "days": [
                {"day_of_week": 0, "is_working": true, "open_time": "09:00:00", "close_time": "17:00:00"}
            ]}
        ]
    }))
    .unwrap()
}

async fn mount_lookups(server: &MockServer, organizations: Value, clinics: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(organizations))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(clinics))
        .mount(server)
        .await;
}

async fn mount_batch(server: &MockServer, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/apply_onboarding_batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"inserted": 7})))
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn onboarding_submits_ordered_batch() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::new("owner@alamal.test", "owner");

    mount_lookups(&server, json!([]), json!([])).await;
    mount_batch(&server, 1).await;

    let Json(response) = onboard_organization(State(config), auth_header(TOKEN), user.extension(), Json(payload()))
        .await
        .unwrap();
    assert_eq!(response.message, MessageKey::OnboardingCompleted.message());
    assert_eq!(response.data.rows_created, 7);
    assert!(response.data.ids.clinics.contains_key("peds-1"));

    let requests = server.received_requests().await.unwrap();
    let rpc = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&rpc.body).unwrap();
    let operations = body["operations"].as_array().unwrap();
    let tables: Vec<&str> = operations.iter().map(|op| op["table"].as_str().unwrap()).collect();
    assert_eq!(
        tables,
        vec!["organizations", "complexes", "departments", "clinics", "clinic_services", "working_hours", "working_hours"]
    );
    assert_eq!(operations[0]["row"]["owner_id"], json!(user.id));
    assert_eq!(operations[3]["row"]["complex_id"], operations[1]["row"]["id"]);
    assert_eq!(operations[4]["row"]["clinic_id"], operations[3]["row"]["id"]);
}

#[tokio::test]
async fn taken_slug_conflicts_without_writing() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::super_admin("root@platform.test");

    mount_lookups(&server, json!([{"id": Uuid::new_v4()}]), json!([])).await;
    mount_batch(&server, 0).await;

    let result = onboard_organization(State(config), auth_header(TOKEN), user.extension(), Json(payload())).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("al-amal"));
}

#[tokio::test]
async fn registered_license_conflicts() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::new("owner@alamal.test", "owner");

    mount_lookups(&server, json!([]), json!([{"license_number": "LIC-100"}])).await;
    mount_batch(&server, 0).await;

    let result = onboard_organization(State(config), auth_header(TOKEN), user.extension(), Json(payload())).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("LIC-100"));
}

#[tokio::test]
async fn unknown_reference_is_a_validation_error() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::new("owner@alamal.test", "owner");

    let mut request = payload();
    request.services[0].clinic_key = "cardio-1".into();

    let result = onboard_organization(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg.contains("cardio-1"));
}

#[tokio::test]
async fn failed_batch_surfaces_database_error() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::new("owner@alamal.test", "owner");

    mount_lookups(&server, json!([]), json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/apply_onboarding_batch"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "insert failed"})))
        .mount(&server)
        .await;

    let result = onboard_organization(State(config), auth_header(TOKEN), user.extension(), Json(payload())).await;
    assert_matches!(result, Err(AppError::Database(_)));
}

#[tokio::test]
async fn dry_run_returns_plan_only() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::new("owner@alamal.test", "owner");

    mount_lookups(&server, json!([]), json!([])).await;
    mount_batch(&server, 0).await;

    let Json(response) = validate_onboarding(State(config), auth_header(TOKEN), user.extension(), Json(payload()))
        .await
        .unwrap();
    assert_eq!(response.message, MessageKey::OnboardingValidated.message());
    assert_eq!(response.data.operations.len(), 7);
    assert_eq!(response.data.operations[0].key, "al-amal");
}

#[tokio::test]
async fn staff_cannot_onboard() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::receptionist("desk@alamal.test");

    let result = onboard_organization(State(config), auth_header(TOKEN), user.extension(), Json(payload())).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}
