use assert_matches::assert_matches;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medical_report_cell::handlers::*;
use medical_report_cell::models::*;
use shared_models::error::AppError;
use shared_utils::test_utils::{auth_header, MockSupabaseResponses, TestConfig, TestUser};

const TOKEN: &str = "test-token";

fn appointment_row(id: Uuid, organization_id: Uuid, status: &str) -> Value {
    MockSupabaseResponses::appointment(
        id,
        organization_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Utc.with_ymd_and_hms(2030, 6, 2, 10, 0, 0).unwrap(),
        30,
        status,
    )
}

fn report_row(id: Uuid, organization_id: Uuid, status: &str) -> Value {
    json!({
        "id": id,
        "organization_id": organization_id,
        "appointment_id": Uuid::new_v4(),
        "patient_id": Uuid::new_v4(),
        "doctor_id": Uuid::new_v4(),
        "chief_complaint": "toothache",
        "diagnosis": "Dental caries",
        "symptoms": ["pain"],
        "vital_signs": {"blood_pressure": "120/80", "heart_rate": 72},
        "treatment_plan": null,
        "prescriptions": [],
        "notes": null,
        "follow_up_date": null,
        "status": status,
        "finalized_at": null,
        "created_at": "2030-06-02T10:40:00Z",
        "updated_at": "2030-06-02T10:40:00Z"
    })
}

fn new_report(appointment_id: Uuid) -> CreateMedicalReportRequest {
    CreateMedicalReportRequest {
        appointment_id,
        chief_complaint: Some("toothache".into()),
        diagnosis: "Dental caries".into(),
        symptoms: vec!["pain".into()],
        vital_signs: None,
        treatment_plan: Some("Filling".into()),
        prescriptions: vec![],
        notes: None,
        follow_up_date: None,
    }
}

async fn mount_get(server: &MockServer, table: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn report_takes_patient_and_doctor_from_appointment() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let appointment_id = Uuid::new_v4();
    let appointment = appointment_row(appointment_id, user.org(), "in_progress");

    mount_get(&server, "appointments", json!([appointment.clone()])).await;
    mount_get(&server, "medical_reports", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_reports"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([report_row(Uuid::new_v4(), user.org(), "draft")])))
        .expect(1)
        .mount(&server)
        .await;

    let Json(response) = create_medical_report(State(config), auth_header(TOKEN), user.extension(), Json(new_report(appointment_id)))
        .await
        .unwrap();
    assert_eq!(response.data.status, ReportStatus::Draft);

    let requests = server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(body["patient_id"], appointment["patient_id"]);
    assert_eq!(body["doctor_id"], appointment["doctor_id"]);
    assert_eq!(body["status"], "draft");
}

#[tokio::test]
async fn scheduled_appointment_cannot_have_report() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let appointment_id = Uuid::new_v4();

    mount_get(&server, "appointments", json!([appointment_row(appointment_id, user.org(), "scheduled")])).await;

    let result = create_medical_report(State(config), auth_header(TOKEN), user.extension(), Json(new_report(appointment_id))).await;
    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn second_report_for_appointment_conflicts() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let appointment_id = Uuid::new_v4();

    mount_get(&server, "appointments", json!([appointment_row(appointment_id, user.org(), "completed")])).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_reports"))
        .and(query_param("appointment_id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": Uuid::new_v4()}])))
        .mount(&server)
        .await;

    let result = create_medical_report(State(config), auth_header(TOKEN), user.extension(), Json(new_report(appointment_id))).await;
    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn follow_up_on_visit_day_is_rejected() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let appointment_id = Uuid::new_v4();

    mount_get(&server, "appointments", json!([appointment_row(appointment_id, user.org(), "completed")])).await;
    mount_get(&server, "medical_reports", json!([])).await;

    let mut request = new_report(appointment_id);
    request.follow_up_date = NaiveDate::from_ymd_opt(2030, 6, 2);
    let result = create_medical_report(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg.contains("follow_up_date"));
}

#[tokio::test]
async fn finalized_report_is_read_only() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let report_id = Uuid::new_v4();

    mount_get(&server, "medical_reports", json!([report_row(report_id, user.org(), "finalized")])).await;

    let request = UpdateMedicalReportRequest {
        notes: Some("amended".into()),
        ..Default::default()
    };
    let result = update_medical_report(State(config), auth_header(TOKEN), user.extension(), Path(report_id), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("finalized"));
}

#[tokio::test]
async fn finalize_stamps_report() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let report_id = Uuid::new_v4();

    mount_get(&server, "medical_reports", json!([report_row(report_id, user.org(), "draft")])).await;
    let mut finalized = report_row(report_id, user.org(), "finalized");
    finalized["finalized_at"] = json!("2030-06-02T11:00:00Z");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medical_reports"))
        .and(query_param("status", "eq.draft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([finalized])))
        .expect(1)
        .mount(&server)
        .await;

    let Json(response) = finalize_medical_report(State(config), auth_header(TOKEN), user.extension(), Path(report_id))
        .await
        .unwrap();
    assert_eq!(response.data.status, ReportStatus::Finalized);
    assert!(response.data.finalized_at.is_some());

    let requests = server.received_requests().await.unwrap();
    let patch = requests.iter().find(|r| r.method.as_str() == "PATCH").unwrap();
    let body: Value = serde_json::from_slice(&patch.body).unwrap();
    assert_eq!(body["status"], "finalized");
    assert!(body["finalized_at"].is_string());
}

#[tokio::test]
async fn reports_listed_newest_first_for_patient() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_reports"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([report_row(Uuid::new_v4(), user.org(), "draft")])))
        .expect(1)
        .mount(&server)
        .await;

    let query = ReportListQuery {
        patient_id: Some(patient_id),
        ..Default::default()
    };
    let Json(response) = list_medical_reports(State(config), auth_header(TOKEN), user.extension(), Query(query))
        .await
        .unwrap();
    assert_eq!(response.data.items.len(), 1);
}

#[tokio::test]
async fn receptionist_cannot_read_reports() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::receptionist("desk@clinic.test");

    let result = get_medical_report(State(config), auth_header(TOKEN), user.extension(), Path(Uuid::new_v4())).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}
