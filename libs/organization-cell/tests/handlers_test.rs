use assert_matches::assert_matches;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveTime;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use organization_cell::handlers::*;
use organization_cell::models::*;
use shared_models::error::AppError;
use shared_utils::test_utils::{auth_header, MockSupabaseResponses, TestConfig, TestUser};

const TOKEN: &str = "test-token";

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn receptionist_cannot_create_complex() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::receptionist("desk@clinic.test");

    let request = CreateComplexRequest {
        name_ar: "المجمع".into(),
        name_en: "Main".into(),
        address: None,
        city: None,
        phone: None,
    };

    let result = create_complex(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn staff_without_tenant_is_forbidden() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::admin("admin@clinic.test").without_organization();

    let result = list_complexes(State(config), auth_header(TOKEN), user.extension()).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn members_cannot_read_other_organizations() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::admin("admin@clinic.test");

    let result = get_organization(State(config), auth_header(TOKEN), user.extension(), Path(Uuid::new_v4())).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::super_admin("root@platform.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/organizations"))
        .and(query_param("slug", "eq.al-noor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": Uuid::new_v4()}])))
        .mount(&server)
        .await;

    let request = CreateOrganizationRequest {
        name_ar: "النور".into(),
        name_en: "Al Noor".into(),
        slug: "al-noor".into(),
        email: None,
        phone: None,
    };

    let result = create_organization(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn super_admin_lists_organizations() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::super_admin("root@platform.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/organizations"))
        .and(query_param("status", "eq.active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::organization(Uuid::new_v4(), "al-noor"),
            MockSupabaseResponses::organization(Uuid::new_v4(), "al-shifa"),
        ])))
        .mount(&server)
        .await;

    let query = OrganizationListQuery {
        status: Some(OrganizationStatus::Active),
        limit: Some(10),
        offset: None,
    };

    let Json(response) = list_organizations(State(config), auth_header(TOKEN), user.extension(), Query(query))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.data.total, 2);
    assert_eq!(response.data.limit, 10);
}

#[tokio::test]
async fn department_requires_existing_complex() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/complexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let request = CreateDepartmentRequest {
        complex_id: Uuid::new_v4(),
        name_ar: String::new(),
        name_en: "Dentistry".into(),
        code: "dent".into(),
        description: None,
    };

    let result = create_department(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn referenced_department_cannot_be_deleted() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");
    let department_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/departments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::department(department_id, user.org(), Uuid::new_v4(), "DENT")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("department_id", format!("eq.{}", department_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": Uuid::new_v4()}])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/departments"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let result = delete_department(State(config), auth_header(TOKEN), user.extension(), Path(department_id)).await;
    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn clinic_license_must_be_unique() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("license_number", "eq.LIC-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": Uuid::new_v4()}])))
        .mount(&server)
        .await;

    let request = CreateClinicRequest {
        complex_id: None,
        department_id: None,
        name_ar: "عيادة".into(),
        name_en: "Dental".into(),
        license_number: Some(" LIC-001 ".into()),
        phone: None,
        email: None,
        session_duration_minutes: None,
    };

    let result = create_clinic(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn clinic_hours_must_fit_complex_hours() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");
    let clinic_id = Uuid::new_v4();
    let complex_id = Uuid::new_v4();

    let mut clinic = MockSupabaseResponses::clinic(clinic_id, user.org(), 30);
    clinic["complex_id"] = json!(complex_id);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([clinic])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .and(query_param("owner_id", format!("eq.{}", complex_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::working_hours(user.org(), "complex", complex_id, 0, "08:00:00", "16:00:00", None)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/working_hours"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let request = SetWorkingHoursRequest {
        days: vec![DaySchedule::working(0, t(7, 0), t(15, 0))],
    };

    let result = set_working_hours(
        State(config),
        auth_header(TOKEN),
        user.extension(),
        Path((OwnerType::Clinic, clinic_id)),
        Json(request),
    )
    .await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn doctor_week_is_replaced_and_sorted() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor(doctor_id, user.org(), Uuid::new_v4(), None)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/working_hours"))
        .and(query_param("owner_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/working_hours"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::working_hours(user.org(), "doctor", doctor_id, 3, "09:00:00", "13:00:00", None),
            MockSupabaseResponses::working_hours(user.org(), "doctor", doctor_id, 1, "09:00:00", "17:00:00", Some(("12:00:00", "13:00:00"))),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = SetWorkingHoursRequest {
        days: vec![
            DaySchedule::working(3, t(9, 0), t(13, 0)),
            DaySchedule::working(1, t(9, 0), t(17, 0)).with_break(t(12, 0), t(13, 0)),
        ],
    };

    let Json(response) = set_working_hours(
        State(config),
        auth_header(TOKEN),
        user.extension(),
        Path((OwnerType::Doctor, doctor_id)),
        Json(request),
    )
    .await
    .unwrap();

    let days: Vec<i32> = response.data.iter().map(|wh| wh.schedule.day_of_week).collect();
    assert_eq!(days, vec![1, 3]);
    assert_eq!(response.data[0].schedule.break_window(), Some((t(12, 0), t(13, 0))));
}

#[tokio::test]
async fn invalid_week_is_rejected_before_any_write() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::admin("admin@clinic.test");

    let request = SetWorkingHoursRequest {
        days: vec![DaySchedule::working(2, t(17, 0), t(9, 0))],
    };

    let result = set_working_hours(
        State(config),
        auth_header(TOKEN),
        user.extension(),
        Path((OwnerType::Doctor, Uuid::new_v4())),
        Json(request),
    )
    .await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn doctor_reads_complex() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::doctor("doctor@clinic.test");
    let complex_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/complexes"))
        .and(query_param("id", format!("eq.{}", complex_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::complex(complex_id, user.org())
        ])))
        .mount(&server)
        .await;

    let Json(response) = get_complex(State(config), auth_header(TOKEN), user.extension(), Path(complex_id))
        .await
        .unwrap();
    assert_eq!(response.data.id, complex_id);
    assert_eq!(response.data.city.as_deref(), Some("Riyadh"));
}

#[tokio::test]
async fn service_of_another_clinic_is_not_found() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");
    let service_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_service(service_id, user.org(), Uuid::new_v4(), 30, 120.0)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinic_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = UpdateMedicalServiceRequest {
        price: Some(99.0),
        ..Default::default()
    };
    let result = update_clinic_service(
        State(config),
        auth_header(TOKEN),
        user.extension(),
        Path((Uuid::new_v4(), service_id)),
        Json(request),
    )
    .await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn unique_violation_from_database_is_a_conflict() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/complexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/complexes"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "duplicate key value violates unique constraint",
            "23505",
        )))
        .mount(&server)
        .await;

    let request = CreateComplexRequest {
        name_ar: "المجمع الشمالي".into(),
        name_en: "North".into(),
        address: None,
        city: Some("Riyadh".into()),
        phone: None,
    };
    let result = create_complex(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("23505"));
}

#[tokio::test]
async fn renaming_service_to_taken_name_is_a_conflict() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");
    let clinic_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_services"))
        .and(query_param("name_en", "ilike.Whitening"))
        .and(query_param("id", format!("neq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_service(Uuid::new_v4(), user.org(), clinic_id, 45, 300.0)
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_service(service_id, user.org(), clinic_id, 30, 120.0)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinic_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = UpdateMedicalServiceRequest {
        name_en: Some(" Whitening ".into()),
        ..Default::default()
    };
    let result = update_clinic_service(
        State(config),
        auth_header(TOKEN),
        user.extension(),
        Path((clinic_id, service_id)),
        Json(request),
    )
    .await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("Whitening"));
}

#[tokio::test]
async fn department_update_cannot_blank_names() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::admin("admin@clinic.test");

    let request = UpdateDepartmentRequest {
        name_ar: Some(String::new()),
        name_en: Some("   ".into()),
        description: None,
    };
    let result = update_department(State(config), auth_header(TOKEN), user.extension(), Path(Uuid::new_v4()), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg.contains("name"));
}
