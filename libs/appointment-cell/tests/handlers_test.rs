use assert_matches::assert_matches;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_utils::test_utils::{auth_header, MockSupabaseResponses, TestConfig, TestUser};

const TOKEN: &str = "test-token";

/// 2030-06-02 is a Sunday, weekday 0.
fn sunday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 2, hour, minute, 0).unwrap()
}

struct Fixture {
    server: MockServer,
    user: TestUser,
    clinic_id: Uuid,
    doctor_id: Uuid,
    patient_id: Uuid,
}

impl Fixture {
    async fn new() -> Self {
        let fixture = Self {
            server: MockServer::start().await,
            user: TestUser::receptionist("desk@clinic.test"),
            clinic_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
        };
        let org = fixture.user.org();

        fixture
            .mount_rows("patients", json!([MockSupabaseResponses::patient(fixture.patient_id, org, "0501234567")]))
            .await;
        fixture
            .mount_rows(
                "doctors",
                json!([MockSupabaseResponses::doctor(fixture.doctor_id, org, fixture.clinic_id, None)]),
            )
            .await;
        fixture
            .mount_rows("clinics", json!([MockSupabaseResponses::clinic(fixture.clinic_id, org, 30)]))
            .await;
        fixture
    }

    async fn mount_rows(&self, table: &str, rows: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{}", table)))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    async fn mount_hours(&self, owner_type: &str, rows: Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/working_hours"))
            .and(query_param("owner_type", format!("eq.{}", owner_type)))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    async fn mount_doctor_sunday(&self) {
        let rows = json!([MockSupabaseResponses::working_hours(
            self.user.org(),
            "doctor",
            self.doctor_id,
            0,
            "09:00:00",
            "17:00:00",
            Some(("12:00:00", "13:00:00")),
        )]);
        self.mount_hours("doctor", rows).await;
    }

    async fn mount_appointments_for(&self, column: &str, owner_id: Uuid, rows: Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param(column, format!("eq.{}", owner_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    fn appointment(&self, start: DateTime<Utc>, minutes: i64, status: &str) -> Value {
        MockSupabaseResponses::appointment(
            Uuid::new_v4(),
            self.user.org(),
            self.clinic_id,
            self.doctor_id,
            self.patient_id,
            start,
            minutes,
            status,
        )
    }

    fn booking(&self, start: DateTime<Utc>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            clinic_id: self.clinic_id,
            service_id: None,
            start_time: start,
            notes: Some("first visit".into()),
        }
    }

    async fn book(&self, start: DateTime<Utc>) -> Result<Json<shared_models::response::ApiResponse<Appointment>>, AppError> {
        let config = TestConfig::with_url(&self.server.uri()).to_arc();
        book_appointment(State(config), auth_header(TOKEN), self.user.extension(), Json(self.booking(start))).await
    }
}

#[tokio::test]
async fn booking_uses_clinic_session_length() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([])).await;
    fx.mount_appointments_for("patient_id", fx.patient_id, json!([])).await;

    let stored = fx.appointment(sunday_at(10, 0), 30, "scheduled");
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([stored])))
        .expect(1)
        .mount(&fx.server)
        .await;

    let Json(response) = fx.book(sunday_at(10, 0)).await.unwrap();
    assert!(response.success);
    assert_eq!(response.data.status, AppointmentStatus::Scheduled);

    let requests = fx.server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(body["duration_minutes"], 30);
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["organization_id"], json!(fx.user.org()));
    let end: DateTime<Utc> = body["end_time"].as_str().unwrap().parse().unwrap();
    assert_eq!(end, sunday_at(10, 30));
}

#[tokio::test]
async fn booking_into_break_is_rejected() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;

    let result = fx.book(sunday_at(11, 45)).await;
    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("break"));
}

#[tokio::test]
async fn booking_outside_hours_is_rejected() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;

    let result = fx.book(sunday_at(16, 45)).await;
    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("working hours"));
}

#[tokio::test]
async fn overlapping_doctor_booking_conflicts() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([fx.appointment(sunday_at(10, 15), 30, "confirmed")]))
        .await;
    fx.mount_appointments_for("patient_id", fx.patient_id, json!([])).await;

    let result = fx.book(sunday_at(10, 0)).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("existing booking"));
}

#[tokio::test]
async fn touching_appointments_do_not_conflict() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;
    // Ends exactly when the new one starts.
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([fx.appointment(sunday_at(9, 30), 30, "scheduled")]))
        .await;
    fx.mount_appointments_for("patient_id", fx.patient_id, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([fx.appointment(sunday_at(10, 0), 30, "scheduled")])),
        )
        .mount(&fx.server)
        .await;

    assert!(fx.book(sunday_at(10, 0)).await.is_ok());
}

#[tokio::test]
async fn patient_daily_limit_is_enforced() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([])).await;
    fx.mount_appointments_for(
        "patient_id",
        fx.patient_id,
        json!([
            fx.appointment(sunday_at(9, 0), 30, "scheduled"),
            fx.appointment(sunday_at(13, 0), 30, "confirmed"),
            fx.appointment(sunday_at(15, 0), 30, "scheduled"),
        ]),
    )
    .await;

    let result = fx.book(sunday_at(10, 0)).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("limit of 3"));
}

#[tokio::test]
async fn accountant_cannot_book() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::accountant("books@clinic.test");
    let request = BookAppointmentRequest {
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        service_id: None,
        start_time: sunday_at(10, 0),
        notes: None,
    };

    let result = book_appointment(State(config), auth_header(TOKEN), user.extension(), Json(request)).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn slots_fall_back_to_clinic_hours() {
    let fx = Fixture::new().await;
    fx.mount_hours("doctor", json!([])).await;
    fx.mount_hours(
        "clinic",
        json!([MockSupabaseResponses::working_hours(
            fx.user.org(),
            "clinic",
            fx.clinic_id,
            0,
            "09:00:00",
            "11:00:00",
            None,
        )]),
    )
    .await;
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([fx.appointment(sunday_at(9, 30), 30, "scheduled")]))
        .await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let query = AvailableSlotsQuery {
        doctor_id: fx.doctor_id,
        date: NaiveDate::from_ymd_opt(2030, 6, 2).unwrap(),
        service_id: None,
    };
    let Json(response) = get_available_slots(State(config), auth_header(TOKEN), fx.user.extension(), Query(query))
        .await
        .unwrap();

    let starts: Vec<_> = response.data.slots.iter().map(|s| s.start_time).collect();
    assert_eq!(starts, vec![sunday_at(9, 0), sunday_at(10, 0), sunday_at(10, 30)]);
    assert_eq!(response.data.slot_duration_minutes, 30);
}

#[tokio::test]
async fn day_off_reports_no_slots() {
    let fx = Fixture::new().await;
    fx.mount_hours("doctor", json!([])).await;
    fx.mount_hours("clinic", json!([])).await;
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([])).await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let query = AvailableSlotsQuery {
        doctor_id: fx.doctor_id,
        date: NaiveDate::from_ymd_opt(2030, 6, 2).unwrap(),
        service_id: None,
    };
    let Json(response) = get_available_slots(State(config), auth_header(TOKEN), fx.user.extension(), Query(query))
        .await
        .unwrap();

    assert!(response.data.slots.is_empty());
    assert_eq!(response.message, MessageKey::SlotUnavailable.message());
}

#[tokio::test]
async fn conflict_check_rejects_inverted_interval() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::doctor("doc@clinic.test");
    let query = ConflictCheckQuery {
        doctor_id: Uuid::new_v4(),
        start_time: sunday_at(11, 0),
        end_time: sunday_at(10, 0),
        exclude_appointment_id: None,
    };

    let result = check_conflicts(State(config), auth_header(TOKEN), user.extension(), Query(query)).await;
    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn completed_appointment_cannot_be_cancelled() {
    let fx = Fixture::new().await;
    let appointment = fx.appointment(sunday_at(10, 0), 30, "completed");
    let id: Uuid = serde_json::from_value(appointment["id"].clone()).unwrap();
    fx.mount_rows("appointments", json!([appointment])).await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let request = UpdateStatusRequest {
        status: AppointmentStatus::Cancelled,
        reason: Some("patient asked".into()),
    };
    let result = update_appointment_status(State(config), auth_header(TOKEN), fx.user.extension(), Path(id), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn cancelling_requires_reason() {
    let fx = Fixture::new().await;
    let appointment = fx.appointment(sunday_at(10, 0), 30, "scheduled");
    let id: Uuid = serde_json::from_value(appointment["id"].clone()).unwrap();
    fx.mount_rows("appointments", json!([appointment])).await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let request = UpdateStatusRequest {
        status: AppointmentStatus::Cancelled,
        reason: None,
    };
    let result = update_appointment_status(State(config), auth_header(TOKEN), fx.user.extension(), Path(id), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn confirming_patches_status() {
    let fx = Fixture::new().await;
    let appointment = fx.appointment(sunday_at(10, 0), 30, "scheduled");
    let id: Uuid = serde_json::from_value(appointment["id"].clone()).unwrap();
    fx.mount_rows("appointments", json!([appointment.clone()])).await;

    let mut confirmed = appointment;
    confirmed["status"] = json!("confirmed");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([confirmed])))
        .expect(1)
        .mount(&fx.server)
        .await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let request = UpdateStatusRequest {
        status: AppointmentStatus::Confirmed,
        reason: None,
    };
    let Json(response) = update_appointment_status(State(config), auth_header(TOKEN), fx.user.extension(), Path(id), Json(request))
        .await
        .unwrap();
    assert_eq!(response.data.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn started_appointment_cannot_be_rescheduled() {
    let fx = Fixture::new().await;
    let appointment = fx.appointment(sunday_at(10, 0), 30, "in_progress");
    let id: Uuid = serde_json::from_value(appointment["id"].clone()).unwrap();
    fx.mount_rows("appointments", json!([appointment])).await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let request = RescheduleAppointmentRequest {
        start_time: sunday_at(14, 0),
        notes: None,
    };
    let result = reschedule_appointment(State(config), auth_header(TOKEN), fx.user.extension(), Path(id), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn patient_cannot_hold_overlapping_appointments() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([])).await;
    // Booked with another doctor, overlapping 10:00-10:30.
    fx.mount_appointments_for("patient_id", fx.patient_id, json!([fx.appointment(sunday_at(9, 45), 30, "confirmed")]))
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&fx.server)
        .await;

    let result = fx.book(sunday_at(10, 0)).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("Patient already has an appointment"));
}

#[tokio::test]
async fn reschedule_is_guarded_on_current_status() {
    let fx = Fixture::new().await;
    fx.mount_doctor_sunday().await;
    fx.mount_appointments_for("doctor_id", fx.doctor_id, json!([])).await;
    fx.mount_appointments_for("patient_id", fx.patient_id, json!([])).await;
    let appointment = fx.appointment(sunday_at(10, 0), 30, "confirmed");
    let id: Uuid = serde_json::from_value(appointment["id"].clone()).unwrap();
    fx.mount_rows("appointments", json!([appointment])).await;

    // The row changed status after it was read.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.confirmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&fx.server)
        .await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let request = RescheduleAppointmentRequest {
        start_time: sunday_at(14, 0),
        notes: None,
    };
    let result = reschedule_appointment(State(config), auth_header(TOKEN), fx.user.extension(), Path(id), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("another request"));
}

#[tokio::test]
async fn status_change_lost_to_concurrent_update_is_a_conflict() {
    let fx = Fixture::new().await;
    let appointment = fx.appointment(sunday_at(10, 0), 30, "scheduled");
    let id: Uuid = serde_json::from_value(appointment["id"].clone()).unwrap();
    fx.mount_rows("appointments", json!([appointment])).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&fx.server)
        .await;

    let config = TestConfig::with_url(&fx.server.uri()).to_arc();
    let request = UpdateStatusRequest {
        status: AppointmentStatus::Confirmed,
        reason: None,
    };
    let result = update_appointment_status(State(config), auth_header(TOKEN), fx.user.extension(), Path(id), Json(request)).await;
    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("another request"));
}

#[tokio::test]
async fn reschedule_notes_are_length_checked() {
    let config = TestConfig::default().to_arc();
    let user = TestUser::receptionist("desk@clinic.test");
    let request = RescheduleAppointmentRequest {
        start_time: sunday_at(14, 0),
        notes: Some("x".repeat(2001)),
    };

    let result = reschedule_appointment(State(config), auth_header(TOKEN), user.extension(), Path(Uuid::new_v4()), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg.contains("notes"));
}
