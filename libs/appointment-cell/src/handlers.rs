// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_models::response::{ApiResponse, PaginatedResponse};
use shared_utils::extractor::{require_role, STAFF_ROLES};
use shared_utils::validation::Validate;

use crate::models::{
    Appointment, AppointmentListQuery, AvailableSlotsQuery, AvailableSlotsResponse,
    BookAppointmentRequest, ConflictCheckQuery, ConflictCheckResponse,
    RescheduleAppointmentRequest, UpdateStatusRequest,
};
use crate::services::{BookingService, LifecycleService};

#[axum::debug_handler]
pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = BookingService::new(&config);
    let appointment = service
        .book_appointment(organization_id, user.user_uuid()?, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::AppointmentBooked, appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Appointment>>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = BookingService::new(&config);
    let (appointments, page) = service
        .list_appointments(organization_id, query, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, PaginatedResponse::new(appointments, page))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = BookingService::new(&config);
    let appointment = service
        .get_appointment(organization_id, appointment_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = BookingService::new(&config);
    let appointment = service
        .reschedule_appointment(organization_id, appointment_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::AppointmentRescheduled, appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = LifecycleService::new(&config);
    let appointment = service
        .update_status(organization_id, appointment_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::AppointmentStatusChanged, appointment)))
}

#[axum::debug_handler]
pub async fn check_conflicts(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<ApiResponse<ConflictCheckResponse>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = BookingService::new(&config);
    let response = service.check_conflicts(organization_id, query, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, response)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<ApiResponse<AvailableSlotsResponse>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = BookingService::new(&config);
    let response = service.available_slots(organization_id, query, auth.token()).await?;
    debug!("{} free slots for doctor {}", response.slots.len(), response.doctor_id);

    let key = if response.slots.is_empty() {
        MessageKey::SlotUnavailable
    } else {
        MessageKey::Fetched
    };
    Ok(Json(ApiResponse::ok(key, response)))
}
