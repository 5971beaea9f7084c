use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_models::response::{ApiResponse, PaginatedResponse};
use shared_utils::extractor::{require_role, CLINICAL_ROLES, STAFF_ROLES};
use shared_utils::validation::Validate;

use crate::models::{CreatePatientRequest, Patient, PatientHistory, PatientSearchQuery, UpdatePatientRequest};
use crate::services::PatientService;

/// Front desk and billing staff can look patients up.
const LOOKUP_ROLES: &[Role] = &[
    Role::Owner,
    Role::Admin,
    Role::Doctor,
    Role::Receptionist,
    Role::Accountant,
];

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<ApiResponse<Patient>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = PatientService::new(&config);
    let patient = service.create_patient(organization_id, request, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Patient>>, AppError> {
    require_role(&user, LOOKUP_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = PatientService::new(&config);
    let patient = service.get_patient(organization_id, patient_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<ApiResponse<Patient>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = PatientService::new(&config);
    let patient = service
        .update_patient(organization_id, patient_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, patient)))
}

#[axum::debug_handler]
pub async fn deactivate_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Patient>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = PatientService::new(&config);
    let patient = service
        .deactivate_patient(organization_id, patient_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Deleted, patient)))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Patient>>>, AppError> {
    require_role(&user, LOOKUP_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = PatientService::new(&config);
    let (patients, page) = service
        .search_patients(organization_id, query, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, PaginatedResponse::new(patients, page))))
}

#[axum::debug_handler]
pub async fn get_patient_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PatientHistory>>, AppError> {
    require_role(&user, CLINICAL_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = PatientService::new(&config);
    let history = service.get_history(organization_id, patient_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, history)))
}
