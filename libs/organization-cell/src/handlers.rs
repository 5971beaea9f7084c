use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_models::response::{ApiResponse, PaginatedResponse};
use shared_utils::extractor::{require_role, MANAGEMENT_ROLES, STAFF_ROLES};
use shared_utils::validation::Validate;

use crate::models::{
    Clinic, ClinicListQuery, Complex, CreateClinicRequest, CreateComplexRequest,
    CreateDepartmentRequest, CreateDoctorRequest, CreateMedicalServiceRequest,
    CreateOrganizationRequest, Department, DepartmentListQuery, Doctor, DoctorListQuery,
    MedicalService, Organization, OrganizationListQuery, OrganizationStatusRequest, OwnerType,
    SetWorkingHoursRequest, UpdateClinicRequest, UpdateComplexRequest, UpdateDepartmentRequest,
    UpdateDoctorRequest, UpdateMedicalServiceRequest, UpdateOrganizationRequest, WorkingHours,
};
use crate::services::{
    ClinicService, ComplexService, DepartmentService, DoctorService, OrganizationService,
    WorkingHoursService,
};

const SUPER_ADMIN: &[Role] = &[Role::SuperAdmin];

/// Tenant members may only touch their own organization.
fn ensure_own_organization(user: &User, organization_id: Uuid) -> Result<(), AppError> {
    if user.is_super_admin() || user.organization_id == Some(organization_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access to another organization is not allowed".to_string()))
    }
}

// ==============================================================================
// ORGANIZATIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_organization(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<Json<ApiResponse<Organization>>, AppError> {
    require_role(&user, SUPER_ADMIN)?;
    request.validate()?;

    let service = OrganizationService::new(&config);
    let organization = service
        .create_organization(request, user.user_uuid()?, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, organization)))
}

#[axum::debug_handler]
pub async fn list_organizations(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<OrganizationListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Organization>>>, AppError> {
    require_role(&user, SUPER_ADMIN)?;

    let service = OrganizationService::new(&config);
    let (organizations, page) = service.list_organizations(query, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, PaginatedResponse::new(organizations, page))))
}

#[axum::debug_handler]
pub async fn get_organization(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Organization>>, AppError> {
    ensure_own_organization(&user, organization_id)?;

    let service = OrganizationService::new(&config);
    let organization = service.get_organization(organization_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, organization)))
}

#[axum::debug_handler]
pub async fn update_organization(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(organization_id): Path<Uuid>,
    Json(request): Json<UpdateOrganizationRequest>,
) -> Result<Json<ApiResponse<Organization>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    ensure_own_organization(&user, organization_id)?;
    request.validate()?;

    let service = OrganizationService::new(&config);
    let organization = service
        .update_organization(organization_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, organization)))
}

#[axum::debug_handler]
pub async fn set_organization_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(organization_id): Path<Uuid>,
    Json(request): Json<OrganizationStatusRequest>,
) -> Result<Json<ApiResponse<Organization>>, AppError> {
    require_role(&user, SUPER_ADMIN)?;

    let service = OrganizationService::new(&config);
    let organization = service
        .set_status(organization_id, request.status, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, organization)))
}

// ==============================================================================
// COMPLEXES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_complex(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateComplexRequest>,
) -> Result<Json<ApiResponse<Complex>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let complex = ComplexService::new(&config)
        .create_complex(organization_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, complex)))
}

#[axum::debug_handler]
pub async fn list_complexes(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Vec<Complex>>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let complexes = ComplexService::new(&config)
        .list_complexes(organization_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, complexes)))
}

#[axum::debug_handler]
pub async fn get_complex(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(complex_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Complex>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let complex = ComplexService::new(&config)
        .get_complex(organization_id, complex_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, complex)))
}

#[axum::debug_handler]
pub async fn update_complex(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(complex_id): Path<Uuid>,
    Json(request): Json<UpdateComplexRequest>,
) -> Result<Json<ApiResponse<Complex>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let complex = ComplexService::new(&config)
        .update_complex(organization_id, complex_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, complex)))
}

#[axum::debug_handler]
pub async fn delete_complex(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(complex_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Complex>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;

    let complex = ComplexService::new(&config)
        .delete_complex(organization_id, complex_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Deleted, complex)))
}

// ==============================================================================
// DEPARTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_department(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDepartmentRequest>,
) -> Result<Json<ApiResponse<Department>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let department = DepartmentService::new(&config)
        .create_department(organization_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, department)))
}

#[axum::debug_handler]
pub async fn list_departments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<DepartmentListQuery>,
) -> Result<Json<ApiResponse<Vec<Department>>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let departments = DepartmentService::new(&config)
        .list_departments(organization_id, query.complex_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, departments)))
}

#[axum::debug_handler]
pub async fn get_department(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(department_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Department>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let department = DepartmentService::new(&config)
        .get_department(organization_id, department_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, department)))
}

#[axum::debug_handler]
pub async fn update_department(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(department_id): Path<Uuid>,
    Json(request): Json<UpdateDepartmentRequest>,
) -> Result<Json<ApiResponse<Department>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let department = DepartmentService::new(&config)
        .update_department(organization_id, department_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, department)))
}

#[axum::debug_handler]
pub async fn delete_department(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(department_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;

    DepartmentService::new(&config)
        .delete_department(organization_id, department_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Deleted, json!({ "id": department_id }))))
}

// ==============================================================================
// CLINICS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<Json<ApiResponse<Clinic>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let clinic = ClinicService::new(&config)
        .create_clinic(organization_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, clinic)))
}

#[axum::debug_handler]
pub async fn list_clinics(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ClinicListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Clinic>>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let (clinics, page) = ClinicService::new(&config)
        .list_clinics(organization_id, query, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, PaginatedResponse::new(clinics, page))))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Clinic>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let clinic = ClinicService::new(&config)
        .get_clinic(organization_id, clinic_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, clinic)))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<ApiResponse<Clinic>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let clinic = ClinicService::new(&config)
        .update_clinic(organization_id, clinic_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, clinic)))
}

#[axum::debug_handler]
pub async fn delete_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Clinic>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;

    let clinic = ClinicService::new(&config)
        .deactivate_clinic(organization_id, clinic_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Deleted, clinic)))
}

#[axum::debug_handler]
pub async fn create_clinic_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<CreateMedicalServiceRequest>,
) -> Result<Json<ApiResponse<MedicalService>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = ClinicService::new(&config)
        .create_service(organization_id, clinic_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, service)))
}

#[axum::debug_handler]
pub async fn list_clinic_services(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MedicalService>>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let services = ClinicService::new(&config)
        .list_services(organization_id, clinic_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, services)))
}

#[axum::debug_handler]
pub async fn update_clinic_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((clinic_id, service_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateMedicalServiceRequest>,
) -> Result<Json<ApiResponse<MedicalService>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = ClinicService::new(&config)
        .update_service(organization_id, clinic_id, service_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, service)))
}

#[axum::debug_handler]
pub async fn delete_clinic_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((clinic_id, service_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<MedicalService>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = ClinicService::new(&config)
        .deactivate_service(organization_id, clinic_id, service_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Deleted, service)))
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let doctor = DoctorService::new(&config)
        .create_doctor(organization_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, doctor)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<ApiResponse<Vec<Doctor>>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let doctors = DoctorService::new(&config)
        .list_doctors(organization_id, query, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let doctor = DoctorService::new(&config)
        .get_doctor(organization_id, doctor_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let doctor = DoctorService::new(&config)
        .update_doctor(organization_id, doctor_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;

    let doctor = DoctorService::new(&config)
        .deactivate_doctor(organization_id, doctor_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Deleted, doctor)))
}

// ==============================================================================
// WORKING HOURS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_working_hours(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((owner_type, owner_id)): Path<(OwnerType, Uuid)>,
) -> Result<Json<ApiResponse<Vec<WorkingHours>>>, AppError> {
    require_role(&user, STAFF_ROLES)?;
    let organization_id = user.tenant_id()?;

    let week = WorkingHoursService::new(&config)
        .get_week(organization_id, owner_type, owner_id, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, week)))
}

#[axum::debug_handler]
pub async fn set_working_hours(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((owner_type, owner_id)): Path<(OwnerType, Uuid)>,
    Json(request): Json<SetWorkingHoursRequest>,
) -> Result<Json<ApiResponse<Vec<WorkingHours>>>, AppError> {
    require_role(&user, MANAGEMENT_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let week = WorkingHoursService::new(&config)
        .set_week(organization_id, owner_type, owner_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, week)))
}
