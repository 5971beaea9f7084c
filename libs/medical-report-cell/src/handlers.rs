use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_models::response::{ApiResponse, PaginatedResponse};
use shared_utils::extractor::{require_role, CLINICAL_ROLES};
use shared_utils::validation::Validate;

use crate::models::{CreateMedicalReportRequest, MedicalReport, ReportListQuery, UpdateMedicalReportRequest};
use crate::services::MedicalReportService;

#[axum::debug_handler]
pub async fn create_medical_report(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateMedicalReportRequest>,
) -> Result<Json<ApiResponse<MedicalReport>>, AppError> {
    require_role(&user, CLINICAL_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = MedicalReportService::new(&config);
    let report = service.create_report(organization_id, request, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, report)))
}

#[axum::debug_handler]
pub async fn list_medical_reports(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<MedicalReport>>>, AppError> {
    require_role(&user, CLINICAL_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = MedicalReportService::new(&config);
    let (reports, page) = service.list_reports(organization_id, query, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, PaginatedResponse::new(reports, page))))
}

#[axum::debug_handler]
pub async fn get_medical_report(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MedicalReport>>, AppError> {
    require_role(&user, CLINICAL_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = MedicalReportService::new(&config);
    let report = service.get_report(organization_id, report_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, report)))
}

#[axum::debug_handler]
pub async fn update_medical_report(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(report_id): Path<Uuid>,
    Json(request): Json<UpdateMedicalReportRequest>,
) -> Result<Json<ApiResponse<MedicalReport>>, AppError> {
    require_role(&user, CLINICAL_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = MedicalReportService::new(&config);
    let report = service
        .update_report(organization_id, report_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, report)))
}

#[axum::debug_handler]
pub async fn finalize_medical_report(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MedicalReport>>, AppError> {
    require_role(&user, CLINICAL_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = MedicalReportService::new(&config);
    let report = service.finalize_report(organization_id, report_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::ReportFinalized, report)))
}
