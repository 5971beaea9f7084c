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
use shared_utils::extractor::{require_role, BILLING_ROLES};
use shared_utils::validation::Validate;

use crate::models::{
    CreateInvoiceRequest, Invoice, InvoiceListQuery, Payment, PaymentReceipt, RecordPaymentRequest,
    UpdateInvoiceRequest,
};
use crate::services::{InvoiceService, PaymentService};

/// Cancelling is kept away from the front desk.
const CANCEL_ROLES: &[Role] = &[Role::Owner, Role::Admin, Role::Accountant];

// ==============================================================================
// INVOICES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    require_role(&user, BILLING_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = InvoiceService::new(&config);
    let invoice = service
        .create_invoice(organization_id, user.user_uuid()?, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Created, invoice)))
}

#[axum::debug_handler]
pub async fn list_invoices(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Invoice>>>, AppError> {
    require_role(&user, BILLING_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = InvoiceService::new(&config);
    let (invoices, page) = service.list_invoices(organization_id, query, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, PaginatedResponse::new(invoices, page))))
}

#[axum::debug_handler]
pub async fn get_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    require_role(&user, BILLING_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = InvoiceService::new(&config);
    let invoice = service.get_invoice(organization_id, invoice_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, invoice)))
}

#[axum::debug_handler]
pub async fn update_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    require_role(&user, BILLING_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = InvoiceService::new(&config);
    let invoice = service
        .update_invoice(organization_id, invoice_id, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, invoice)))
}

#[axum::debug_handler]
pub async fn issue_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    require_role(&user, BILLING_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = InvoiceService::new(&config);
    let invoice = service.issue_invoice(organization_id, invoice_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::InvoiceIssued, invoice)))
}

#[axum::debug_handler]
pub async fn cancel_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    require_role(&user, CANCEL_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = InvoiceService::new(&config);
    let invoice = service.cancel_invoice(organization_id, invoice_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Updated, invoice)))
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn record_payment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentReceipt>>, AppError> {
    require_role(&user, BILLING_ROLES)?;
    let organization_id = user.tenant_id()?;
    request.validate()?;

    let service = PaymentService::new(&config);
    let receipt = service
        .record_payment(organization_id, invoice_id, user.user_uuid()?, request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::PaymentRecorded, receipt)))
}

#[axum::debug_handler]
pub async fn list_payments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, AppError> {
    require_role(&user, BILLING_ROLES)?;
    let organization_id = user.tenant_id()?;

    let service = PaymentService::new(&config);
    let payments = service.list_payments(organization_id, invoice_id, auth.token()).await?;

    Ok(Json(ApiResponse::ok(MessageKey::Fetched, payments)))
}
