use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_models::response::ApiResponse;
use shared_utils::extractor::require_role;

use crate::models::{OnboardingPlan, OnboardingRequest, OnboardingResult};
use crate::services::OnboardingService;

const ONBOARDING_ROLES: &[Role] = &[Role::SuperAdmin, Role::Owner];

#[axum::debug_handler]
pub async fn onboard_organization(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<OnboardingRequest>,
) -> Result<Json<ApiResponse<OnboardingResult>>, AppError> {
    require_role(&user, ONBOARDING_ROLES)?;

    let service = OnboardingService::new(&config);
    let result = service
        .onboard(user.user_uuid()?, &request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::OnboardingCompleted, result)))
}

/// Dry run: the planned inserts, nothing written.
#[axum::debug_handler]
pub async fn validate_onboarding(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<OnboardingRequest>,
) -> Result<Json<ApiResponse<OnboardingPlan>>, AppError> {
    require_role(&user, ONBOARDING_ROLES)?;

    let service = OnboardingService::new(&config);
    let plan = service
        .plan(user.user_uuid()?, &request, auth.token())
        .await?;

    Ok(Json(ApiResponse::ok(MessageKey::OnboardingValidated, plan)))
}
