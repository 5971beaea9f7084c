use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_models::i18n::MessageKey;
use shared_models::response::ApiResponse;
use shared_utils::extractor::bearer_token;
use shared_utils::jwt;

fn header_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    bearer_token(value)
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = header_token(&headers)?;
    let user = jwt::validate_token(token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
        organization_id: user.organization_id,
    }))
}

/// Like [`validate_token`] but never fails: a bad or missing token is
/// reported as `{"valid": false}`.
pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Json<Value> {
    let valid = header_token(&headers)
        .map(|token| jwt::validate_token(token, &config.supabase_jwt_secret).is_ok())
        .unwrap_or(false);

    Json(json!({ "valid": valid }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub organization_id: Option<Uuid>,
    pub is_super_admin: bool,
    /// Account record from the auth service.
    pub profile: Value,
}

#[axum::debug_handler]
pub async fn get_me(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<CurrentUser>>, AppError> {
    debug!("Loading current user {}", user.id);

    let profile = SupabaseClient::new(&config)
        .get_user_profile(auth.token())
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    let is_super_admin = user.is_super_admin();
    Ok(Json(ApiResponse::ok(
        MessageKey::Fetched,
        CurrentUser {
            user_id: user.id,
            email: user.email,
            role: user.role,
            organization_id: user.organization_id,
            is_super_admin,
            profile,
        },
    )))
}
