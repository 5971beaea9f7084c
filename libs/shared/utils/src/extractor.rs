use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_value = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = bearer_token(auth_value)?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn bearer_token(header_value: &str) -> Result<&str, AppError> {
    header_value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

/// Reject the caller unless they hold one of `roles` (super admins always pass).
pub fn require_role(user: &User, roles: &[Role]) -> Result<(), AppError> {
    if user.has_any_role(roles) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role '{}' is not allowed to perform this action",
            user.role.as_deref().unwrap_or("none")
        )))
    }
}

pub const STAFF_ROLES: &[Role] = &[Role::Owner, Role::Admin, Role::Doctor, Role::Receptionist];
pub const MANAGEMENT_ROLES: &[Role] = &[Role::Owner, Role::Admin];
pub const CLINICAL_ROLES: &[Role] = &[Role::Owner, Role::Admin, Role::Doctor];
pub const BILLING_ROLES: &[Role] = &[Role::Owner, Role::Admin, Role::Accountant, Role::Receptionist];
