use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::handlers::{get_me, validate_token, verify_token};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{auth_header, JwtTestUtils, TestConfig, TestUser};

fn config() -> Arc<AppConfig> {
    TestConfig::default().to_arc()
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn validate_returns_role_and_tenant() {
    let config = config();
    let user = TestUser::receptionist("desk@clinic.test");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let response = validate_token(State(config), bearer(&token)).await.unwrap().0;

    assert!(response.valid);
    assert_eq!(response.user_id, user.id);
    assert_eq!(response.email, Some(user.email.clone()));
    assert_eq!(response.role.as_deref(), Some("receptionist"));
    assert_eq!(response.organization_id, user.organization_id);
}

#[tokio::test]
async fn validate_requires_header() {
    let result = validate_token(State(config()), HeaderMap::new()).await;
    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Missing authorization header");
}

#[tokio::test]
async fn validate_requires_bearer_scheme() {
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Basic abc"));

    let result = validate_token(State(config()), headers).await;
    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Invalid authorization header format");
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let config = config();
    let token = JwtTestUtils::create_expired_token(&TestUser::default(), &config.supabase_jwt_secret);

    let result = validate_token(State(config), bearer(&token)).await;
    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Token expired");
}

#[tokio::test]
async fn forged_signature_is_rejected() {
    let token = JwtTestUtils::create_invalid_signature_token(&TestUser::default());

    let result = validate_token(State(config()), bearer(&token)).await;
    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn verify_reports_validity_without_failing() {
    let config = config();
    let user = TestUser::doctor("doctor@clinic.test");
    let good = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    let response = verify_token(State(config.clone()), bearer(&good)).await.0;
    assert_eq!(response["valid"], true);

    let response = verify_token(State(config.clone()), bearer(&JwtTestUtils::create_malformed_token())).await.0;
    assert_eq!(response["valid"], false);

    let response = verify_token(State(config), HeaderMap::new()).await.0;
    assert_eq!(response["valid"], false);
}

#[tokio::test]
async fn me_combines_claims_and_account() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::admin("admin@clinic.test");

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user.id,
            "email": user.email,
            "phone": "+966500000000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = get_me(State(config), auth_header("test-token"), user.extension())
        .await
        .unwrap()
        .0;

    assert_eq!(response.data.user_id, user.id);
    assert_eq!(response.data.organization_id, user.organization_id);
    assert!(!response.data.is_super_admin);
    assert_eq!(response.data.profile["phone"], "+966500000000");
}

#[tokio::test]
async fn me_surfaces_auth_service_failure() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(&server.uri()).to_arc();
    let user = TestUser::super_admin("root@platform.test");

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = get_me(State(config), auth_header("test-token"), user.extension()).await;
    assert_matches!(result, Err(AppError::ExternalService(_)));
}
