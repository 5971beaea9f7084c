use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn medical_report_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_medical_report).get(list_medical_reports))
        .route("/{id}", get(get_medical_report).put(update_medical_report))
        .route("/{id}/finalize", post(finalize_medical_report))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
