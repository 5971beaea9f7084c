use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn organization_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_organization).get(list_organizations))
        .route("/{id}", get(get_organization).put(update_organization))
        .route("/{id}/status", put(set_organization_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn complex_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_complex).get(list_complexes))
        .route("/{id}", get(get_complex).put(update_complex).delete(delete_complex))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn department_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_department).get(list_departments))
        .route("/{id}", get(get_department).put(update_department).delete(delete_department))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_clinic).get(list_clinics))
        .route("/{id}", get(get_clinic).put(update_clinic).delete(delete_clinic))
        .route("/{id}/services", post(create_clinic_service).get(list_clinic_services))
        .route(
            "/{id}/services/{service_id}",
            put(update_clinic_service).delete(delete_clinic_service),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_doctor).get(list_doctors))
        .route("/{id}", get(get_doctor).put(update_doctor).delete(delete_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn working_hours_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{owner_type}/{owner_id}", get(get_working_hours).put(set_working_hours))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
