// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(book_appointment).get(list_appointments))
        .route("/conflicts", get(check_conflicts))
        .route("/available-slots", get(get_available_slots))
        .route("/{id}", get(get_appointment))
        .route("/{id}/reschedule", put(reschedule_appointment))
        .route("/{id}/status", put(update_appointment_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
