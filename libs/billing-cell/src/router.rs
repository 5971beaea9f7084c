use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn invoice_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/{id}", get(get_invoice).put(update_invoice))
        .route("/{id}/issue", post(issue_invoice))
        .route("/{id}/cancel", post(cancel_invoice))
        .route("/{id}/payments", post(record_payment).get(list_payments))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
