use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use billing_cell::router::invoice_routes;
use medical_report_cell::router::medical_report_routes;
use onboarding_cell::router::onboarding_routes;
use organization_cell::router::{
    clinic_routes, complex_routes, department_routes, doctor_routes, organization_routes,
    working_hours_routes,
};
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

async fn status() -> Json<Value> {
    Json(json!({
        "service": "clinic-api",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(status))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/organizations", organization_routes(state.clone()))
        .nest("/complexes", complex_routes(state.clone()))
        .nest("/departments", department_routes(state.clone()))
        .nest("/clinics", clinic_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/working-hours", working_hours_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/medical-reports", medical_report_routes(state.clone()))
        .nest("/invoices", invoice_routes(state.clone()))
        .nest("/onboarding", onboarding_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(Arc::new(AppConfig::default()))
    }

    #[tokio::test]
    async fn status_route_is_public() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cell_routes_require_a_token() {
        for uri in ["/appointments", "/invoices", "/medical-reports", "/patients"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
