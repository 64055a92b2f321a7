use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// API Router Module
///
/// Mounted at `/api`. The request gate forwards these requests untouched: no locale
/// rewriting and no sign-in redirect, whatever the session state.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /api/onboarding/doctor
        .route(
            "/onboarding/doctor",
            get(handlers::doctor_onboarding_status).post(handlers::submit_doctor_onboarding),
        )
        // GET/POST /api/onboarding/patient
        .route(
            "/onboarding/patient",
            get(handlers::patient_onboarding_status).post(handlers::submit_patient_onboarding),
        )
}
