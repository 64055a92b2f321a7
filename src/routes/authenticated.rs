use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Pages behind the request gate. Handlers here can rely on a `Session` extension
/// being present; role checks beyond that are done inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /{locale}/continue
        // Post sign-in/sign-up landing: dispatches the user by role exactly once.
        .route("/continue", get(handlers::continue_after_auth))
        // --- Onboarding ---
        .route("/onboarding", get(handlers::onboarding))
        .route("/doctor-onboarding", get(handlers::doctor_onboarding))
        .route("/clinic-onboarding", get(handlers::clinic_onboarding))
        // GET /{locale}/admin
        // Admin role enforced in the handler; other roles are redirected to their own page.
        .route("/admin", get(handlers::admin_dashboard))
}
