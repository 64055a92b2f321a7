use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Pages any visitor may open, signed in or not. The `{*rest}` variants cover the
/// identity provider's multi-step flows (`/sign-in/factor-one`, `/sign-up/verify`...).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /{locale}
        .route("/", get(handlers::home))
        // GET /{locale}/sign-in[/...]
        // Receives `redirect_url` when the gate bounced a protected request here.
        .route("/sign-in", get(handlers::sign_in))
        .route("/sign-in/{*rest}", get(handlers::sign_in))
        // GET /{locale}/sign-up[/...]
        .route("/sign-up", get(handlers::sign_up))
        .route("/sign-up/{*rest}", get(handlers::sign_up))
        // GET /{locale}/doctor-invite[/...] and /{locale}/clinic-invite[/...]
        // Invite links are opened before the invitee has an account.
        .route("/doctor-invite", get(handlers::doctor_invite))
        .route("/doctor-invite/{*rest}", get(handlers::doctor_invite))
        .route("/clinic-invite", get(handlers::clinic_invite))
        .route("/clinic-invite/{*rest}", get(handlers::clinic_invite))
}
