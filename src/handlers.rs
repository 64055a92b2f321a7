use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    dispatcher::{RoleDestinations, RoleDispatcher, SessionSnapshot},
    locale::{Locale, LocaleContext},
    models::{ApiMessage, OnboardingKind, Role},
    session::{CurrentSession, RETURN_TO_PARAM},
};

// --- Page Rendering ---

/// Page
///
/// Every page the gateway serves. Real page content lives in the front end; these
/// render a localized shell so the routing, `lang` and `dir` can be checked end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    SignIn,
    SignUp,
    DoctorInvite,
    ClinicInvite,
    Onboarding,
    DoctorOnboarding,
    ClinicOnboarding,
    Admin,
    Continue,
}

impl Page {
    pub fn title(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Page::Home, Locale::En) => "Book your care",
            (Page::Home, Locale::Ar) => "احجز رعايتك",
            (Page::SignIn, Locale::En) => "Sign in",
            (Page::SignIn, Locale::Ar) => "تسجيل الدخول",
            (Page::SignUp, Locale::En) => "Create an account",
            (Page::SignUp, Locale::Ar) => "إنشاء حساب",
            (Page::DoctorInvite, Locale::En) => "Doctor invitation",
            (Page::DoctorInvite, Locale::Ar) => "دعوة طبيب",
            (Page::ClinicInvite, Locale::En) => "Clinic invitation",
            (Page::ClinicInvite, Locale::Ar) => "دعوة عيادة",
            (Page::Onboarding, Locale::En) => "Patient onboarding",
            (Page::Onboarding, Locale::Ar) => "تسجيل المريض",
            (Page::DoctorOnboarding, Locale::En) => "Doctor onboarding",
            (Page::DoctorOnboarding, Locale::Ar) => "تسجيل الطبيب",
            (Page::ClinicOnboarding, Locale::En) => "Clinic onboarding",
            (Page::ClinicOnboarding, Locale::Ar) => "تسجيل العيادة",
            (Page::Admin, Locale::En) => "Administration",
            (Page::Admin, Locale::Ar) => "الإدارة",
            (Page::Continue, Locale::En) => "Loading…",
            (Page::Continue, Locale::Ar) => "جارٍ التحميل…",
        }
    }
}

/// Renders the HTML shell with `lang`/`dir` taken from the resolved locale.
pub fn render(context: &LocaleContext, page: Page, head: &str, body: &str) -> Html<String> {
    let title = page.title(context.locale);
    Html(format!(
        "<!DOCTYPE html>\
         <html lang=\"{lang}\" dir=\"{dir}\">\
         <head><meta charset=\"utf-8\"><title>{title}</title>{head}</head>\
         <body><main data-page=\"{page:?}\"><h1>{title}</h1>{body}</main></body>\
         </html>",
        lang = context.locale,
        dir = context.direction.as_str(),
    ))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

// --- Public Pages ---

/// home
///
/// [Public Route] Landing page of every locale root.
pub async fn home(Extension(context): Extension<LocaleContext>) -> Html<String> {
    render(&context, Page::Home, "", "")
}

/// Query of the sign-in page. `redirect_url` is the page the visitor originally asked for.
#[derive(Debug, Deserialize)]
pub struct SignInParams {
    pub redirect_url: Option<String>,
}

/// sign_in
///
/// [Public Route] Carries `redirect_url` through the form so the visitor returns to it
/// after authenticating.
pub async fn sign_in(
    Extension(context): Extension<LocaleContext>,
    Query(params): Query<SignInParams>,
) -> Html<String> {
    let body = match params.redirect_url {
        Some(target) => format!(
            "<form method=\"post\"><input type=\"hidden\" name=\"{RETURN_TO_PARAM}\" value=\"{}\"></form>",
            escape_html(&target)
        ),
        None => String::new(),
    };
    render(&context, Page::SignIn, "", &body)
}

/// sign_up
///
/// [Public Route] Account creation, handled by the identity provider's form.
pub async fn sign_up(Extension(context): Extension<LocaleContext>) -> Html<String> {
    render(&context, Page::SignUp, "", "")
}

/// doctor_invite
///
/// [Public Route] Opened from a doctor invitation link, before the invitee has an account.
pub async fn doctor_invite(Extension(context): Extension<LocaleContext>) -> Html<String> {
    render(&context, Page::DoctorInvite, "", "")
}

/// clinic_invite
///
/// [Public Route] Opened from a clinic invitation link, before the invitee has an account.
pub async fn clinic_invite(Extension(context): Extension<LocaleContext>) -> Html<String> {
    render(&context, Page::ClinicInvite, "", "")
}

// --- Authenticated Pages ---

/// onboarding
///
/// [Authenticated Route] Patient onboarding, also the landing page for accounts without a role.
pub async fn onboarding(Extension(context): Extension<LocaleContext>) -> Html<String> {
    render(&context, Page::Onboarding, "", "")
}

/// doctor_onboarding
///
/// [Authenticated Route] Doctor onboarding.
pub async fn doctor_onboarding(Extension(context): Extension<LocaleContext>) -> Html<String> {
    render(&context, Page::DoctorOnboarding, "", "")
}

/// clinic_onboarding
///
/// [Authenticated Route] Clinic onboarding.
pub async fn clinic_onboarding(Extension(context): Extension<LocaleContext>) -> Html<String> {
    render(&context, Page::ClinicOnboarding, "", "")
}

/// admin_dashboard
///
/// [Authenticated Route] Admins only. Other roles are sent to their own landing page.
pub async fn admin_dashboard(
    State(destinations): State<RoleDestinations>,
    Extension(context): Extension<LocaleContext>,
    CurrentSession(session): CurrentSession,
) -> Response {
    let role = session.and_then(|s| s.role);
    if role == Some(Role::Admin) {
        return render(&context, Page::Admin, "", "").into_response();
    }
    Redirect::to(&destinations.destination(role, context.locale)).into_response()
}

/// continue_after_auth
///
/// [Authenticated Route] Landing page after sign-in or sign-up. Answers with a `303` to
/// the role's destination, or the pending indicator while there is no session.
pub async fn continue_after_auth(
    State(destinations): State<RoleDestinations>,
    Extension(context): Extension<LocaleContext>,
    CurrentSession(session): CurrentSession,
) -> Response {
    let mut dispatcher = RoleDispatcher::new(destinations, context.locale);
    let mut navigations: Vec<String> = Vec::new();
    let snapshot = SessionSnapshot::loaded(session.as_ref());

    match dispatcher.observe(&snapshot, &mut navigations) {
        Some(destination) => Redirect::to(&destination).into_response(),
        None => pending(&context).into_response(),
    }
}

fn pending(context: &LocaleContext) -> Html<String> {
    render(
        context,
        Page::Continue,
        "<meta http-equiv=\"refresh\" content=\"2\">",
        "<p role=\"status\" aria-busy=\"true\"></p>",
    )
}

// --- Onboarding API Stubs ---

/// submit_doctor_onboarding
///
/// [API Route] Accepts any JSON body and acknowledges it. A body that is not JSON
/// yields a 500 with an error message.
#[utoipa::path(
    post,
    path = "/api/onboarding/doctor",
    request_body(content = Object, content_type = "application/json"),
    responses(
        (status = 200, description = "Submission acknowledged", body = ApiMessage),
        (status = 500, description = "Body could not be parsed", body = ApiMessage)
    )
)]
pub async fn submit_doctor_onboarding(body: Bytes) -> (StatusCode, Json<ApiMessage>) {
    acknowledge(OnboardingKind::Doctor, &body)
}

/// doctor_onboarding_status
///
/// [API Route] Fixed liveness message.
#[utoipa::path(
    get,
    path = "/api/onboarding/doctor",
    responses((status = 200, description = "Endpoint is up", body = ApiMessage))
)]
pub async fn doctor_onboarding_status() -> Json<ApiMessage> {
    status(OnboardingKind::Doctor)
}

/// submit_patient_onboarding
///
/// [API Route] Same contract as the doctor submission.
#[utoipa::path(
    post,
    path = "/api/onboarding/patient",
    request_body(content = Object, content_type = "application/json"),
    responses(
        (status = 200, description = "Submission acknowledged", body = ApiMessage),
        (status = 500, description = "Body could not be parsed", body = ApiMessage)
    )
)]
pub async fn submit_patient_onboarding(body: Bytes) -> (StatusCode, Json<ApiMessage>) {
    acknowledge(OnboardingKind::Patient, &body)
}

/// patient_onboarding_status
///
/// [API Route] Fixed liveness message.
#[utoipa::path(
    get,
    path = "/api/onboarding/patient",
    responses((status = 200, description = "Endpoint is up", body = ApiMessage))
)]
pub async fn patient_onboarding_status() -> Json<ApiMessage> {
    status(OnboardingKind::Patient)
}

fn acknowledge(kind: OnboardingKind, body: &[u8]) -> (StatusCode, Json<ApiMessage>) {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(payload) => {
            // Field count only; submissions carry personal health data.
            tracing::info!(
                kind = kind.label(),
                fields = payload.as_object().map(|o| o.len()).unwrap_or(0),
                "onboarding submission received"
            );
            (
                StatusCode::OK,
                Json(ApiMessage::new(format!(
                    "{} onboarding data received successfully",
                    kind.label()
                ))),
            )
        }
        Err(e) => {
            tracing::error!(kind = kind.label(), error = %e, "onboarding submission unreadable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::new(format!(
                    "Error processing {} onboarding data",
                    kind.label().to_lowercase()
                ))),
            )
        }
    }
}

fn status(kind: OnboardingKind) -> Json<ApiMessage> {
    Json(ApiMessage::new(format!(
        "{} onboarding API is working",
        kind.label()
    )))
}
