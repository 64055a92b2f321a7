use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header, request::Parts},
    response::Response,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use medibook_gateway::{
    AppConfig, AppState, SessionState, create_router,
    config::Env,
    locale::LocalePrefix,
    session::{Claims, SESSION_COOKIE, Session, SessionError, SessionMetadata, SessionProvider},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::SystemTime,
};
use tower::ServiceExt;

const TEST_JWT_SECRET: &str = "handler-test-secret";

// --- Test Harness ---

fn app_with(prefix: LocalePrefix) -> Router {
    let mut config = AppConfig::default();
    config.env = Env::Production;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config.locale_prefix = prefix;
    create_router(AppState::with_jwt_sessions(config))
}

fn app() -> Router {
    app_with(LocalePrefix::AsNeeded)
}

/// Identity provider that is down: every lookup fails.
struct UnavailableProvider {
    lookups: AtomicUsize,
}

#[async_trait]
impl SessionProvider for UnavailableProvider {
    async fn session(&self, _parts: &Parts) -> Result<Session, SessionError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(SessionError::Unavailable("connection refused".to_string()))
    }
}

fn app_with_unavailable_provider() -> (Router, Arc<UnavailableProvider>) {
    let provider = Arc::new(UnavailableProvider {
        lookups: AtomicUsize::new(0),
    });
    let sessions: SessionState = provider.clone();
    (create_router(AppState::new(AppConfig::default(), sessions)), provider)
}

fn session_cookie(role: Option<&str>) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: "user_handler".to_string(),
        iat: now,
        exp: now + 3600,
        metadata: SessionMetadata {
            role: role.map(str::to_string),
        },
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("{SESSION_COOKIE}={token}")
}

async fn get(app: Router, uri: &str, cookie: Option<String>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// --- Gate Behaviour ---

#[tokio::test]
async fn test_public_page_served_without_session() {
    let response = get(app(), "/sign-in", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_LANGUAGE).unwrap(),
        "en"
    );
    let body = body_text(response).await;
    assert!(body.contains("lang=\"en\" dir=\"ltr\""));
    assert!(body.contains("data-page=\"SignIn\""));
}

#[tokio::test]
async fn test_arabic_pages_render_rtl() {
    let response = get(app(), "/ar", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("lang=\"ar\" dir=\"rtl\""));
    assert!(body.contains("data-page=\"Home\""));
}

#[tokio::test]
async fn test_protected_page_redirects_anonymous_user_to_sign_in() {
    let response = get(app(), "/ar/doctor-onboarding", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/ar/sign-in?redirect_url=%2Far%2Fdoctor-onboarding"
    );
}

#[tokio::test]
async fn test_sign_in_redirect_target_is_served() {
    let redirect = get(app(), "/onboarding", None).await;
    let target = location(&redirect).to_string();

    let response = get(app(), &target, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("name=\"redirect_url\" value=\"/onboarding\""));
}

#[tokio::test]
async fn test_protected_page_served_with_session() {
    let response = get(app(), "/ar/doctor-onboarding", Some(session_cookie(Some("doctor")))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_LANGUAGE).unwrap(),
        "ar"
    );
    let body = body_text(response).await;
    assert!(body.contains("data-page=\"DoctorOnboarding\""));
}

#[tokio::test]
async fn test_always_policy_redirects_unprefixed_public_page() {
    let response = get(app_with(LocalePrefix::Always), "/sign-up", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/en/sign-up");
}

#[tokio::test]
async fn test_unsupported_locale_stays_protected() {
    let response = get(app(), "/fr/onboarding", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/sign-in?redirect_url=%2Ffr%2Fonboarding");
}

#[tokio::test]
async fn test_trailing_slash_pages_are_served() {
    for uri in ["/sign-in/", "/en/sign-up/", "/ar/"] {
        let response = get(app(), uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    for uri in ["/onboarding/", "/ar/doctor-onboarding/"] {
        let response = get(app(), uri, Some(session_cookie(Some("doctor")))).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_post_to_protected_page_is_sent_to_sign_in_with_get() {
    let request = Request::builder()
        .method("POST")
        .uri("/onboarding")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/sign-in?redirect_url=%2Fonboarding");
}

#[tokio::test]
async fn test_unavailable_identity_provider_degrades_to_sign_in() {
    let (app, provider) = app_with_unavailable_provider();

    let public = get(app.clone(), "/sign-in", None).await;
    assert_eq!(public.status(), StatusCode::OK);

    let protected = get(app, "/ar/onboarding", None).await;
    assert_eq!(protected.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&protected),
        "/ar/sign-in?redirect_url=%2Far%2Fonboarding"
    );
    assert_eq!(provider.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_public_pages_do_not_consult_identity_provider() {
    let (app, provider) = app_with_unavailable_provider();

    for uri in ["/", "/ar", "/sign-in", "/sign-up/verify", "/doctor-invite/token-1"] {
        let response = get(app.clone(), uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
    let api = get(app, "/api/onboarding/patient", None).await;
    assert_eq!(api.status(), StatusCode::OK);

    assert_eq!(provider.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let response = get(app(), "/", None).await;

    assert!(response.headers().contains_key("x-request-id"));
}

// --- Role Dispatch ---

#[tokio::test]
async fn test_continue_dispatches_by_role() {
    let cases = [
        ("/continue", Some("doctor"), "/doctor-onboarding"),
        ("/continue", Some("clinic"), "/clinic-onboarding"),
        ("/continue", Some("patient"), "/onboarding"),
        ("/continue", Some("admin"), "/admin"),
        ("/continue", None, "/onboarding"),
        ("/continue", Some("nurse"), "/onboarding"),
        ("/ar/continue", Some("doctor"), "/ar/doctor-onboarding"),
    ];

    for (uri, role, expected) in cases {
        let response = get(app(), uri, Some(session_cookie(role))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri} {role:?}");
        assert_eq!(location(&response), expected, "{uri} {role:?}");
    }
}

#[tokio::test]
async fn test_continue_without_session_goes_through_sign_in() {
    let response = get(app(), "/ar/continue", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/ar/sign-in?redirect_url=%2Far%2Fcontinue");
}

#[tokio::test]
async fn test_admin_page_checks_role() {
    let admin = get(app(), "/admin", Some(session_cookie(Some("admin")))).await;
    assert_eq!(admin.status(), StatusCode::OK);

    let clinic = get(app(), "/ar/admin", Some(session_cookie(Some("clinic")))).await;
    assert_eq!(clinic.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&clinic), "/ar/clinic-onboarding");
}

// --- API Bypass ---

#[tokio::test]
async fn test_api_is_not_gated_or_localized() {
    let response = get(app_with(LocalePrefix::Always), "/api/onboarding/doctor", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_LANGUAGE).is_none());
    let body = body_text(response).await;
    assert_eq!(body, r#"{"message":"Doctor onboarding API is working"}"#);
}

#[tokio::test]
async fn test_api_post_acknowledges_any_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/onboarding/patient")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"Layla","dateOfBirth":"1990-01-01"}"#))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert_eq!(
        body,
        r#"{"message":"Patient onboarding data received successfully"}"#
    );
}

#[tokio::test]
async fn test_api_post_with_unparseable_body_is_500() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/onboarding/doctor")
        .body(Body::from("not json"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert_eq!(body, r#"{"message":"Error processing doctor onboarding data"}"#);
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let response = get(app(), "/api/openapi.json", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("/api/onboarding/doctor"));
}
