use axum::http::{Method, Request, Uri, header, request::Parts};
use jsonwebtoken::{EncodingKey, Header, encode};
use medibook_gateway::{
    config::{AppConfig, Env},
    models::Role,
    session::{
        Claims, JwtSessionProvider, SESSION_COOKIE, SessionError, SessionMetadata,
        SessionProvider, extract_token,
    },
};
use std::time::SystemTime;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: &str = "user_2test";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(role: Option<&str>, issued_at: u64, expires_at: u64, secret: &str) -> String {
    let claims = Claims {
        sub: TEST_USER_ID.to_string(),
        iat: issued_at as usize,
        exp: expires_at as usize,
        metadata: SessionMetadata {
            role: role.map(str::to_string),
        },
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn valid_token(role: Option<&str>) -> String {
    let now = now();
    create_token(role, now, now + 3600, TEST_JWT_SECRET)
}

fn provider(env: Env) -> JwtSessionProvider {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    JwtSessionProvider::new(&config)
}

/// Helper to get the Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/onboarding".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_session_from_bearer_token() {
    let parts = with_bearer(&valid_token(Some("doctor")));

    let session = provider(Env::Production).session(&parts).await;

    let session = session.expect("valid token yields a session");
    assert_eq!(session.user_id, TEST_USER_ID);
    assert_eq!(session.role, Some(Role::Doctor));
}

#[tokio::test]
async fn test_session_from_cookie_is_preferred() {
    let mut parts = get_request_parts(Method::GET, "/ar/admin".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!(
            "theme=dark; {}={}",
            SESSION_COOKIE,
            valid_token(Some("admin"))
        ))
        .unwrap(),
    );
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Bearer not-a-jwt"),
    );

    let session = provider(Env::Production).session(&parts).await.unwrap();

    assert_eq!(session.role, Some(Role::Admin));
}

#[tokio::test]
async fn test_unknown_or_missing_role_is_narrowed_to_none() {
    let provider = provider(Env::Production);

    let unknown = provider
        .session(&with_bearer(&valid_token(Some("nurse"))))
        .await
        .unwrap();
    assert_eq!(unknown.role, None);

    let missing = provider
        .session(&with_bearer(&valid_token(None)))
        .await
        .unwrap();
    assert_eq!(missing.role, None);
}

#[tokio::test]
async fn test_missing_token_is_reported() {
    let parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let result = provider(Env::Production).session(&parts).await;

    assert!(matches!(result, Err(SessionError::Missing)));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let now = now();
    // Well past the default validation leeway.
    let token = create_token(Some("patient"), now - 7200, now - 3600, TEST_JWT_SECRET);

    let result = provider(Env::Production).session(&with_bearer(&token)).await;

    assert!(matches!(result, Err(SessionError::Expired)));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let now = now();
    let token = create_token(Some("patient"), now, now + 3600, "some-other-secret");

    let result = provider(Env::Production).session(&with_bearer(&token)).await;

    assert!(matches!(result, Err(SessionError::Rejected(_))));
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_static("user_local"),
    );
    parts.headers.insert(
        header::HeaderName::from_static("x-user-role"),
        header::HeaderValue::from_static("Clinic"),
    );

    let session = provider(Env::Local).session(&parts).await.unwrap();

    assert_eq!(session.user_id, "user_local");
    assert_eq!(session.role, Some(Role::Clinic));
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass header
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_static("user_local"),
    );

    let result = provider(Env::Production).session(&parts).await;

    assert!(matches!(result, Err(SessionError::Missing)));
}

#[test]
fn test_extract_token_ignores_empty_values() {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!("{}=", SESSION_COOKIE)).unwrap(),
    );
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Bearer "),
    );

    assert_eq!(extract_token(&parts.headers), None);
}
