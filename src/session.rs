use std::{convert::Infallible, sync::Arc};

use async_trait::async_trait;
use axum::http::{HeaderMap, header, request::Parts};
use axum::extract::FromRequestParts;
use cookie::Cookie;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    classifier::RouteClassifier,
    config::{AppConfig, Env},
    locale::{LocalePrefix, LocaleResolver, split_locale, with_prefix},
    models::Role,
};

/// Cookie the identity provider stores the session token in.
pub const SESSION_COOKIE: &str = "__session";
/// Query parameter carrying the originally requested target through sign-in.
pub const RETURN_TO_PARAM: &str = "redirect_url";
/// Locale-free sign-in page.
pub const SIGN_IN_PATH: &str = "/sign-in";
/// Prefix of the API namespace, which the gate never inspects.
pub const API_PREFIX: &str = "/api";

/// Claims
///
/// Payload of a session token issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the provider's user id (e.g. `user_2abc...`).
    pub sub: String,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    /// Free-form public metadata; only `role` is consulted.
    #[serde(default)]
    pub metadata: SessionMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// Session
///
/// Read-only proof of identity for one request. The gateway never creates, mutates
/// or destroys sessions; it only asks the provider whether one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub role: Option<Role>,
}

/// Why a request carries no usable session. Logged, never shown to the user.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session token on request")]
    Missing,
    #[error("session token has expired")]
    Expired,
    #[error("session token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
    #[error("session has no subject")]
    NoSubject,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// SessionProvider
///
/// The identity-provider boundary: given the request head, answer with the session or
/// the reason there is none. Implementations must be shareable across request tasks.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self, parts: &Parts) -> Result<Session, SessionError>;
}

/// Type alias for the shared provider held in the application state.
pub type SessionState = Arc<dyn SessionProvider>;

/// JwtSessionProvider
///
/// Verifies HS256 session tokens carried in the `__session` cookie or an
/// `Authorization: Bearer` header.
///
/// In `Env::Local` an `x-user-id` header (with optional `x-user-role`) is accepted
/// instead of a token to speed up development. The bypass is ignored in production.
#[derive(Clone)]
pub struct JwtSessionProvider {
    env: Env,
    decoding_key: DecodingKey,
}

impl JwtSessionProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            env: config.env.clone(),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    fn local_bypass(&self, headers: &HeaderMap) -> Option<Session> {
        if self.env != Env::Local {
            return None;
        }
        let user_id = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())?;
        let role = headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok());

        Some(Session {
            user_id: user_id.to_string(),
            role: Role::narrow(role),
        })
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn session(&self, parts: &Parts) -> Result<Session, SessionError> {
        if let Some(session) = self.local_bypass(&parts.headers) {
            return Ok(session);
        }

        let token = extract_token(&parts.headers).ok_or(SessionError::Missing)?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(&token, &self.decoding_key, &validation).map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                SessionError::Expired
            } else {
                SessionError::Rejected(e)
            }
        })?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            return Err(SessionError::NoSubject);
        }

        Ok(Session {
            user_id: claims.sub,
            role: Role::narrow(claims.metadata.role.as_deref()),
        })
    }
}

/// Reads the session token from the cookie (preferred) or the Bearer header (fallback).
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse_encoded)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Result of the gate for a single request.
#[derive(Debug, Clone, PartialEq)]
pub enum Authorization {
    Allow,
    /// Sign-in location carrying the original target as `redirect_url`.
    Redirect(String),
}

/// SessionGate
///
/// Decides whether a request may proceed given its (possibly absent) session.
/// API paths and public paths are always allowed; everything else needs a session
/// with a user id.
#[derive(Debug, Clone)]
pub struct SessionGate {
    classifier: RouteClassifier,
    locales: LocaleResolver,
}

impl SessionGate {
    pub fn new(classifier: RouteClassifier, locales: LocaleResolver) -> Self {
        Self {
            classifier,
            locales,
        }
    }

    pub fn is_api(path: &str) -> bool {
        match path.strip_prefix(API_PREFIX) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
            None => false,
        }
    }

    /// Neither API nor public: a session decides what happens.
    pub fn is_protected(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        !Self::is_api(path) && !self.classifier.is_public(path)
    }

    /// `target` is the original path and query; only its path is classified.
    pub fn authorize(&self, target: &str, session: Option<&Session>) -> Authorization {
        let path = target.split(['?', '#']).next().unwrap_or(target);

        if !self.is_protected(path) {
            return Authorization::Allow;
        }

        match session {
            Some(session) if !session.user_id.is_empty() => Authorization::Allow,
            _ => Authorization::Redirect(self.sign_in_location(path, target)),
        }
    }

    /// The sign-in page keeps the locale the user was browsing in. Unprefixed paths go
    /// to the unprefixed sign-in page unless every path must carry a prefix.
    fn sign_in_location(&self, path: &str, target: &str) -> String {
        let sign_in = match split_locale(path).0 {
            Some(locale) => with_prefix(locale, SIGN_IN_PATH),
            None if self.locales.prefix() == LocalePrefix::Always => {
                with_prefix(self.locales.default_locale(), SIGN_IN_PATH)
            }
            None => SIGN_IN_PATH.to_string(),
        };
        format!("{sign_in}?{RETURN_TO_PARAM}={}", urlencoding::encode(target))
    }
}

/// CurrentSession
///
/// Extractor for the session the pipeline attached to the request, if any.
/// Never rejects: public pages see `None` for anonymous visitors.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(parts.extensions.get::<Session>().cloned()))
    }
}
