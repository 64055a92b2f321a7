use axum::{
    extract::{Request, State},
    http::{HeaderValue, Uri, header, uri::PathAndQuery},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    classifier::RouteClassifier,
    config::AppConfig,
    locale::{LocaleContext, LocaleResolver},
    session::{Authorization, Session, SessionGate},
};

/// Why the pipeline sent the client elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// Protected path without a session.
    SignIn,
    /// Locale prefix policy (or a detected locale) requires a prefixed path.
    LocalePrefix,
}

/// Decision
///
/// The single answer the pipeline produces for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// API namespace: forwarded untouched, no locale, no session check.
    Bypass,
    /// Forward with the resolved locale attached.
    Allow(LocaleContext),
    Redirect {
        location: String,
        reason: RedirectReason,
    },
}

/// RequestPipeline
///
/// Ordered composition of the gate stages. The order is part of the contract:
/// 1. API namespace -> bypass.
/// 2. Classify the path and, if protected, require a session (redirect to sign-in).
/// 3. Resolve the locale; a prefix-policy redirect is terminal.
/// 4. Otherwise allow with the locale context.
///
/// Authorization always completes before any locale work, so no localized form of a
/// protected page is computed for an anonymous request.
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    gate: SessionGate,
    locales: LocaleResolver,
}

impl RequestPipeline {
    pub fn new(classifier: RouteClassifier, locales: LocaleResolver) -> Self {
        Self {
            gate: SessionGate::new(classifier, locales.clone()),
            locales,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            RouteClassifier::public_defaults(),
            LocaleResolver::from_config(config),
        )
    }

    pub fn locales(&self) -> &LocaleResolver {
        &self.locales
    }

    /// Whether `path` is gated, i.e. whether its decision depends on the session.
    pub fn requires_session(&self, path: &str) -> bool {
        self.gate.is_protected(path)
    }

    /// `target` is the request's path and query.
    pub fn evaluate(
        &self,
        target: &str,
        accept_language: Option<&str>,
        session: Option<&Session>,
    ) -> Decision {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        if SessionGate::is_api(path) {
            return Decision::Bypass;
        }

        if let Authorization::Redirect(location) = self.gate.authorize(target, session) {
            return Decision::Redirect {
                location,
                reason: RedirectReason::SignIn,
            };
        }

        let resolution = self.locales.negotiate(path, accept_language);
        match resolution.redirect {
            Some(localized) => Decision::Redirect {
                location: with_query(localized, query),
                reason: RedirectReason::LocalePrefix,
            },
            None => Decision::Allow(resolution.context),
        }
    }
}

fn with_query(path: String, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path,
    }
}

/// request_gate
///
/// Axum middleware running the `RequestPipeline` in front of the page and API router.
/// It sits outside the inner router so the URI can be rewritten to the locale-prefixed
/// form before routing happens.
///
/// The identity provider is only asked about protected paths; a failed lookup counts
/// as no session. Sign-in redirects are `303`, locale redirects `307`.
///
/// On `Allow` the `LocaleContext` and the `Session` (if any) are inserted as request
/// extensions and the response is tagged with `Content-Language`.
pub async fn request_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if SessionGate::is_api(request.uri().path()) {
        tracing::trace!(path = %request.uri().path(), "api namespace, bypassing gate");
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();

    // Public pages never wait on the identity provider.
    let session = if state.pipeline.requires_session(parts.uri.path()) {
        match state.sessions.session(&parts).await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(reason = %e, "request carries no session");
                None
            }
        }
    } else {
        None
    };

    let target = parts
        .uri
        .path_and_query()
        .map(PathAndQuery::as_str)
        .unwrap_or_else(|| parts.uri.path())
        .to_string();
    let accept_language = parts
        .headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok());

    let decision = state
        .pipeline
        .evaluate(&target, accept_language, session.as_ref());

    match decision {
        Decision::Bypass => next.run(Request::from_parts(parts, body)).await,
        Decision::Redirect { location, reason } => {
            tracing::info!(from = %target, to = %location, ?reason, "redirecting request");
            match reason {
                // 303: the sign-in page only answers GET.
                RedirectReason::SignIn => Redirect::to(&location).into_response(),
                RedirectReason::LocalePrefix => Redirect::temporary(&location).into_response(),
            }
        }
        Decision::Allow(context) => {
            tracing::debug!(
                locale = %context.locale,
                path = %context.rewritten_path,
                authenticated = session.is_some(),
                "request allowed"
            );

            match rewrite_uri(&parts.uri, &context.rewritten_path) {
                Ok(uri) => parts.uri = uri,
                Err(e) => tracing::warn!(error = %e, "could not rewrite request uri"),
            }

            let content_language = HeaderValue::from_static(context.locale.as_str());
            parts.extensions.insert(context);
            if let Some(session) = session {
                parts.extensions.insert(session);
            }

            let mut response = next.run(Request::from_parts(parts, body)).await;
            response
                .headers_mut()
                .insert(header::CONTENT_LANGUAGE, content_language);
            response
        }
    }
}

/// Replaces the path of `uri`, keeping its query.
fn rewrite_uri(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut uri_parts = uri.clone().into_parts();
    uri_parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(uri_parts)?)
}
