use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request gating: locale negotiation, route classification, session gate, pipeline.
pub mod classifier;
pub mod locale;
pub mod pipeline;
pub mod session;

// Post-authentication role dispatch.
pub mod dispatcher;

// Configuration, shared types and the page/API collaborators.
pub mod config;
pub mod handlers;
pub mod models;

// Module for routing segregation (Public, Authenticated, API).
pub mod routes;
use routes::{api, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use dispatcher::RoleDestinations;
pub use locale::Locale;
pub use pipeline::{Decision, RequestPipeline};
pub use session::{JwtSessionProvider, SessionState};

/// ApiDoc
///
/// OpenAPI document for the `/api` namespace, served at `/api/openapi.json` with the
/// Swagger UI at `/api/docs`. Both live inside the API namespace so the gate never
/// redirects them.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::submit_doctor_onboarding, handlers::doctor_onboarding_status,
        handlers::submit_patient_onboarding, handlers::patient_onboarding_status,
    ),
    components(schemas(models::ApiMessage, models::Role, locale::Locale)),
    tags(
        (name = "medibook", description = "Healthcare booking onboarding API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single, cheaply cloneable container for everything a request may consult. All of it
/// is built once at startup and only read afterwards: the identity provider handle,
/// the pipeline (public route table + locale settings) and the role destination table.
#[derive(Clone)]
pub struct AppState {
    /// Identity provider boundary.
    pub sessions: SessionState,
    /// Ordered gate stages shared by every request.
    pub pipeline: Arc<RequestPipeline>,
    /// Role -> landing page table.
    pub destinations: RoleDestinations,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, sessions: SessionState) -> Self {
        let pipeline = RequestPipeline::from_config(&config);
        let destinations = RoleDestinations::new(pipeline.locales().clone());
        Self {
            sessions,
            pipeline: Arc::new(pipeline),
            destinations,
            config,
        }
    }

    /// State backed by the token-verifying provider built from `config`.
    pub fn with_jwt_sessions(config: AppConfig) -> Self {
        let sessions = Arc::new(JwtSessionProvider::new(&config)) as SessionState;
        Self::new(config, sessions)
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for RoleDestinations {
    fn from_ref(app_state: &AppState) -> RoleDestinations {
        app_state.destinations.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure. Page routers are nested under every supported
/// locale; the request gate wraps the whole inner router (API included) so it runs
/// before routing and can rewrite `/sign-in` to `/en/sign-in`.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Inner Router Assembly
    let pages: Router<AppState> = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes());

    let mut inner = Router::new()
        // Documentation: Swagger UI for the API namespace.
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        // API Routes: forwarded untouched by the gate.
        .nest("/api", api::api_routes());

    for locale in Locale::ALL {
        inner = inner.nest(&format!("/{locale}"), pages.clone());
    }

    let inner = inner.with_state(state.clone());

    // 3. Request Gate (classification -> session -> locale), in front of routing.
    let gated = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(state, pipeline::request_gate))
        .service(inner);

    // 4. Observability and Correlation Layers (Applied outermost/first)
    Router::new()
        .fallback_service(gated)
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                // 4b. Request Tracing, correlated by the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span: method, URI as received (before any locale rewrite)
/// and the `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
