/// Router Module Index
///
/// Organizes routing into access-segregated modules. Page routers are written with
/// locale-free paths and nested under every supported locale by `create_router`; the
/// request gate rewrites incoming paths to that prefixed form before routing.

/// Pages reachable without a session.
/// Must stay in step with `classifier::PUBLIC_ROUTES`.
pub mod public;

/// Pages that the request gate only lets through with a session.
pub mod authenticated;

/// The `/api` namespace. Bypassed by the gate; each handler owns its own policy.
pub mod api;
