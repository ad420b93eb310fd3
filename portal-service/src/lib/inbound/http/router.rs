use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::current_user::current_user;
use super::handlers::sign_in::sign_in;
use super::middleware::authenticate;
use super::middleware::authorize;
use super::policy::AccessPolicy;
use crate::domain::user::ports::IdentityServicePort;

/// Shared, read-only state for handlers and security middleware.
#[derive(Clone)]
pub struct AppState {
    pub identity_service: Arc<dyn IdentityServicePort>,
    pub authenticator: Arc<Authenticator>,
    pub access_policy: Arc<AccessPolicy>,
}

/// Build the HTTP application.
///
/// `routes` carries the downstream handlers (course catalog, saved courses,
/// ...). They sit behind the same authentication pipeline and access policy
/// as the built-in sign-in routes, and can read the caller through the
/// `AuthenticatedContext` or `CurrentPrincipal` extractors.
pub fn create_router(
    identity_service: Arc<dyn IdentityServicePort>,
    authenticator: Arc<Authenticator>,
    access_policy: Arc<AccessPolicy>,
    routes: Router<AppState>,
) -> Router {
    let state = AppState {
        identity_service,
        authenticator,
        access_policy,
    };

    let auth_routes = Router::new()
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/me", get(current_user));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    // Outermost first: CORS answers preflights before any identity work,
    // then the pipeline publishes the context the policy reads.
    let security = ServiceBuilder::new()
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(middleware::from_fn_with_state(state.clone(), authorize));

    Router::new()
        .merge(auth_routes)
        .merge(routes)
        .layer(security)
        .with_state(state)
}
