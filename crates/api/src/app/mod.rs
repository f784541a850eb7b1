//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: event store, bus, projections, dropdown storage
//! - `workflows.rs`: operations that span more than one aggregate
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request bodies and query strings
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use loomworks_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod workflows;

/// Router over already-built services. Tests use this with their own secret.
pub fn build_router(services: Arc<services::AppServices>, jwt_secret: &str) -> Router {
    let jwt = Arc::new(loomworks_auth::Hs256JwtValidator::new(jwt_secret));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require auth + tenant context.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", protected)
        .layer(ServiceBuilder::new())
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(
    config: &AppConfig,
) -> Result<(Router, Arc<services::AppServices>), services::ServiceError> {
    let services = services::build_services(config).await?;
    let router = build_router(services.clone(), &config.jwt_secret);
    Ok((router, services))
}
