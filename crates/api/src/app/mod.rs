//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, gateway, hasher and permission matrix
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: the failure payload and status mapping

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::middleware::{self, Stage, PIPELINE};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Pipeline layers are applied in reverse so the first [`PIPELINE`] entry
/// ends up outermost.
pub fn build_app(config: &ApiConfig, services: Arc<AppServices>) -> Router {
    let mut router = routes::router().layer(Extension(services.clone()));

    for stage in PIPELINE.iter().rev() {
        router = match stage {
            Stage::Cors => router.layer(middleware::cors_layer(&config.cors)),
            Stage::Authenticate => router.layer(axum::middleware::from_fn_with_state(
                services.clone(),
                middleware::authenticate,
            )),
            Stage::Authorize => router.layer(axum::middleware::from_fn_with_state(
                services.clone(),
                middleware::authorize,
            )),
        };
    }

    router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
