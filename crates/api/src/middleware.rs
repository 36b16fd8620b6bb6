//! Request pipeline stages.
//!
//! The order lives in [`PIPELINE`]; the router applies layers from it, first
//! entry outermost.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::debug;

use rollcall_auth::{AuthDecision, GatewayOutcome};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::config::CorsConfig;
use crate::context::PrincipalContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Cross-origin policy; answers preflights before anything else runs.
    Cors,
    /// Token → principal. Never rejects on its own.
    Authenticate,
    /// Permission matrix; the only stage that turns auth state into 401/403.
    Authorize,
}

pub const PIPELINE: [Stage; 3] = [Stage::Cors, Stage::Authenticate, Stage::Authorize];

pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.allowed_origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(config.max_age)
}

pub async fn authenticate(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let outcome = services.gateway.authenticate(authorization.as_deref()).await;
    match &outcome {
        GatewayOutcome::NoToken => {}
        GatewayOutcome::TokenRejected(reason) => {
            debug!(path = req.uri().path(), reason = %reason, "continuing unauthenticated")
        }
        GatewayOutcome::Authenticated(principal) => {
            debug!(subject = principal.subject(), "request authenticated")
        }
    }

    if let Some(principal) = outcome.into_principal() {
        req.extensions_mut().insert(PrincipalContext::new(principal));
    }
    next.run(req).await
}

pub async fn authorize(State(services): State<Arc<AppServices>>, req: Request, next: Next) -> Response {
    let principal = req
        .extensions()
        .get::<PrincipalContext>()
        .map(PrincipalContext::principal);
    let evaluation = services.matrix.evaluate(req.method(), req.uri().path(), principal);

    match evaluation.decision {
        AuthDecision::Allow => next.run(req).await,
        denied => {
            debug!(
                method = %req.method(),
                path = req.uri().path(),
                rule = ?evaluation.rule,
                decision = ?denied,
                "request denied"
            );
            errors::auth_failure(denied, req.uri().path())
        }
    }
}
