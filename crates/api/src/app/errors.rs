//! The single place where outcomes become HTTP status codes.
//!
//! Every failure uses the same `{status, error, message, path}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use rollcall_auth::{AuthDecision, StoreError};
use rollcall_core::DomainError;

pub const UNAUTHENTICATED_MESSAGE: &str = "Full authentication is required to access this resource";
pub const FORBIDDEN_MESSAGE: &str = "Access Denied";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

pub fn json_error(status: StatusCode, message: impl Into<String>, path: &str) -> Response {
    let body = ErrorBody {
        status: status.as_u16(),
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message: message.into(),
        path: path.to_string(),
    };
    (status, axum::Json(body)).into_response()
}

/// Failure responder for a denied request. Internal reasons never reach the body.
pub fn auth_failure(decision: AuthDecision, path: &str) -> Response {
    match decision {
        AuthDecision::Forbidden => json_error(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE, path),
        AuthDecision::Unauthenticated => json_error(StatusCode::UNAUTHORIZED, UNAUTHENTICATED_MESSAGE, path),
        AuthDecision::Allow => {
            tracing::error!(path, "failure responder called for an allowed request; rejecting");
            json_error(StatusCode::UNAUTHORIZED, UNAUTHENTICATED_MESSAGE, path)
        }
    }
}

pub fn domain_error(err: DomainError, path: &str) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, msg, path),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, msg, path),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, msg, path),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, msg, path),
        DomainError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "record store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable", path)
        }
    }
}

pub fn store_error(err: StoreError, path: &str) -> Response {
    match err {
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, format!("{msg} already exists"), path),
        StoreError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "credential store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable", path)
        }
    }
}

pub fn internal_error(context: &str, err: impl core::fmt::Display, path: &str) -> Response {
    tracing::error!(error = %err, "{context}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error", path)
}
