use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use rollcall_auth::{AuthDecision, Credential};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub const USERNAME_TAKEN: &str = "Error: Username is already taken!";
pub const EMAIL_TAKEN: &str = "Error: Email is already in use!";
pub const REGISTERED: &str = "User registered successfully!";
pub const BAD_CREDENTIALS: &str = "Bad credentials";

pub fn router() -> Router {
    Router::new()
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/me", get(me))
}

pub async fn signin(
    Extension(services): Extension<Arc<AppServices>>,
    uri: Uri,
    Json(body): Json<dto::SigninRequest>,
) -> Response {
    let path = uri.path();
    let credential = match services.credentials.lookup(&body.username).await {
        Ok(found) => found,
        Err(e) => return errors::store_error(e, path),
    };

    // Unknown users are checked against a decoy hash so timing matches a wrong password.
    let verified = services.check_credential(credential.as_ref(), body.password).await;
    let Some(credential) = credential.filter(|_| verified) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, BAD_CREDENTIALS, path);
    };

    match services.codec().issue(&credential.username) {
        Ok(issued) => {
            info!(subject = %credential.username, "token issued");
            (StatusCode::OK, Json(dto::JwtResponse::new(issued.token, &credential))).into_response()
        }
        Err(e) => errors::internal_error("token signing failed", e, path),
    }
}

/// Open registration: the requested roles are granted as asked, including
/// `admin`. Deployments that need gated admin accounts must restrict this
/// route in the permission matrix.
pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    uri: Uri,
    Json(body): Json<dto::SignupRequest>,
) -> Response {
    let path = uri.path();
    if body.username.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "username, email and password are required",
            path,
        );
    }

    match services.credentials.exists(&body.username).await {
        Ok(true) => return errors::json_error(StatusCode::BAD_REQUEST, USERNAME_TAKEN, path),
        Ok(false) => {}
        Err(e) => return errors::store_error(e, path),
    }
    match services.credentials.exists_email(&body.email).await {
        Ok(true) => return errors::json_error(StatusCode::BAD_REQUEST, EMAIL_TAKEN, path),
        Ok(false) => {}
        Err(e) => return errors::store_error(e, path),
    }

    let roles = body.roles();
    let secret_hash = match services.hash_secret(body.password).await {
        Ok(hash) => hash,
        Err(e) => return errors::internal_error("password hashing failed", e, path),
    };

    let credential = Credential::new(body.username, body.email, secret_hash, roles);
    let username = credential.username.clone();
    if let Err(e) = services.credentials.save(credential).await {
        return errors::store_error(e, path);
    }

    info!(username = %username, "user registered");
    (StatusCode::OK, Json(dto::MessageResponse::new(REGISTERED))).into_response()
}

pub async fn me(principal: Option<Extension<PrincipalContext>>, uri: Uri) -> Response {
    let Some(Extension(principal)) = principal else {
        return errors::auth_failure(AuthDecision::Unauthenticated, uri.path());
    };
    Json(dto::MeResponse {
        username: principal.subject().to_string(),
        roles: principal.roles().iter().copied().collect(),
    })
    .into_response()
}
