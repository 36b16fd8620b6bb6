use axum::{routing::get, Router};

pub mod auth;
pub mod students;
pub mod system;

/// Router for every endpoint. Access rules live in the permission matrix,
/// not in the route tree.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .merge(auth::router())
        .merge(students::router())
}
