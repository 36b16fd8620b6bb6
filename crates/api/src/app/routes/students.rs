use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::info;

use rollcall_core::StudentId;
use rollcall_students::StudentDraft;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/api/students", get(list_students).post(create_student))
        .route("/api/students/:id", get(get_student).put(update_student).delete(delete_student))
}

pub async fn list_students(Extension(services): Extension<Arc<AppServices>>, uri: Uri) -> Response {
    match services.students.list().await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::domain_error(e, uri.path()),
    }
}

pub async fn get_student(
    Extension(services): Extension<Arc<AppServices>>,
    uri: Uri,
    Path(id): Path<String>,
) -> Response {
    let id = match id.parse::<StudentId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error(e, uri.path()),
    };
    match services.students.get(id).await {
        Ok(student) => Json(student).into_response(),
        Err(e) => errors::domain_error(e, uri.path()),
    }
}

pub async fn create_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    uri: Uri,
    Json(body): Json<StudentDraft>,
) -> Response {
    match services.students.insert(body).await {
        Ok(student) => {
            info!(student_id = %student.id, by = principal.subject(), "student created");
            let location = format!("/api/students/{}", student.id);
            (StatusCode::CREATED, [(header::LOCATION, location)], Json(student)).into_response()
        }
        Err(e) => errors::domain_error(e, uri.path()),
    }
}

pub async fn update_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    uri: Uri,
    Path(id): Path<String>,
    Json(body): Json<StudentDraft>,
) -> Response {
    let id = match id.parse::<StudentId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error(e, uri.path()),
    };
    match services.students.update(id, body).await {
        Ok(student) => {
            info!(student_id = %id, by = principal.subject(), "student updated");
            Json(student).into_response()
        }
        Err(e) => errors::domain_error(e, uri.path()),
    }
}

pub async fn delete_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    uri: Uri,
    Path(id): Path<String>,
) -> Response {
    let id = match id.parse::<StudentId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error(e, uri.path()),
    };
    match services.students.remove(id).await {
        Ok(()) => {
            info!(student_id = %id, by = principal.subject(), "student deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::domain_error(e, uri.path()),
    }
}
