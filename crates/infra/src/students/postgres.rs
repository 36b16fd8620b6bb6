//! Postgres-backed student store. Courses are stored as a JSONB object.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use rollcall_core::{DomainError, StudentId};
use rollcall_students::{Student, StudentClass, StudentDraft, StudentStore, not_found};

const COLUMNS: &str =
    "id, first_name, last_name, school_number, birth_date, student_class, courses";

#[derive(Debug, Clone)]
pub struct PostgresStudentStore {
    pool: Arc<PgPool>,
}

impl PostgresStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl StudentStore for PostgresStudentStore {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Student>, DomainError> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM students ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;
        rows.iter().map(student_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: StudentId) -> Result<Student, DomainError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.as_ref().map(student_from_row).transpose()?.ok_or_else(|| not_found(id))
    }

    #[instrument(skip(self, draft))]
    async fn insert(&self, draft: StudentDraft) -> Result<Student, DomainError> {
        let student = Student::from_draft(StudentId::new(), draft);
        sqlx::query(
            r#"
            INSERT INTO students (id, first_name, last_name, school_number, birth_date, student_class, courses)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(student.id.as_uuid())
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.school_number)
        .bind(&student.birth_date)
        .bind(student.student_class.map(|c| c.as_str()))
        .bind(Json(&student.courses))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(student)
    }

    #[instrument(skip(self, draft))]
    async fn update(&self, id: StudentId, draft: StudentDraft) -> Result<Student, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE students
            SET first_name = $2, last_name = $3, birth_date = $4, student_class = $5, courses = $6
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.birth_date)
        .bind(draft.student_class.map(|c| c.as_str()))
        .bind(Json(&draft.courses))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;
        row.as_ref().map(student_from_row).transpose()?.ok_or_else(|| not_found(id))
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: StudentId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove", e))?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn student_from_row(row: &PgRow) -> Result<Student, DomainError> {
    let decode = |e: sqlx::Error| map_sqlx_error("decode", e);
    let class: Option<String> = row.try_get("student_class").map_err(decode)?;
    let student_class = class
        .map(|c| c.parse::<StudentClass>())
        .transpose()
        .map_err(|e| DomainError::unavailable(e.to_string()))?;
    let Json(courses): Json<BTreeMap<String, String>> = row.try_get("courses").map_err(decode)?;

    Ok(Student {
        id: StudentId::from_uuid(row.try_get("id").map_err(decode)?),
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        school_number: row.try_get("school_number").map_err(decode)?,
        birth_date: row.try_get("birth_date").map_err(decode)?,
        student_class,
        courses,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => DomainError::conflict(msg),
                _ => DomainError::unavailable(msg),
            }
        }
        other => DomainError::unavailable(format!("sqlx error in {}: {}", operation, other)),
    }
}
