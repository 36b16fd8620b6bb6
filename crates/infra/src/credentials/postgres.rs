//! Postgres-backed credential store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed / Io / other | N/A | `Unavailable` |

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{instrument, warn};

use rollcall_auth::{Credential, CredentialStore, Role, StoreError};
use rollcall_core::UserId;

const SELECT_CREDENTIAL: &str = r#"
    SELECT u.id, u.username, u.email, u.secret_hash,
           COALESCE(array_agg(ur.role) FILTER (WHERE ur.role IS NOT NULL), '{}') AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    WHERE u.username = $1
    GROUP BY u.id
"#;

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip(self))]
    async fn lookup(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        let row = sqlx::query(SELECT_CREDENTIAL)
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("lookup", e))?;
        row.map(|r| credential_from_row(&r)).transpose()
    }

    #[instrument(skip(self))]
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists", e))
    }

    #[instrument(skip(self))]
    async fn exists_email(&self, email: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("exists_email", e))
    }

    #[instrument(skip(self, credential), fields(username = %credential.username))]
    async fn save(&self, credential: Credential) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("save", e))?;

        // The WHERE clause keeps the username immutable for an existing id.
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, secret_hash)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email, secret_hash = EXCLUDED.secret_hash
                WHERE users.username = EXCLUDED.username
            "#,
        )
        .bind(credential.id.as_uuid())
        .bind(&credential.username)
        .bind(&credential.email)
        .bind(&credential.secret_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("save", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "credential {} with a different username",
                credential.id
            )));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(credential.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save", e))?;

        let roles: Vec<&str> = credential.roles.iter().map(Role::as_str).collect();
        sqlx::query("INSERT INTO user_roles (user_id, role) SELECT $1, UNNEST($2::text[])")
            .bind(credential.id.as_uuid())
            .bind(&roles)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("save", e))
    }

    #[instrument(skip(self))]
    async fn role_exists(&self, role: Role) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1)")
            .bind(role.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_exists", e))
    }

    #[instrument(skip(self))]
    async fn insert_role(&self, role: Role) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO roles (name) VALUES ($1)")
            .bind(role.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(())
    }
}

fn credential_from_row(row: &PgRow) -> Result<Credential, StoreError> {
    let decode = |e: sqlx::Error| map_sqlx_error("decode", e);
    let names: Vec<String> = row.try_get("roles").map_err(decode)?;

    let mut roles = BTreeSet::new();
    for name in names {
        match name.parse::<Role>() {
            Ok(role) => {
                roles.insert(role);
            }
            Err(_) => warn!(role = %name, "ignoring unknown stored role"),
        }
    }

    Ok(Credential {
        id: UserId::from_uuid(row.try_get("id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        secret_hash: row.try_get("secret_hash").map_err(decode)?,
        roles,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, other)),
    }
}
