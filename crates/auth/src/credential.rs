//! Stored credentials and the storage port the gateway reads them through.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rollcall_core::UserId;

use crate::Role;

/// A stored account: unique username, salted secret hash and granted roles.
///
/// The username is the token subject and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub roles: BTreeSet<Role>,
}

impl Credential {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        secret_hash: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            secret_hash: secret_hash.into(),
            roles: roles.into_iter().collect(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique key (username, email or role) is already taken.
    #[error("{0} already exists")]
    Conflict(String),

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Credential + role reference-data storage.
///
/// Implementations must be safe for concurrent reads; each call is atomic per
/// record and no cross-record transactions are required.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a credential by username.
    async fn lookup(&self, username: &str) -> Result<Option<Credential>, StoreError>;

    async fn exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn exists_email(&self, email: &str) -> Result<bool, StoreError>;

    /// Insert a new credential or replace the one with the same id.
    ///
    /// Fails with [`StoreError::Conflict`] when the username or email belongs
    /// to a different credential.
    async fn save(&self, credential: Credential) -> Result<(), StoreError>;

    async fn role_exists(&self, role: Role) -> Result<bool, StoreError>;

    /// Register a role as reference data; [`StoreError::Conflict`] if present.
    async fn insert_role(&self, role: Role) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> CredentialStore for Arc<S>
where
    S: CredentialStore + ?Sized,
{
    async fn lookup(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        (**self).lookup(username).await
    }

    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        (**self).exists(username).await
    }

    async fn exists_email(&self, email: &str) -> Result<bool, StoreError> {
        (**self).exists_email(email).await
    }

    async fn save(&self, credential: Credential) -> Result<(), StoreError> {
        (**self).save(credential).await
    }

    async fn role_exists(&self, role: Role) -> Result<bool, StoreError> {
        (**self).role_exists(role).await
    }

    async fn insert_role(&self, role: Role) -> Result<(), StoreError> {
        (**self).insert_role(role).await
    }
}
