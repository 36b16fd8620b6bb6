//! Startup bootstrap: baseline roles plus one administrative credential.
//!
//! Idempotent. Re-running against a seeded store performs no writes, and an
//! insertion conflict (another instance seeding concurrently) counts as
//! "already seeded" rather than an error.

use thiserror::Error;

use crate::{Credential, CredentialStore, HashError, Role, SecretHasher, StoreError};

/// The reserved administrative account created at first start.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            password: "root".to_string(),
        }
    }
}

/// What a seeding run actually wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: Vec<Role>,
    pub admin_created: bool,
}

impl SeedReport {
    pub fn writes(&self) -> usize {
        self.roles_created.len() + usize::from(self.admin_created)
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

pub async fn seed<S>(store: &S, hasher: &SecretHasher, admin: &AdminSeed) -> Result<SeedReport, SeedError>
where
    S: CredentialStore + ?Sized,
{
    let mut report = SeedReport::default();

    for role in Role::ALL {
        if store.role_exists(role).await? {
            continue;
        }
        match store.insert_role(role).await {
            Ok(()) => {
                tracing::info!(%role, "seeded role");
                report.roles_created.push(role);
            }
            Err(StoreError::Conflict(what)) => {
                tracing::debug!(%role, %what, "role seeded concurrently");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if !store.exists(&admin.username).await? {
        let hash = hasher.hash(&admin.password)?;
        let credential = Credential::new(&admin.username, &admin.email, hash, [Role::Admin]);
        match store.save(credential).await {
            Ok(()) => {
                tracing::info!(username = %admin.username, "seeded administrative credential");
                report.admin_created = true;
            }
            Err(StoreError::Conflict(what)) => {
                tracing::debug!(username = %admin.username, %what, "administrative credential seeded concurrently");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}
