use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use rollcall_auth::{Credential, CredentialStore, Role, StoreError};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory credential store for tests/dev.
///
/// Every operation takes a single lock, so each call is atomic per record.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<String, Credential>>,
    roles: RwLock<BTreeSet<Role>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Drop a credential. Tokens already issued for it stop resolving.
    pub fn remove(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        let mut map = self.credentials.write().map_err(poisoned)?;
        Ok(map.remove(username))
    }

    pub fn len(&self) -> usize {
        self.credentials.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn roles(&self) -> Vec<Role> {
        self.roles
            .read()
            .map(|r| r.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        let map = self.credentials.read().map_err(poisoned)?;
        Ok(map.get(username).cloned())
    }

    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let map = self.credentials.read().map_err(poisoned)?;
        Ok(map.contains_key(username))
    }

    async fn exists_email(&self, email: &str) -> Result<bool, StoreError> {
        let map = self.credentials.read().map_err(poisoned)?;
        Ok(map.values().any(|c| c.email.eq_ignore_ascii_case(email)))
    }

    async fn save(&self, credential: Credential) -> Result<(), StoreError> {
        let mut map = self.credentials.write().map_err(poisoned)?;

        if let Some(existing) = map.values().find(|c| c.id == credential.id) {
            if existing.username != credential.username {
                return Err(StoreError::Conflict(format!(
                    "credential {} with a different username",
                    credential.id
                )));
            }
        }
        if let Some(owner) = map.get(&credential.username) {
            if owner.id != credential.id {
                return Err(StoreError::Conflict(format!("username '{}'", credential.username)));
            }
        }
        if map
            .values()
            .any(|c| c.id != credential.id && c.email.eq_ignore_ascii_case(&credential.email))
        {
            return Err(StoreError::Conflict(format!("email '{}'", credential.email)));
        }

        map.insert(credential.username.clone(), credential);
        Ok(())
    }

    async fn role_exists(&self, role: Role) -> Result<bool, StoreError> {
        let roles = self.roles.read().map_err(poisoned)?;
        Ok(roles.contains(&role))
    }

    async fn insert_role(&self, role: Role) -> Result<(), StoreError> {
        let mut roles = self.roles.write().map_err(poisoned)?;
        if !roles.insert(role) {
            return Err(StoreError::Conflict(format!("role {role}")));
        }
        Ok(())
    }
}
