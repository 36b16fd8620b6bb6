//! Service wiring: stores, gateway, hasher, and the permission matrix.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rollcall_auth::{
    AdminSeed, AuthGateway, Credential, CredentialStore, HashError, IdentityResolver, PermissionMatrix,
    SecretHasher, SeedError, SeedReport, TokenCodec, seed,
};
use rollcall_infra::{InMemoryCredentialStore, InMemoryStudentStore};
use rollcall_students::StudentStore;

use crate::config::{ApiConfig, ConfigError};

const DECOY_SECRET: &str = "rollcall-decoy-secret";

pub type SharedCredentials = Arc<dyn CredentialStore>;

/// Everything handlers and middleware need, built once at startup.
pub struct AppServices {
    pub credentials: SharedCredentials,
    pub students: Arc<dyn StudentStore>,
    pub gateway: AuthGateway<SharedCredentials>,
    pub hasher: SecretHasher,
    pub matrix: PermissionMatrix,
    /// Hash of a throwaway secret, verified against when a signin names an
    /// unknown user so both failure paths cost one Argon2 verification.
    decoy_hash: String,
    secret_checks: AtomicU64,
}

impl AppServices {
    pub fn new(
        config: &ApiConfig,
        credentials: SharedCredentials,
        students: Arc<dyn StudentStore>,
    ) -> Result<Self, ConfigError> {
        let codec = Arc::new(TokenCodec::new(config.jwt_secret.as_bytes(), config.token_lifetime)?);
        let resolver = IdentityResolver::with_timeout(credentials.clone(), config.store_timeout);
        let hasher = SecretHasher::new();
        Ok(Self {
            gateway: AuthGateway::new(codec, resolver),
            credentials,
            students,
            decoy_hash: hasher.hash(DECOY_SECRET)?,
            hasher,
            matrix: PermissionMatrix::standard(),
            secret_checks: AtomicU64::new(0),
        })
    }

    pub fn in_memory(config: &ApiConfig) -> Result<Self, ConfigError> {
        Self::new(config, InMemoryCredentialStore::arc(), InMemoryStudentStore::arc())
    }

    /// Swap the hasher; the decoy hash is recomputed at the new cost.
    pub fn with_hasher(mut self, hasher: SecretHasher) -> Result<Self, HashError> {
        self.decoy_hash = hasher.hash(DECOY_SECRET)?;
        self.hasher = hasher;
        Ok(self)
    }

    pub fn with_matrix(mut self, matrix: PermissionMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        self.gateway.codec()
    }

    pub async fn seed(&self, admin: &AdminSeed) -> Result<SeedReport, SeedError> {
        seed(&*self.credentials, &self.hasher, admin).await
    }

    /// Hashing runs on the blocking pool.
    pub async fn hash_secret(&self, secret: String) -> Result<String, HashError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| HashError::Hash(e.to_string()))?
    }

    pub async fn verify_secret(&self, secret: String, hash: String) -> bool {
        self.secret_checks.fetch_add(1, Ordering::Relaxed);
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash))
            .await
            .unwrap_or(false)
    }

    /// Verify against the stored hash, or against the decoy when there is no
    /// credential. Only `Some` with a matching secret passes.
    pub async fn check_credential(&self, credential: Option<&Credential>, secret: String) -> bool {
        let hash = credential.map_or_else(|| self.decoy_hash.clone(), |c| c.secret_hash.clone());
        let matched = self.verify_secret(secret, hash).await;
        matched && credential.is_some()
    }

    /// Number of secret verifications performed so far.
    pub fn secret_checks(&self) -> u64 {
        self.secret_checks.load(Ordering::Relaxed)
    }
}

/// Pick the store backend from configuration.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    #[cfg(feature = "postgres")]
    if let Some(url) = &config.database_url {
        use rollcall_infra::{PostgresCredentialStore, PostgresStudentStore, db};

        let pool = db::connect(url, 10).await?;
        db::ensure_schema(&pool).await?;
        tracing::info!("using postgres stores");
        return Ok(AppServices::new(
            config,
            Arc::new(PostgresCredentialStore::new(pool.clone())),
            Arc::new(PostgresStudentStore::new(pool)),
        )?);
    }

    #[cfg(not(feature = "postgres"))]
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the postgres feature is disabled; using in-memory stores");
    }

    tracing::info!("using in-memory stores");
    Ok(AppServices::in_memory(config)?)
}
