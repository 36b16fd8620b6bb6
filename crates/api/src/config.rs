//! Process configuration, loaded once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

use rollcall_auth::token::{DEFAULT_LIFETIME_SECS, MIN_SECRET_LEN};
use rollcall_auth::{AdminSeed, CodecConfigError, HashError, TokenCodec};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Codec(#[from] CodecConfigError),

    #[error("password hasher setup failed: {0}")]
    Hash(#[from] HashError),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<HeaderValue>,
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![HeaderValue::from_static(DEFAULT_CORS_ORIGINS)],
            max_age: Duration::from_secs(DEFAULT_CORS_MAX_AGE_SECS),
        }
    }
}

#[derive(Clone)]
pub struct ApiConfig {
    pub listen_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_lifetime: chrono::Duration,
    pub store_timeout: Duration,
    pub cors: CorsConfig,
    pub admin: AdminSeed,
    pub database_url: Option<String>,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("listen_addr", &self.listen_addr)
            .field("token_lifetime", &self.token_lifetime)
            .field("store_timeout", &self.store_timeout)
            .field("cors", &self.cors)
            .field("admin", &self.admin)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Defaults for everything except the signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let jwt_secret = jwt_secret.into();
        check_secret(&jwt_secret)?;
        Ok(Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret,
            token_lifetime: chrono::Duration::seconds(DEFAULT_LIFETIME_SECS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            cors: CorsConfig::default(),
            admin: AdminSeed::default(),
            database_url: None,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; `from_env` with an injectable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup("JWT_SECRET").ok_or(CodecConfigError::MissingSecret)?;
        let mut config = Self::with_secret(secret)?;

        if let Some(raw) = lookup("JWT_EXPIRATION_SECS") {
            let secs: i64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("JWT_EXPIRATION_SECS", format!("'{raw}' is not an integer")))?;
            if secs <= 0 {
                return Err(CodecConfigError::NonPositiveLifetime.into());
            }
            let lifetime = chrono::Duration::try_seconds(secs)
                .ok_or_else(|| invalid("JWT_EXPIRATION_SECS", format!("{secs} seconds is out of range")))?;
            // Builds the codec once so a lifetime it cannot issue with fails here.
            TokenCodec::new(config.jwt_secret.as_bytes(), lifetime)?;
            config.token_lifetime = lifetime;
        }

        let addr = lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        config.listen_addr = addr
            .trim()
            .parse()
            .map_err(|_| invalid("LISTEN_ADDR", format!("'{addr}' is not a socket address")))?;

        if let Some(raw) = lookup("STORE_TIMEOUT_MS") {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("STORE_TIMEOUT_MS", format!("'{raw}' is not an integer")))?;
            if ms == 0 {
                return Err(invalid("STORE_TIMEOUT_MS", "must be positive"));
            }
            config.store_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup("CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_origins(&raw)?;
        }

        if let Some(raw) = lookup("CORS_MAX_AGE_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("CORS_MAX_AGE_SECS", format!("'{raw}' is not an integer")))?;
            config.cors.max_age = Duration::from_secs(secs);
        }

        if let Some(username) = lookup("ADMIN_USERNAME") {
            config.admin.username = username;
        }
        if let Some(email) = lookup("ADMIN_EMAIL") {
            config.admin.email = email;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            config.admin.password = password;
        }

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(config)
    }
}

fn check_secret(secret: &str) -> Result<(), CodecConfigError> {
    if secret.is_empty() {
        return Err(CodecConfigError::MissingSecret);
    }
    if secret.len() < MIN_SECRET_LEN {
        return Err(CodecConfigError::SecretTooShort {
            len: secret.len(),
            min: MIN_SECRET_LEN,
        });
    }
    Ok(())
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            HeaderValue::from_str(o).map_err(|_| invalid("CORS_ALLOWED_ORIGINS", format!("bad origin '{o}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if origins.is_empty() {
        return Err(invalid("CORS_ALLOWED_ORIGINS", "no origins given"));
    }
    Ok(origins)
}
