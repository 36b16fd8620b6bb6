//! Rebuilds a request principal from a verified token subject.
//!
//! The store is consulted on every call; nothing is cached, so role changes
//! and removals take effect on the very next request.

use std::time::Duration;

use thiserror::Error;

use crate::{CredentialStore, Principal};

/// Lookups slower than this fail closed.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error("subject does not resolve to a credential")]
    UnknownSubject,

    #[error("credential lookup timed out")]
    StoreTimeout,

    #[error("credential store unavailable")]
    StoreUnavailable,
}

#[derive(Debug, Clone)]
pub struct IdentityResolver<S> {
    store: S,
    timeout: Duration,
}

impl<S> IdentityResolver<S>
where
    S: CredentialStore,
{
    pub fn new(store: S) -> Self {
        Self::with_timeout(store, DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn with_timeout(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn resolve(&self, subject: &str) -> Result<Principal, ResolveError> {
        match tokio::time::timeout(self.timeout, self.store.lookup(subject)).await {
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "credential lookup timed out");
                Err(ResolveError::StoreTimeout)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "credential lookup failed");
                Err(ResolveError::StoreUnavailable)
            }
            Ok(Ok(None)) => Err(ResolveError::UnknownSubject),
            Ok(Ok(Some(credential))) => Ok(Principal::from_credential(&credential)),
        }
    }
}
