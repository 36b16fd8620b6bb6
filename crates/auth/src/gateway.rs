//! Per-request authentication: bearer extraction → token verification →
//! identity resolution.
//!
//! The gateway never rejects a request on its own. It reports one of three
//! outcomes and leaves the decision to the authorization matrix, which only
//! surfaces a failure when the matched rule needs a principal.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;

use crate::{CredentialStore, IdentityResolver, Principal, ResolveError, TokenCodec, TokenError};

const BEARER_PREFIX: &str = "bearer ";

/// Why a presented token did not yield a principal. Internal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Token(TokenError),
    Resolve(ResolveError),
    Internal,
}

impl core::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RejectReason::Token(e) => write!(f, "{e}"),
            RejectReason::Resolve(e) => write!(f, "{e}"),
            RejectReason::Internal => f.write_str("internal authentication fault"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// No well-formed `Bearer` credential was presented.
    NoToken,
    TokenRejected(RejectReason),
    Authenticated(Principal),
}

impl GatewayOutcome {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            GatewayOutcome::Authenticated(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_principal(self) -> Option<Principal> {
        match self {
            GatewayOutcome::Authenticated(p) => Some(p),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GatewayOutcome::NoToken => "no_token",
            GatewayOutcome::TokenRejected(_) => "token_rejected",
            GatewayOutcome::Authenticated(_) => "authenticated",
        }
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// The scheme is matched case-insensitively; anything other than
/// `Bearer <non-empty token>` yields `None`.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let value = header?.trim_start();
    let scheme = value.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value.get(BEARER_PREFIX.len()..)?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[derive(Debug)]
pub struct AuthGateway<S> {
    codec: Arc<TokenCodec>,
    resolver: IdentityResolver<S>,
}

impl<S> AuthGateway<S>
where
    S: CredentialStore,
{
    pub fn new(codec: Arc<TokenCodec>, resolver: IdentityResolver<S>) -> Self {
        Self { codec, resolver }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn resolver(&self) -> &IdentityResolver<S> {
        &self.resolver
    }

    pub async fn authenticate(&self, authorization: Option<&str>) -> GatewayOutcome {
        self.authenticate_at(authorization, Utc::now()).await
    }

    /// Run the pipeline against an explicit clock.
    ///
    /// A panic anywhere below is contained and reported as a rejected token.
    pub async fn authenticate_at(&self, authorization: Option<&str>, now: DateTime<Utc>) -> GatewayOutcome {
        let Some(token) = extract_bearer(authorization) else {
            return GatewayOutcome::NoToken;
        };

        match AssertUnwindSafe(self.verify_and_resolve(token, now)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!("authentication pipeline panicked; treating token as rejected");
                GatewayOutcome::TokenRejected(RejectReason::Internal)
            }
        }
    }

    async fn verify_and_resolve(&self, token: &str, now: DateTime<Utc>) -> GatewayOutcome {
        let claims = match self.codec.verify_at(token, now) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(reason = %e, "bearer token rejected");
                return GatewayOutcome::TokenRejected(RejectReason::Token(e));
            }
        };

        match self.resolver.resolve(&claims.sub).await {
            Ok(principal) => GatewayOutcome::Authenticated(principal),
            Err(e) => {
                tracing::debug!(reason = %e, "token subject did not resolve");
                GatewayOutcome::TokenRejected(RejectReason::Resolve(e))
            }
        }
    }
}
