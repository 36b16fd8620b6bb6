use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by a bearer token.
///
/// Deliberately minimal: the subject plus its validity window. Roles are not
/// embedded; they are re-read from the credential store on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username).
    pub sub: String,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl TokenClaims {
    /// `None` when the expiry falls outside the representable time range.
    pub fn new(subject: impl Into<String>, issued_at: DateTime<Utc>, lifetime: Duration) -> Option<Self> {
        let expires_at = issued_at.checked_add_signed(lifetime)?;
        Some(Self {
            sub: subject.into(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Why a presented token was not accepted.
///
/// Local to the token codec; callers collapse every variant to "no valid token".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}

/// Check the validity window of already signature-verified claims.
///
/// A token whose expiry does not lie after its issue time cannot have been
/// produced by the codec and is treated as malformed.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.exp <= claims.iat {
        return Err(TokenError::Malformed);
    }
    if now.timestamp() > claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn claims_span_the_lifetime() {
        let claims = TokenClaims::new("alice", at(1_000), Duration::hours(24)).unwrap();
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_000 + 86_400);
        assert_eq!(claims.expires_at(), Some(at(1_000 + 86_400)));
    }

    #[test]
    fn valid_up_to_and_including_expiry() {
        let claims = TokenClaims::new("alice", at(1_000), Duration::seconds(60)).unwrap();
        assert_eq!(validate_claims(&claims, at(1_000)), Ok(()));
        assert_eq!(validate_claims(&claims, at(1_060)), Ok(()));
        assert_eq!(validate_claims(&claims, at(1_061)), Err(TokenError::Expired));
    }

    #[test]
    fn unrepresentable_expiry_yields_none() {
        assert_eq!(TokenClaims::new("alice", at(1_000), Duration::MAX), None);
        assert_eq!(TokenClaims::new("alice", DateTime::<Utc>::MAX_UTC, Duration::seconds(1)), None);
    }

    #[test]
    fn inverted_window_is_malformed() {
        let claims = TokenClaims {
            sub: "alice".into(),
            iat: 2_000,
            exp: 1_000,
        };
        assert_eq!(validate_claims(&claims, at(1_500)), Err(TokenError::Malformed));
    }
}
