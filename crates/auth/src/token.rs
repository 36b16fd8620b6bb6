//! Bearer token codec: HS256-signed compact tokens (`header.payload.signature`).
//!
//! The codec is pure over its inputs and the process-wide secret. Signature
//! comparison is delegated to `jsonwebtoken`, which verifies the MAC in
//! constant time. Expiry is checked against a caller-supplied clock so it can
//! be exercised deterministically.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{validate_claims, TokenClaims, TokenError};

/// Minimum accepted length of the signing secret, in bytes (HS256 key size).
pub const MIN_SECRET_LEN: usize = 32;

/// Token lifetime used when none is configured.
pub const DEFAULT_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Misconfiguration detected while building the codec. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecConfigError {
    #[error("signing secret is missing")]
    MissingSecret,

    #[error("signing secret is {len} bytes; at least {min} are required")]
    SecretTooShort { len: usize, min: usize },

    #[error("token lifetime must be positive")]
    NonPositiveLifetime,

    #[error("token lifetime is too large to compute an expiry")]
    LifetimeTooLarge,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),

    #[error("token expiry overflows the time range")]
    ExpiryOverflow,
}

/// A freshly issued token together with its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, CodecConfigError> {
        if secret.is_empty() {
            return Err(CodecConfigError::MissingSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(CodecConfigError::SecretTooShort {
                len: secret.len(),
                min: MIN_SECRET_LEN,
            });
        }
        if lifetime <= Duration::zero() {
            return Err(CodecConfigError::NonPositiveLifetime);
        }
        if Utc::now().checked_add_signed(lifetime).is_none() {
            return Err(CodecConfigError::LifetimeTooLarge);
        }

        // Expiry is checked by `validate_claims` against an explicit clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, subject: &str) -> Result<IssuedToken, IssueError> {
        self.issue_at(subject, Utc::now())
    }

    /// Sign a token for `subject` as if issued at `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken, IssueError> {
        let claims = TokenClaims::new(subject, now, self.lifetime).ok_or(IssueError::ExpiryOverflow)?;
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature and structure, then the expiry against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::TimeZone;
    use proptest::prelude::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::hours(24)).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn flip_signature_bit(token: &str, bit: usize) -> String {
        let (signed, sig) = token.rsplit_once('.').unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(sig).unwrap();
        let bit = bit % (raw.len() * 8);
        raw[bit / 8] ^= 1 << (bit % 8);
        format!("{signed}.{}", URL_SAFE_NO_PAD.encode(raw))
    }

    #[test]
    fn rejects_missing_or_short_secret() {
        assert_eq!(
            TokenCodec::new(b"", Duration::hours(1)).unwrap_err(),
            CodecConfigError::MissingSecret
        );
        assert_eq!(
            TokenCodec::new(b"short", Duration::hours(1)).unwrap_err(),
            CodecConfigError::SecretTooShort { len: 5, min: MIN_SECRET_LEN }
        );
        assert_eq!(
            TokenCodec::new(SECRET, Duration::zero()).unwrap_err(),
            CodecConfigError::NonPositiveLifetime
        );
    }

    #[test]
    fn rejects_lifetime_without_representable_expiry() {
        assert_eq!(
            TokenCodec::new(SECRET, Duration::MAX).unwrap_err(),
            CodecConfigError::LifetimeTooLarge
        );
        assert_eq!(
            TokenCodec::new(SECRET, Duration::seconds(100_000_000_000_000)).unwrap_err(),
            CodecConfigError::LifetimeTooLarge
        );
    }

    #[test]
    fn issuing_past_the_time_range_is_an_error() {
        let c = codec();
        assert!(matches!(
            c.issue_at("alice", DateTime::<Utc>::MAX_UTC),
            Err(IssueError::ExpiryOverflow)
        ));
    }

    #[test]
    fn issued_token_has_three_segments_and_fixed_window() {
        let issued = codec().issue_at("alice", at(10_000)).unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
        assert_eq!(issued.claims.iat, 10_000);
        assert_eq!(issued.claims.exp, 10_000 + DEFAULT_LIFETIME_SECS);
    }

    #[test]
    fn signature_is_deterministic_for_the_same_instant() {
        let c = codec();
        assert_eq!(
            c.issue_at("alice", at(5)).unwrap().token,
            c.issue_at("alice", at(5)).unwrap().token
        );
        assert_ne!(
            c.issue_at("alice", at(5)).unwrap().token,
            c.issue_at("alice", at(6)).unwrap().token
        );
    }

    #[test]
    fn expired_after_the_embedded_expiry() {
        let c = codec();
        let issued = c.issue_at("alice", at(1_000)).unwrap();
        let expiry = issued.claims.exp;

        assert!(c.verify_at(&issued.token, at(expiry)).is_ok());
        assert_eq!(c.verify_at(&issued.token, at(expiry + 1)), Err(TokenError::Expired));
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let c = codec();
        for token in ["", "abc", "a.b", "a.b.c.d", "not.a.token", "..."] {
            assert_eq!(c.verify_at(token, at(0)), Err(TokenError::Malformed), "{token:?}");
        }
    }

    #[test]
    fn foreign_secret_is_a_bad_signature() {
        let other = TokenCodec::new(b"ffffffffffffffffffffffffffffffff", Duration::hours(1)).unwrap();
        let token = other.issue_at("mallory", at(100)).unwrap().token;
        assert_eq!(codec().verify_at(&token, at(100)), Err(TokenError::BadSignature));
    }

    #[test]
    fn payload_tampering_is_a_bad_signature() {
        let c = codec();
        let token = c.issue_at("alice", at(100)).unwrap().token;
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"root","iat":100,"exp":999999999}"#);
        parts[1] = &forged;
        assert_eq!(c.verify_at(&parts.join("."), at(100)), Err(TokenError::BadSignature));
    }

    #[test]
    fn unsigned_algorithm_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"root","iat":100,"exp":999999999}"#);
        let token = format!("{header}.{payload}.");
        assert!(codec().verify_at(&token, at(100)).is_err());
    }

    proptest! {
        #[test]
        fn verify_returns_the_issued_subject(subject in "[a-zA-Z0-9_.@-]{1,40}", now in 0i64..4_000_000_000) {
            let c = codec();
            let issued = c.issue_at(&subject, at(now)).unwrap();
            let claims = c.verify_at(&issued.token, at(now)).unwrap();
            prop_assert_eq!(claims.sub, subject);
            prop_assert_eq!(claims.exp - claims.iat, DEFAULT_LIFETIME_SECS);
        }

        #[test]
        fn any_signature_bit_flip_is_detected(bit in 0usize..256) {
            let c = codec();
            let token = c.issue_at("alice", at(1_000)).unwrap().token;
            let tampered = flip_signature_bit(&token, bit);
            prop_assert_eq!(c.verify_at(&tampered, at(1_000)), Err(TokenError::BadSignature));
        }
    }
}
