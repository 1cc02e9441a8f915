//! Stateless bearer tokens.
//!
//! The gateway keeps no record of issued tokens. A token is a signed claim
//! set over the identity's internal ID and role; at verification time its
//! validity is entirely determined by the signature and the embedded expiry.
//! Token validity never depends on any login-flow session still existing.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use amber_gateway_core::UserId;

use crate::identity::Identity;
use crate::role::Role;

/// Allowance for clock skew between issuer and verifier, in seconds.
const EXPIRY_LEEWAY_SECONDS: u64 = 30;

/// The wire-format claim set embedded in a token.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// The identity's internal ID, in prefixed string form.
    sub: String,
    /// The identity's role at issuance time.
    role: Role,
    /// Issued-at, seconds since the Unix epoch.
    iat: i64,
    /// Expiry, seconds since the Unix epoch.
    exp: i64,
}

/// Verified claims extracted from a bearer token.
///
/// The claims carry no email or display name; handlers needing richer
/// profile data must re-fetch the identity from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The authenticated identity's internal ID.
    pub user_id: UserId,
    /// The role embedded at issuance time.
    pub role: Role,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Error issuing a token.
#[derive(Debug)]
pub enum IssueError {
    /// Signing or serialization failed.
    Encoding(String),
}

impl std::fmt::Display for IssueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoding(msg) => write!(f, "token encoding error: {msg}"),
        }
    }
}

impl std::error::Error for IssueError {}

/// Error verifying a bearer credential.
#[derive(Debug)]
pub enum VerifyError {
    /// No credential was presented at all. Produced by the transport layer,
    /// never by [`TokenVerifier::verify`].
    Missing,
    /// Signature mismatch, malformed structure, or expired.
    Invalid { reason: String },
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no bearer credential presented"),
            Self::Invalid { reason } => write!(f, "invalid bearer credential: {reason}"),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Mints signed, time-bound bearer tokens for resolved identities.
///
/// Issuance is a pure computation: it does not touch the store or any
/// session state.
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer signing with the given secret; tokens expire `ttl`
    /// after issuance.
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a token encoding the identity's internal ID and role.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::Encoding`] if signing fails.
    pub fn issue(&self, identity: &Identity) -> Result<String, IssueError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: identity.id().to_string(),
            role: identity.role(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.key)
            .map_err(|e| IssueError::Encoding(e.to_string()))
    }
}

/// Validates bearer tokens and extracts their claims.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier checking signatures against the given secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = EXPIRY_LEEWAY_SECONDS;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verifies a token and extracts its claims.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Invalid`] on signature mismatch, malformed
    /// structure, or expiry. [`VerifyError::Missing`] is never returned
    /// here; an expired token is a presented-but-invalid credential.
    pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            VerifyError::Invalid {
                reason: e.to_string(),
            }
        })?;

        let user_id = UserId::from_str(&data.claims.sub).map_err(|e| VerifyError::Invalid {
            reason: format!("bad subject claim: {e}"),
        })?;

        let issued_at = timestamp_claim(data.claims.iat, "iat")?;
        let expires_at = timestamp_claim(data.claims.exp, "exp")?;

        Ok(Claims {
            user_id,
            role: data.claims.role,
            issued_at,
            expires_at,
        })
    }
}

fn timestamp_claim(secs: i64, claim: &str) -> Result<DateTime<Utc>, VerifyError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| VerifyError::Invalid {
        reason: format!("out-of-range {claim} claim"),
    })
}
