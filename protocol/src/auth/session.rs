//! # Sessions
//!
//! After a successful verify the server mints an HS256 JWT carrying
//! `{did, iat, exp}` and hands it to the browser in the `token` cookie.
//! Sessions are stateless: nothing is stored, and validity is purely a
//! matter of the MAC and the expiry.
//!
//! Expiry is checked here rather than by `jsonwebtoken` so the check can
//! run against an injected clock. A token is accepted up to and including
//! its `exp` second.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::AuthConfig;
use crate::identity::DidKey;

/// Why a session token was not accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session token")]
    Missing,

    /// Bad MAC, wrong algorithm, or not a JWT at all.
    #[error("invalid session token")]
    Invalid,

    #[error("session expired")]
    Expired,

    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub did: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly minted session token and the claims inside it.
#[derive(Clone)]
pub struct SessionToken {
    pub token: String,
    pub claims: SessionClaims,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Identity attached to a request whose session validated.
///
/// Handlers behind the session gate pull this from the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedDid(pub String);

impl AuthenticatedDid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// Mints session tokens with the process-wide secret.
#[derive(Clone)]
pub struct SessionIssuer {
    key: EncodingKey,
    ttl: chrono::Duration,
}

impl SessionIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.session_secret.as_bytes()),
            ttl: config.session_ttl,
        }
    }

    pub fn issue(&self, did: &DidKey) -> Result<SessionToken, SessionError> {
        self.issue_at(did, Utc::now())
    }

    pub fn issue_at(
        &self,
        did: &DidKey,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, SessionError> {
        let iat = now.timestamp();
        let claims = SessionClaims {
            did: did.to_string(),
            iat,
            exp: iat + self.ttl.num_seconds(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        debug!(did = %did, exp = claims.exp, "session issued");
        Ok(SessionToken { token, claims })
    }
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer").field("ttl", &self.ttl).finish()
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Checks session tokens presented on protected routes.
#[derive(Clone)]
pub struct SessionValidator {
    key: DecodingKey,
    validation: Validation,
}

impl SessionValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(config.session_secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<AuthenticatedDid, SessionError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedDid, SessionError> {
        if token.is_empty() {
            return Err(SessionError::Missing);
        }
        let data = decode::<SessionClaims>(token, &self.key, &self.validation)
            .map_err(|_| SessionError::Invalid)?;

        if now.timestamp() > data.claims.exp {
            return Err(SessionError::Expired);
        }
        Ok(AuthenticatedDid(data.claims.did))
    }
}

impl fmt::Debug for SessionValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionValidator").finish_non_exhaustive()
    }
}
