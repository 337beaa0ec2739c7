//! Nonce issuance.
//!
//! A login starts here: the server mints a random nonce for a registered
//! identity, stores it with a five minute expiry, and hands it back. The
//! client proves key possession by signing a credential that embeds it.
//!
//! There is at most one outstanding nonce per identity. Issuing again
//! overwrites the previous one, so any credential signed against the old
//! value stops verifying. Expiry is checked lazily at verify time; nothing
//! sweeps stale rows.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::error::AuthError;
use crate::config::{AuthConfig, NONCE_BYTES};
use crate::identity::canonical_did;
use crate::storage::AuthDb;

/// An outstanding single-use login challenge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceChallenge {
    /// Hex-encoded random bytes, as sent to the client.
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NonceChallenge {
    /// Fresh challenge issued at `now`, valid for `ttl`.
    pub fn generate(now: DateTime<Utc>, ttl: Duration) -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            value: hex::encode(bytes),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    /// Valid up to and including `expires_at`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

// The nonce value is a live credential for five minutes; keep it out of logs.
impl fmt::Debug for NonceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceChallenge")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues login nonces for registered identities.
#[derive(Debug, Clone)]
pub struct NonceIssuer {
    db: AuthDb,
    ttl: Duration,
}

impl NonceIssuer {
    pub fn new(db: AuthDb, config: &AuthConfig) -> Self {
        Self {
            db,
            ttl: config.nonce_ttl,
        }
    }

    /// Issue a nonce for `did` now.
    pub fn issue(&self, did: &str) -> Result<NonceChallenge, AuthError> {
        self.issue_at(did, Utc::now())
    }

    /// Issue a nonce as of `now`.
    ///
    /// `did` may be a DID URL or carry stray whitespace; the nonce is stored
    /// under its bare form. Fails with [`AuthError::NotFound`] for unknown
    /// identities, without writing anything.
    pub fn issue_at(&self, did: &str, now: DateTime<Utc>) -> Result<NonceChallenge, AuthError> {
        let did = canonical_did(did);
        let did = did.as_str();
        if !self.db.identity_exists(did)? {
            debug!(did, "nonce requested for unknown identity");
            return Err(AuthError::NotFound);
        }

        let challenge = NonceChallenge::generate(now, self.ttl);
        self.db.put_challenge(did, &challenge)?;

        info!(did, expires_at = %challenge.expires_at, "nonce issued");
        Ok(challenge)
    }
}
