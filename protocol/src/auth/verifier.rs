//! # Signature Verification Pipeline
//!
//! Server-side check of a signed login credential. The steps run in a fixed
//! order and each one is its own rejection point:
//!
//! ```text
//! 1. issuer registered?                    ── no ──► NotFound
//! 2. live nonce stored for issuer?         ── no ──► InvalidNonce
//! 3. subject nonce == stored nonce?        ── no ──► NonceMismatch
//! 4. issuer DID decodes to an Ed25519 key? ── no ──► MalformedIdentity
//! 5. signature valid over canonical bytes? ── no ──► InvalidSignature
//! 6. compare-and-clear the stored nonce    ── lost ─► InvalidNonce
//! ```
//!
//! Step 6 is what makes a nonce single-use under concurrency. Two requests
//! carrying the same credential can both pass steps 1-5, but only one of
//! them can swap the stored bytes for nothing. The other sees the swap fail
//! and is rejected exactly as a replay would be.
//!
//! ## Failed attempts
//!
//! With [`NoncePolicy::RetainOnFailure`] a failure at steps 3-5 leaves the
//! nonce in place and the client may retry until it expires. With
//! [`NoncePolicy::BurnOnFailure`] the nonce is compare-and-cleared on those
//! failures too, and the client has to log in again.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::error::AuthError;
use crate::config::{AuthConfig, NoncePolicy};
use crate::credential::VerifiableCredential;
use crate::identity::{canonical_did, DidKey};
use crate::storage::{AuthDb, StoredChallenge};

/// Verifies signed login credentials and consumes their nonce.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    db: AuthDb,
    policy: NoncePolicy,
}

impl SignatureVerifier {
    pub fn new(db: AuthDb, config: &AuthConfig) -> Self {
        Self {
            db,
            policy: config.nonce_policy,
        }
    }

    /// Run the pipeline against the current time.
    pub fn verify(&self, credential: &VerifiableCredential) -> Result<DidKey, AuthError> {
        self.verify_at(credential, Utc::now())
    }

    /// Run the pipeline as of `now`.
    ///
    /// On success the nonce has been consumed and the verified issuer is
    /// returned. On any error no state other than (optionally, per policy)
    /// the nonce has changed.
    pub fn verify_at(
        &self,
        credential: &VerifiableCredential,
        now: DateTime<Utc>,
    ) -> Result<DidKey, AuthError> {
        let did = canonical_did(credential.issuer());
        let did = did.as_str();

        // 1
        if self.db.get_identity(did)?.is_none() {
            return Err(self.reject(did, None, AuthError::NotFound));
        }

        // 2
        let stored = match self.db.get_challenge(did)? {
            Some(stored) if stored.challenge.is_live_at(now) => stored,
            _ => return Err(self.reject(did, None, AuthError::InvalidNonce)),
        };

        // 3
        if credential.subject().nonce != stored.challenge.value {
            return Err(self.reject(did, Some(&stored), AuthError::NonceMismatch));
        }

        // 4
        let Ok(issuer) = DidKey::parse(did) else {
            return Err(self.reject(did, Some(&stored), AuthError::MalformedIdentity));
        };

        // 5
        let message = credential
            .claim
            .canonical_bytes()
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let signature_ok = credential
            .signature()
            .map(|sig| issuer.public_key().verify(&message, &sig))
            .unwrap_or(false);
        if !signature_ok {
            return Err(self.reject(did, Some(&stored), AuthError::InvalidSignature));
        }

        // 6
        if !self.db.clear_challenge_if(did, &stored)? {
            return Err(self.reject(did, None, AuthError::InvalidNonce));
        }

        info!(did, "credential verified, nonce consumed");
        Ok(issuer)
    }

    /// Log a rejection and apply the nonce policy. Returns `err` unchanged.
    fn reject(&self, did: &str, stored: Option<&StoredChallenge>, err: AuthError) -> AuthError {
        warn!(did, reason = err.reason(), "credential rejected");

        if let (NoncePolicy::BurnOnFailure, Some(stored)) = (self.policy, stored) {
            match self.db.clear_challenge_if(did, stored) {
                Ok(true) => info!(did, "nonce burned after failed attempt"),
                Ok(false) => {}
                Err(e) => warn!(did, error = %e, "failed to burn nonce"),
            }
        }
        err
    }
}
