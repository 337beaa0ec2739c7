//! Client-side credential construction and signing.
//!
//! Runs wherever the private key lives: the browser client, the `sign` CLI
//! subcommand, or tests. The server never calls into this module except to
//! share [`UnsignedCredential::canonical_bytes`].

use chrono::{DateTime, SecondsFormat, Utc};

use super::types::{
    CredentialError, CredentialSubject, Proof, UnsignedCredential, VerifiableCredential,
};
use crate::config::{CREDENTIALS_CONTEXT, CREDENTIAL_TYPE, PROOF_PURPOSE, PROOF_TYPE};
use crate::crypto::keys::IdentityKeypair;
use crate::identity::did::DidKey;

/// Builder for a login credential over a server-issued nonce.
///
/// # Examples
///
/// ```
/// use peerflash_protocol::credential::CredentialBuilder;
/// use peerflash_protocol::crypto::IdentityKeypair;
/// use peerflash_protocol::identity::DidKey;
///
/// let kp = IdentityKeypair::generate();
/// let did = DidKey::from_public_key(&kp.public_key());
/// let vc = CredentialBuilder::new(&did, "n1").sign(&kp).unwrap();
/// assert_eq!(vc.subject().nonce, "n1");
/// assert_eq!(vc.issuer(), did.as_str());
/// ```
#[derive(Debug, Clone)]
pub struct CredentialBuilder {
    did: DidKey,
    nonce: String,
    issued_at: Option<DateTime<Utc>>,
}

impl CredentialBuilder {
    pub fn new(did: &DidKey, nonce: impl Into<String>) -> Self {
        Self {
            did: did.clone(),
            nonce: nonce.into(),
            issued_at: None,
        }
    }

    /// Pin the issuance timestamp. Defaults to the moment of signing.
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    /// The claim that [`sign`](Self::sign) will cover.
    pub fn unsigned(&self) -> UnsignedCredential {
        let issued_at = self.issued_at.unwrap_or_else(Utc::now);
        UnsignedCredential {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            types: vec![CREDENTIAL_TYPE.to_string()],
            issuer: self.did.as_str().to_string(),
            issuance_date: format_timestamp(issued_at),
            credential_subject: CredentialSubject {
                id: self.did.as_str().to_string(),
                nonce: self.nonce.clone(),
            },
        }
    }

    /// Build the claim, sign it, and attach the proof.
    ///
    /// Refuses to sign with a key other than the one embedded in the DID;
    /// such a credential could never verify.
    pub fn sign(
        self,
        keypair: &IdentityKeypair,
    ) -> Result<VerifiableCredential, CredentialError> {
        if keypair.public_key() != *self.did.public_key() {
            return Err(CredentialError::KeyMismatch {
                issuer: self.did.to_string(),
            });
        }
        let claim = self.unsigned();
        sign_detached(claim, &self.did.verification_method(), keypair)
    }
}

/// Sign an arbitrary claim and wrap it with a proof block.
///
/// Performs no issuer/key consistency check. [`CredentialBuilder::sign`]
/// is the normal entry point.
pub fn sign_detached(
    claim: UnsignedCredential,
    verification_method: &str,
    keypair: &IdentityKeypair,
) -> Result<VerifiableCredential, CredentialError> {
    let message = claim.canonical_bytes()?;
    let signature = keypair.sign(&message);

    let proof = Proof {
        proof_type: PROOF_TYPE.to_string(),
        created: format_timestamp(Utc::now()),
        verification_method: verification_method.to_string(),
        proof_purpose: PROOF_PURPOSE.to_string(),
        signature: signature.to_base64(),
    };

    Ok(VerifiableCredential { claim, proof })
}

/// RFC 3339 with millisecond precision and a `Z` suffix, the same shape
/// the browser's `Date.toISOString()` produces.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
