//! Credential wire types.
//!
//! Field names are fixed by interop with existing clients, hence the serde
//! renames. Timestamps stay as the exact strings the client sent: the
//! verifier has to reproduce the signed bytes, and a parse/format round trip
//! through `DateTime` would not preserve them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::keys::{KeyError, Signature};

/// Errors from building, serializing or decoding credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("signing key does not match issuer {issuer}")]
    KeyMismatch { issuer: String },

    #[error("proof signature is malformed: {0}")]
    MalformedSignature(#[from] KeyError),
}

/// The claim being proven: "I am `id`, and I saw `nonce`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub id: String,
    pub nonce: String,
}

/// Everything in a credential except its proof. This is what gets signed.
///
/// **Field order is part of the protocol.** serde serializes struct fields
/// in declaration order, and [`canonical_bytes`](Self::canonical_bytes)
/// relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    pub issuer: String,

    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,

    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
}

impl UnsignedCredential {
    /// The exact byte string covered by the detached signature.
    ///
    /// Compact JSON, no whitespace, fields in declaration order. Shared by
    /// [`crate::credential::builder`] and [`crate::auth::verifier`]; there
    /// is no second implementation.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CredentialError> {
        serde_json::to_vec(self).map_err(|e| CredentialError::Serialization(e.to_string()))
    }
}

/// The `proof` block attached by the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,

    pub created: String,

    #[serde(rename = "verificationMethod")]
    pub verification_method: String,

    #[serde(rename = "proofPurpose")]
    pub proof_purpose: String,

    /// Standard base64 of the 64-byte detached signature.
    pub signature: String,
}

/// A signed credential as it travels from client to `/verify`.
///
/// Immutable once signed. The server never persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableCredential {
    #[serde(flatten)]
    pub claim: UnsignedCredential,

    pub proof: Proof,
}

impl VerifiableCredential {
    pub fn issuer(&self) -> &str {
        &self.claim.issuer
    }

    pub fn subject(&self) -> &CredentialSubject {
        &self.claim.credential_subject
    }

    /// Decode `proof.signature`.
    pub fn signature(&self) -> Result<Signature, CredentialError> {
        Ok(Signature::from_base64(&self.proof.signature)?)
    }

    pub fn to_json(&self) -> Result<String, CredentialError> {
        serde_json::to_string(self).map_err(|e| CredentialError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        serde_json::from_str(json).map_err(|e| CredentialError::Serialization(e.to_string()))
    }
}
