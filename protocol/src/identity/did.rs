//! # `did:key` Identifiers
//!
//! A Peerflash identity is a self-certifying DID: the Ed25519 public key is
//! embedded directly in the identifier, so resolving a DID to its key is
//! pure string work. No registry, no document fetch.
//!
//! ## DID Format
//!
//! ```text
//! did:key:z<base64(public_key)>
//!         │ └─ standard padded base64 of the 32 raw key bytes
//!         └─── multibase tag
//! ```
//!
//! A DID URL may carry a `#fragment` naming a verification method
//! (`did:key:z...#keys-1`). Parsing strips it, along with surrounding
//! whitespace; the key is the same. Storage is keyed by that bare form,
//! see [`canonical_did`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::{DID_KEY_PREFIX, MULTIBASE_TAG, VERIFICATION_METHOD_FRAGMENT};
use crate::crypto::keys::{KeyError, PublicKey};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing a DID.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DidError {
    /// The string is not shaped like `did:<method>:<id>`.
    #[error("invalid DID format: {0}")]
    InvalidFormat(String),

    /// The DID method is not `key`.
    #[error("unsupported DID method: expected 'key', got '{0}'")]
    UnsupportedMethod(String),

    /// The method-specific id is empty or lacks the multibase tag.
    #[error("missing key segment in DID")]
    MissingKey,

    /// The key segment is not valid base64.
    #[error("key segment is not valid base64")]
    InvalidEncoding,

    /// The decoded key has the wrong length or is not on the curve.
    #[error("embedded key rejected: {0}")]
    InvalidKey(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// DidKey
// ---------------------------------------------------------------------------

/// A parsed `did:key` identifier and the public key it embeds.
///
/// Serializes as its string form, so it drops straight into JSON payloads.
///
/// # Examples
///
/// ```
/// use peerflash_protocol::crypto::IdentityKeypair;
/// use peerflash_protocol::identity::DidKey;
///
/// let kp = IdentityKeypair::generate();
/// let did = DidKey::from_public_key(&kp.public_key());
/// assert!(did.as_str().starts_with("did:key:z"));
/// assert_eq!(DidKey::parse(did.as_str()).unwrap(), did);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DidKey {
    did: String,
    public_key: PublicKey,
}

impl DidKey {
    /// Derive the identifier for a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self {
            did: format!("{}{}{}", DID_KEY_PREFIX, MULTIBASE_TAG, public_key.to_base64()),
            public_key: *public_key,
        }
    }

    /// Parse a DID or DID URL and decode its embedded key.
    ///
    /// Surrounding whitespace and any `#fragment` are discarded;
    /// [`as_str`](Self::as_str) returns the bare DID.
    pub fn parse(input: &str) -> Result<Self, DidError> {
        let bare = input.trim().split('#').next().unwrap_or_default();

        let parts: Vec<&str> = bare.splitn(3, ':').collect();
        if parts.len() != 3 || parts[0] != "did" {
            return Err(DidError::InvalidFormat(
                "DID must have format 'did:<method>:<identifier>'".into(),
            ));
        }
        if parts[1] != "key" {
            return Err(DidError::UnsupportedMethod(parts[1].to_string()));
        }

        let encoded = parts[2]
            .strip_prefix(MULTIBASE_TAG)
            .filter(|s| !s.is_empty())
            .ok_or(DidError::MissingKey)?;
        let raw = STANDARD
            .decode(encoded)
            .map_err(|_| DidError::InvalidEncoding)?;
        let public_key = PublicKey::try_from_slice(&raw)?;

        Ok(Self {
            did: bare.to_string(),
            public_key,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.did
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// DID URL of the signing key, used as `proof.verificationMethod`.
    pub fn verification_method(&self) -> String {
        format!("{}#{}", self.did, VERIFICATION_METHOD_FRAGMENT)
    }
}

/// The key a DID is stored and looked up under.
///
/// The bare DID when `input` parses. Otherwise `input` trimmed, so a
/// lookup for garbage simply finds nothing.
pub fn canonical_did(input: &str) -> String {
    match DidKey::parse(input) {
        Ok(did) => did.did,
        Err(_) => input.trim().to_string(),
    }
}

impl FromStr for DidKey {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DidKey {
    type Error = DidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DidKey> for String {
    fn from(did: DidKey) -> Self {
        did.did
    }
}

impl fmt::Display for DidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.did)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
