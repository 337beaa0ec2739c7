//! The persisted identity record created at signup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered Peerflash user.
///
/// Keyed in storage by `did`. The record never holds key material, only the
/// identifier (which embeds the public key) and display attributes. The
/// outstanding login nonce lives in its own tree, see
/// [`crate::auth::challenge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Internal record id, stable across DID display changes.
    pub id: Uuid,
    /// The `did:key` identifier.
    pub did: String,
    pub display_name: String,
    pub major: String,
    pub created_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn new(
        did: impl Into<String>,
        display_name: impl Into<String>,
        major: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            did: did.into(),
            display_name: display_name.into(),
            major: major.into(),
            created_at: Utc::now(),
        }
    }
}
