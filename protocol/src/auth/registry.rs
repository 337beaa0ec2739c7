//! Signup and profile lookup.

use tracing::info;

use super::error::AuthError;
use crate::identity::{canonical_did, DidKey, IdentityRecord};
use crate::storage::AuthDb;

/// Creates and looks up identity records.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    db: AuthDb,
}

impl IdentityRegistry {
    pub fn new(db: AuthDb) -> Self {
        Self { db }
    }

    /// Register a new identity.
    ///
    /// All fields must be non-blank and `did` must parse as a `did:key`.
    /// The record is keyed by the bare DID (any `#fragment` dropped). A DID
    /// that is already registered yields [`AuthError::AlreadyRegistered`]
    /// and leaves the existing record untouched.
    pub fn register(
        &self,
        did: &str,
        display_name: &str,
        major: &str,
    ) -> Result<IdentityRecord, AuthError> {
        let did = did.trim();
        let display_name = display_name.trim();
        let major = major.trim();
        if did.is_empty() || display_name.is_empty() || major.is_empty() {
            return Err(AuthError::Validation(
                "did, name and major are required".into(),
            ));
        }
        let parsed = DidKey::parse(did).map_err(|e| AuthError::Validation(e.to_string()))?;

        let record = IdentityRecord::new(parsed.as_str(), display_name, major);
        self.db.insert_identity(&record)?;

        info!(did = %parsed, id = %record.id, "identity registered");
        Ok(record)
    }

    /// Look up a registered identity by DID or DID URL.
    pub fn profile(&self, did: &str) -> Result<IdentityRecord, AuthError> {
        self.db
            .get_identity(&canonical_did(did))?
            .ok_or(AuthError::NotFound)
    }
}
