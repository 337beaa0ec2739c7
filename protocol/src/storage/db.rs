//! # AuthDb: Persistent Storage Engine
//!
//! The persistence layer for Peerflash identities and login challenges,
//! built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree         | Key            | Value                    |
//! |--------------|----------------|--------------------------|
//! | `identities` | DID (UTF-8)    | `bincode(IdentityRecord)`|
//! | `challenges` | DID (UTF-8)    | `bincode(NonceChallenge)`|
//!
//! Challenges live in their own tree rather than as mutable fields on the
//! identity record. That keeps every nonce transition a single-key
//! operation, which sled can do atomically.
//!
//! ## Atomicity
//!
//! Two writes must be conditional:
//!
//! - Signup is create-if-absent: `compare_and_swap(did, None, Some(record))`.
//!   Two racing signups for one DID produce exactly one record.
//! - Consuming a nonce is compare-and-clear against the exact bytes that
//!   were read: `compare_and_swap(did, Some(observed), None)`. If another
//!   request consumed or replaced the nonce in between, the swap fails and
//!   the caller learns it lost.
//!
//! Issuing a nonce is a plain overwrite, which invalidates any previous
//! nonce for the same DID.

use sled::{Db, IVec, Tree};
use std::path::Path;

use crate::auth::challenge::NonceChallenge;
use crate::identity::record::IdentityRecord;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("key already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

fn encode<T: serde::Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// AuthDb
// ---------------------------------------------------------------------------

/// Persistent storage for identities and their outstanding challenges.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and atomic single-key
/// compare-and-swap. `AuthDb` is `Clone` (the handles are reference
/// counted) and is shared across handlers without external locking.
#[derive(Debug, Clone)]
pub struct AuthDb {
    db: Db,
    /// Identity records keyed by DID.
    identities: Tree,
    /// At most one outstanding challenge per DID.
    challenges: Tree,
}

/// A challenge as read from storage, together with the raw bytes it was
/// decoded from. The raw bytes are what compare-and-clear compares against.
#[derive(Debug, Clone)]
pub struct StoredChallenge {
    pub challenge: NonceChallenge,
    raw: IVec,
}

impl AuthDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let identities = db.open_tree("identities")?;
        let challenges = db.open_tree("challenges")?;

        Ok(Self {
            db,
            identities,
            challenges,
        })
    }

    // -- Identity operations ------------------------------------------------

    /// Insert a new identity record. Fails with [`DbError::AlreadyExists`]
    /// if the DID is already registered; never overwrites.
    pub fn insert_identity(&self, record: &IdentityRecord) -> DbResult<()> {
        let bytes = encode(record)?;
        match self
            .identities
            .compare_and_swap(record.did.as_bytes(), None::<&[u8]>, Some(bytes))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(DbError::AlreadyExists(record.did.clone())),
        }
    }

    /// Retrieve an identity by DID. `None` if never registered.
    pub fn get_identity(&self, did: &str) -> DbResult<Option<IdentityRecord>> {
        match self.identities.get(did.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn identity_exists(&self, did: &str) -> DbResult<bool> {
        Ok(self.identities.contains_key(did.as_bytes())?)
    }

    // -- Challenge operations -----------------------------------------------

    /// Store a challenge for `did`, replacing any previous one.
    pub fn put_challenge(&self, did: &str, challenge: &NonceChallenge) -> DbResult<()> {
        let bytes = encode(challenge)?;
        self.challenges.insert(did.as_bytes(), bytes)?;
        Ok(())
    }

    /// Read the outstanding challenge for `did`, expired or not.
    pub fn get_challenge(&self, did: &str) -> DbResult<Option<StoredChallenge>> {
        match self.challenges.get(did.as_bytes())? {
            Some(raw) => {
                let challenge = decode(&raw)?;
                Ok(Some(StoredChallenge { challenge, raw }))
            }
            None => Ok(None),
        }
    }

    /// Atomically remove the challenge for `did`, but only if it is still
    /// byte-for-byte the one previously read.
    ///
    /// Returns `true` if this call removed it, `false` if the stored value
    /// had already changed (consumed, replaced, or removed).
    pub fn clear_challenge_if(&self, did: &str, observed: &StoredChallenge) -> DbResult<bool> {
        let swapped = self.challenges.compare_and_swap(
            did.as_bytes(),
            Some(&observed.raw),
            None::<&[u8]>,
        )?;
        Ok(swapped.is_ok())
    }

    // -- Utility operations -------------------------------------------------

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Number of stored challenges, including expired ones not yet
    /// overwritten or consumed.
    pub fn challenge_count(&self) -> usize {
        self.challenges.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn record(did: &str) -> IdentityRecord {
        IdentityRecord::new(did, "Ada", "Mathematics")
    }

    fn challenge(value: &str) -> NonceChallenge {
        let now = Utc::now();
        NonceChallenge {
            value: value.to_string(),
            issued_at: now,
            expires_at: now + Duration::minutes(5),
        }
    }

    #[test]
    fn open_temporary_database() {
        let db = AuthDb::open_temporary().expect("should create temp db");
        assert_eq!(db.identity_count(), 0);
        assert_eq!(db.challenge_count(), 0);
    }

    #[test]
    fn open_persistent_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let db = AuthDb::open(dir.path()).expect("should open db");
            db.insert_identity(&record("did:key:zA")).unwrap();
            db.put_challenge("did:key:zA", &challenge("n1")).unwrap();
            db.flush().unwrap();
        }

        let db = AuthDb::open(dir.path()).expect("should reopen db");
        assert_eq!(db.get_identity("did:key:zA").unwrap().unwrap().did, "did:key:zA");
        let stored = db.get_challenge("did:key:zA").unwrap().unwrap();
        assert_eq!(stored.challenge.value, "n1");
    }

    #[test]
    fn identity_roundtrip() {
        let db = AuthDb::open_temporary().unwrap();
        let rec = record("did:key:zA");
        db.insert_identity(&rec).unwrap();

        let back = db.get_identity("did:key:zA").unwrap().expect("exists");
        assert_eq!(back, rec);
        assert!(db.identity_exists("did:key:zA").unwrap());
        assert!(db.get_identity("did:key:zB").unwrap().is_none());
    }

    #[test]
    fn duplicate_identity_rejected_without_overwrite() {
        let db = AuthDb::open_temporary().unwrap();
        let first = record("did:key:zA");
        db.insert_identity(&first).unwrap();

        let second = IdentityRecord::new("did:key:zA", "Mallory", "Forgery");
        let err = db.insert_identity(&second).unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(did) if did == "did:key:zA"));

        let kept = db.get_identity("did:key:zA").unwrap().unwrap();
        assert_eq!(kept.display_name, "Ada");
        assert_eq!(db.identity_count(), 1);
    }

    #[test]
    fn put_challenge_overwrites_previous() {
        let db = AuthDb::open_temporary().unwrap();
        db.put_challenge("did:key:zA", &challenge("old")).unwrap();
        db.put_challenge("did:key:zA", &challenge("new")).unwrap();

        let stored = db.get_challenge("did:key:zA").unwrap().unwrap();
        assert_eq!(stored.challenge.value, "new");
        assert_eq!(db.challenge_count(), 1);
    }

    #[test]
    fn clear_if_removes_observed_challenge() {
        let db = AuthDb::open_temporary().unwrap();
        db.put_challenge("did:key:zA", &challenge("n1")).unwrap();

        let observed = db.get_challenge("did:key:zA").unwrap().unwrap();
        assert!(db.clear_challenge_if("did:key:zA", &observed).unwrap());
        assert!(db.get_challenge("did:key:zA").unwrap().is_none());

        // Second clear with the same observation loses.
        assert!(!db.clear_challenge_if("did:key:zA", &observed).unwrap());
    }

    #[test]
    fn clear_if_refuses_replaced_challenge() {
        let db = AuthDb::open_temporary().unwrap();
        db.put_challenge("did:key:zA", &challenge("n1")).unwrap();
        let observed = db.get_challenge("did:key:zA").unwrap().unwrap();

        db.put_challenge("did:key:zA", &challenge("n2")).unwrap();
        assert!(!db.clear_challenge_if("did:key:zA", &observed).unwrap());

        let still_there = db.get_challenge("did:key:zA").unwrap().unwrap();
        assert_eq!(still_there.challenge.value, "n2");
    }

    #[test]
    fn concurrent_clear_has_single_winner() {
        let db = Arc::new(AuthDb::open_temporary().unwrap());
        db.put_challenge("did:key:zA", &challenge("n1")).unwrap();
        let observed = db.get_challenge("did:key:zA").unwrap().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                let observed = observed.clone();
                std::thread::spawn(move || {
                    db.clear_challenge_if("did:key:zA", &observed).unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn flush_does_not_error() {
        let db = AuthDb::open_temporary().unwrap();
        db.insert_identity(&record("did:key:zA")).unwrap();
        assert!(db.flush().is_ok());
    }
}
