//! # Identity Module
//!
//! Every Peerflash user is an Ed25519 keypair held by the client and a
//! `did:key` identifier derived from its public half.
//!
//! 1. **Keypair**: generated client-side, see [`crate::crypto::keys`].
//! 2. **DID**: `did:key:z<base64(pubkey)>`. Self-describing: the server
//!    recovers the verification key from the string alone.
//! 3. **Record**: what signup persists: the DID plus display attributes.

pub mod did;
pub mod record;

pub use did::{canonical_did, DidError, DidKey};
pub use record::IdentityRecord;
