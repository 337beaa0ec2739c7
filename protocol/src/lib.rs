// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Peerflash Protocol: DID Authentication Core
//!
//! Passwordless login for Peerflash. A user proves control of a `did:key`
//! identifier by signing a server-issued nonce inside a verifiable
//! credential; the server checks the nonce, checks the signature against the
//! key embedded in the identifier and burns the nonce. It then hands back a
//! time-bounded session token.
//!
//! No registry, no password table, no key escrow. The identifier *is* the
//! public key, so resolving it is string parsing, not a network round trip.
//!
//! ## Architecture
//!
//! - **crypto**: Ed25519 key material. Thin wrappers over ed25519-dalek.
//! - **identity**: `did:key` encoding/parsing and the stored identity record.
//! - **credential**: The credential wire model, its canonical signing bytes,
//!   and the client-side builder/signer.
//! - **auth**: Nonce issuance, the verification pipeline, and sessions.
//! - **storage**: sled persistence for identities and outstanding challenges.
//! - **config**: Protocol constants and the immutable runtime config.
//!
//! ## Flow
//!
//! ```text
//! signup ──► identity record
//! login  ──► NonceIssuer::issue ──► {nonce}
//! client ──► CredentialBuilder::sign(nonce) ──► VerifiableCredential
//! verify ──► SignatureVerifier::verify ──► compare-and-clear ──► SessionIssuer::issue
//! later  ──► SessionValidator::validate(cookie) ──► AuthenticatedDid
//! ```

pub mod auth;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod identity;
pub mod storage;

/// Crate version, reported by `peerflash-node version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
