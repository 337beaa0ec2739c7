//! # Cryptographic Primitives
//!
//! Ed25519 and nothing else. Identities sign, the server verifies, and the
//! session layer uses HMAC through `jsonwebtoken`, not through this module.
//!
//! Everything here is a thin, type-safe wrapper around ed25519-dalek. The
//! wrappers exist so the rest of the crate deals in fixed-size arrays and
//! base64 strings instead of dalek's types.

pub mod keys;

pub use keys::{IdentityKeypair, KeyError, PublicKey, Signature};
