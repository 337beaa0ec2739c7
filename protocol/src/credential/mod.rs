//! # Verifiable Credentials
//!
//! The login proof is a minimal W3C-shaped verifiable credential: the user
//! issues a claim about themselves containing the server's nonce, signs it,
//! and attaches the signature as a `proof` block.
//!
//! - [`types`]: wire model and the one canonical serialization that both
//!   the signer and the verifier use.
//! - [`builder`]: client-side construction and signing.
//!
//! ## Canonical bytes
//!
//! The signature covers the compact JSON of everything except `proof`, in
//! this exact order:
//!
//! ```text
//! {"@context":[..],"type":[..],"issuer":"..","issuanceDate":"..","credentialSubject":{"id":"..","nonce":".."}}
//! ```
//!
//! The order is fixed by the field order of [`UnsignedCredential`]. Adding,
//! removing or reordering a field there invalidates every signature ever
//! produced.

pub mod builder;
pub mod types;

pub use builder::{sign_detached, CredentialBuilder};
pub use types::{
    CredentialError, CredentialSubject, Proof, UnsignedCredential, VerifiableCredential,
};
