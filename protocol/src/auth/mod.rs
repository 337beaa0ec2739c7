//! # Authentication
//!
//! The server half of the challenge-response login.
//!
//! ```text
//! registry.rs   signup and profile lookup
//! challenge.rs  nonce issuance (NoChallenge → ChallengeIssued)
//! verifier.rs   the six-step verification pipeline and nonce consumption
//! session.rs    HS256 session tokens and their validation
//! error.rs      the client-facing failure taxonomy
//! ```
//!
//! Per identity the state machine is small:
//!
//! ```text
//! NoChallenge ──issue──► ChallengeIssued ──verify ok──► NoChallenge + session
//!                          │         ▲
//!                          └─────────┘
//!               reissue, failed verify (retained by default)
//! ```
//!
//! Expiry is not a transition. A stale challenge simply fails step 2 of the
//! pipeline until it is overwritten.

pub mod challenge;
pub mod error;
pub mod registry;
pub mod session;
pub mod verifier;

pub use challenge::{NonceChallenge, NonceIssuer};
pub use error::AuthError;
pub use registry::IdentityRegistry;
pub use session::{
    AuthenticatedDid, SessionClaims, SessionError, SessionIssuer, SessionToken, SessionValidator,
};
pub use verifier::SignatureVerifier;
