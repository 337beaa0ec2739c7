//! # Protocol Configuration & Constants
//!
//! Every magic number in the authentication flow lives here, next to the
//! immutable [`AuthConfig`] the server builds once at startup.
//!
//! The wire-facing constants (credential context, proof type, cookie name)
//! are shared with clients. Changing them silently breaks every login in
//! flight, so treat them like a protocol version bump.

use chrono::Duration;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Identifier Format
// ---------------------------------------------------------------------------

/// Prefix of every identifier this server accepts: `did:key:` followed by
/// the multibase tag.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Multibase tag placed in front of the base64 public key.
pub const MULTIBASE_TAG: char = 'z';

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 secret seed length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Credential Defaults
// ---------------------------------------------------------------------------

/// JSON-LD context of the W3C Verifiable Credentials data model v1.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Base credential type.
pub const CREDENTIAL_TYPE: &str = "VerifiableCredential";

/// Proof suite tag written into `proof.type`.
pub const PROOF_TYPE: &str = "Ed25519Signature2018";

/// Purpose written into `proof.proofPurpose`.
pub const PROOF_PURPOSE: &str = "authentication";

/// Fragment appended to the DID to form `proof.verificationMethod`.
pub const VERIFICATION_METHOD_FRAGMENT: &str = "keys-1";

// ---------------------------------------------------------------------------
// Challenge & Session Parameters
// ---------------------------------------------------------------------------

/// Raw nonce entropy in bytes. 32 bytes = 256 bits, hex-encoded on the wire.
pub const NONCE_BYTES: usize = 32;

/// How long an issued nonce stays redeemable, in seconds.
pub const NONCE_TTL_SECS: i64 = 5 * 60;

/// Session lifetime in seconds. Also the cookie `Max-Age`.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "token";

/// Shortest HMAC secret we agree to sign sessions with.
pub const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Where unauthenticated browser requests get sent.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Errors raised while assembling an [`AuthConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("session secret must be at least {min} bytes, got {got}")]
    SessionSecretTooShort { min: usize, got: usize },
}

/// What happens to an outstanding nonce when a verify attempt fails after
/// the nonce lookup succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoncePolicy {
    /// Leave the nonce in place so the client can retry until it expires.
    #[default]
    RetainOnFailure,
    /// Compare-and-clear the nonce on any mismatch or bad signature. The
    /// client must fetch a fresh nonce before retrying.
    BurnOnFailure,
}

/// HMAC key used to sign session tokens.
///
/// Wrapped so it never shows up in `Debug` output or log lines.
#[derive(Clone)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    /// Accept a secret, rejecting anything shorter than
    /// [`MIN_SESSION_SECRET_LENGTH`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SESSION_SECRET_LENGTH {
            return Err(ConfigError::SessionSecretTooShort {
                min: MIN_SESSION_SECRET_LENGTH,
                got: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// Fresh random secret. Sessions signed with it die with the process.
    pub fn ephemeral() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; MIN_SESSION_SECRET_LENGTH * 2];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionSecret(<{} bytes>)", self.0.len())
    }
}

/// Process-wide authentication settings.
///
/// Built once at startup and shared behind an `Arc`. Nothing in the request
/// path re-reads the environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session signing key.
    pub session_secret: SessionSecret,
    /// Nonce validity window.
    pub nonce_ttl: Duration,
    /// Session validity window.
    pub session_ttl: Duration,
    /// Retry behaviour after a failed verify.
    pub nonce_policy: NoncePolicy,
    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
    /// Redirect target for unauthenticated browser requests.
    pub login_path: String,
}

impl AuthConfig {
    /// Production defaults around the given secret.
    pub fn new(session_secret: SessionSecret) -> Self {
        Self {
            session_secret,
            nonce_ttl: Duration::seconds(NONCE_TTL_SECS),
            session_ttl: Duration::seconds(SESSION_TTL_SECS),
            nonce_policy: NoncePolicy::default(),
            cookie_secure: true,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn with_nonce_policy(mut self, policy: NoncePolicy) -> Self {
        self.nonce_policy = policy;
        self
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}
