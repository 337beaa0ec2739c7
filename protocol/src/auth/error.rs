use thiserror::Error;

use crate::storage::DbError;

/// Every way signup, nonce issuance or verification can fail.
///
/// Each variant is a distinct, client-visible outcome. None of them ever
/// results in a session being issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The request was malformed before any protocol step ran.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("identity already registered")]
    AlreadyRegistered,

    #[error("identity not found")]
    NotFound,

    /// No nonce outstanding, or it expired.
    #[error("invalid or expired nonce")]
    InvalidNonce,

    #[error("nonce mismatch")]
    NonceMismatch,

    /// The issuer's embedded key could not be decoded.
    #[error("malformed identity")]
    MalformedIdentity,

    #[error("invalid signature")]
    InvalidSignature,

    /// Storage or other unexpected fault. The cause is for logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short, stable label for log fields and metric labels.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation",
            AuthError::AlreadyRegistered => "already_registered",
            AuthError::NotFound => "not_found",
            AuthError::InvalidNonce => "invalid_nonce",
            AuthError::NonceMismatch => "nonce_mismatch",
            AuthError::MalformedIdentity => "malformed_identity",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AlreadyExists(_) => AuthError::AlreadyRegistered,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_taxonomy() {
        let dup: AuthError = DbError::AlreadyExists("did:key:zA".into()).into();
        assert_eq!(dup, AuthError::AlreadyRegistered);

        let ser: AuthError = DbError::Serialization("truncated".into()).into();
        assert!(matches!(ser, AuthError::Internal(msg) if msg.contains("truncated")));
    }

    #[test]
    fn reasons_are_distinct() {
        let all = [
            AuthError::Validation(String::new()),
            AuthError::AlreadyRegistered,
            AuthError::NotFound,
            AuthError::InvalidNonce,
            AuthError::NonceMismatch,
            AuthError::MalformedIdentity,
            AuthError::InvalidSignature,
            AuthError::Internal(String::new()),
        ];
        let mut reasons: Vec<_> = all.iter().map(AuthError::reason).collect();
        reasons.sort_unstable();
        reasons.dedup();
        assert_eq!(reasons.len(), all.len());
    }
}
