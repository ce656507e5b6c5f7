//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Verification key could not be loaded.
    #[error("invalid verification key: {0}")]
    InvalidKey(String),

    /// Token failed verification (signature, expiry, issuer or shape).
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// Session token has expired.
    #[error("session token expired")]
    Expired,

    /// Token subject is empty.
    #[error("session token has no subject")]
    MissingSubject,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
