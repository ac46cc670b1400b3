//! Authentication error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Failures from the auth port and the session it maintains.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] marketstall_core::EmailError),

    /// Wrong password or unknown account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("an account already exists for this email")]
    EmailInUse,

    /// Password does not meet the policy.
    #[error("{0}")]
    WeakPassword(String),

    /// The auth service rejected the request for another reason.
    #[error("auth service rejected the request: {0}")]
    Rejected(String),

    /// Network or server failure.
    #[error("auth transport error: {0}")]
    Transport(String),

    /// Persisted session could not be read or written.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
