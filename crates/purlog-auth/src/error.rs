//! Auth error types.

use purlog_storage::StorageError;
use thiserror::Error;

/// Errors raised while creating or refreshing a session credential.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The token-issuance endpoint did not produce a session credential
    #[error("Failed to create session JWT: {0}")]
    TokenCreation(String),

    /// The refresh endpoint did not produce a session credential
    #[error("Failed to refresh session JWT: {0}")]
    TokenRefresh(String),

    /// Reading or persisting a credential failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
