//! Error types for the PurLog client.

use purlog_auth::AuthError;
use purlog_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the PurLog client.
///
/// Only configuration and `initialize` return these to the host. Failures
/// while emitting a log line are reported through `tracing` instead.
#[derive(Error, Debug)]
pub enum PurLogError {
    /// `initialize` was called on a client that is not uninitialized
    #[error("Initialization failed: Already initialized")]
    AlreadyInitialized,

    /// No project credential is stored for the configured project
    #[error("Failed to initialize PurLog: Invalid project JWT")]
    InvalidProjectCredential,

    /// Bootstrap could not obtain a session credential
    #[error("Failed to initialize PurLog: Unable to create session token: {0}")]
    SessionCreation(String),

    /// The token-issuance endpoint failed
    #[error("Failed to create session JWT: {0}")]
    TokenCreation(String),

    /// The refresh endpoint failed
    #[error("Failed to refresh session JWT: {0}")]
    TokenRefresh(String),

    /// A credential needed to submit a log is absent
    #[error("Failed to create log: Invalid or missing {0}")]
    MissingCredential(&'static str),

    /// The log endpoint answered with a non-success status
    #[error("Failed to create log: Bad response: {status} {detail}")]
    LogDelivery { status: u16, detail: String },

    /// Secure storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading or writing the settings file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Flat classification of [`PurLogError`] for hosts that branch on the
/// failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyInitialized,
    InvalidProjectCredential,
    SessionCreation,
    TokenCreation,
    TokenRefresh,
    MissingCredential,
    LogDelivery,
    Storage,
    Config,
    Http,
}

impl PurLogError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            Self::InvalidProjectCredential => ErrorKind::InvalidProjectCredential,
            Self::SessionCreation(_) => ErrorKind::SessionCreation,
            Self::TokenCreation(_) => ErrorKind::TokenCreation,
            Self::TokenRefresh(_) => ErrorKind::TokenRefresh,
            Self::MissingCredential(_) => ErrorKind::MissingCredential,
            Self::LogDelivery { .. } => ErrorKind::LogDelivery,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Config(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Config,
            Self::Http(_) => ErrorKind::Http,
        }
    }
}

impl From<AuthError> for PurLogError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(reason) => Self::TokenCreation(reason),
            AuthError::TokenRefresh(reason) => Self::TokenRefresh(reason),
            AuthError::Storage(e) => Self::Storage(e),
        }
    }
}

/// Result type alias using PurLogError.
pub type PurLogResult<T> = Result<T, PurLogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_keep_their_category() {
        let err: PurLogError = AuthError::TokenCreation("Non-200 status code: 401".into()).into();
        assert_eq!(err.kind(), ErrorKind::TokenCreation);
        assert!(err.to_string().contains("401"));

        let err: PurLogError = AuthError::TokenRefresh("timeout".into()).into();
        assert_eq!(err.kind(), ErrorKind::TokenRefresh);

        let err: PurLogError = AuthError::Storage(StorageError::Platform("locked".into())).into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            PurLogError::AlreadyInitialized.to_string(),
            "Initialization failed: Already initialized"
        );
        assert_eq!(
            PurLogError::MissingCredential("session JWT").to_string(),
            "Failed to create log: Invalid or missing session JWT"
        );
        let err = PurLogError::LogDelivery {
            status: 500,
            detail: "Internal Server Error".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to create log: Bad response: 500 Internal Server Error"
        );
        assert_eq!(err.kind(), ErrorKind::LogDelivery);
    }

    #[test]
    fn test_settings_errors_are_config() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(PurLogError::from(json_err).kind(), ErrorKind::Config);

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(PurLogError::from(io_err).kind(), ErrorKind::Config);
    }
}
