//! Secure credential storage for the PurLog SDK.
//!
//! This crate provides platform-specific secure storage implementations:
//! - **macOS**: Keychain Access via `security-framework`
//! - **Linux**: Secret Service (GNOME Keyring / KWallet) via `secret-service`
//! - **Windows**: Credential Vault via `windows` crate
//!
//! plus an in-memory backend and [`CredentialStore`], the typed view the rest
//! of the SDK uses.

mod credentials;
mod keys;
mod memory;
mod traits;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

pub use credentials::CredentialStore;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::SecureStorage;

use std::sync::Arc;
use thiserror::Error;

/// Service name used for all platform storage operations.
pub const SERVICE_NAME: &str = "com.purlog.sdk";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key was never written (or has been deleted)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Platform-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this is the expected "nothing stored" outcome rather than a
    /// genuine failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Run a blocking platform call off the async executor.
#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
pub(crate) async fn run_blocking<F, T>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Platform(format!("Storage task failed: {}", e)))?
}

/// Create the default platform-specific storage implementation.
pub fn create_storage() -> StorageResult<Arc<dyn SecureStorage>> {
    #[cfg(target_os = "macos")]
    {
        let storage = macos::KeychainStorage::new(SERVICE_NAME)?;
        Ok(Arc::new(storage))
    }

    #[cfg(target_os = "linux")]
    {
        let storage = linux::SecretServiceStorage::new(SERVICE_NAME)?;
        Ok(Arc::new(storage))
    }

    #[cfg(target_os = "windows")]
    {
        let storage = windows::CredentialStorage::new(SERVICE_NAME)?;
        Ok(Arc::new(storage))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(StorageError::Platform(
            "No secure storage implementation available for this platform".to_string(),
        ))
    }
}

/// Create a [`CredentialStore`] over the default platform storage.
pub fn create_credential_store() -> StorageResult<CredentialStore> {
    Ok(CredentialStore::new(create_storage()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_constants() {
        for key in StorageKeys::ALL {
            assert!(!key.is_empty());
        }

        let unique: std::collections::HashSet<_> = StorageKeys::ALL.iter().collect();
        assert_eq!(unique.len(), StorageKeys::ALL.len(), "Storage keys must be unique");
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        assert!(StorageError::NotFound("k".into()).is_not_found());
        assert!(!StorageError::Platform("boom".into()).is_not_found());
        assert!(!StorageError::Encoding("bad utf-8".into()).is_not_found());
    }
}
