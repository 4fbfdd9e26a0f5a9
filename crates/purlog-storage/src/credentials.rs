//! Typed access to the credentials the SDK persists.

use crate::{SecureStorage, StorageKeys, StorageResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// High-level API over a [`SecureStorage`] backend for the project
/// credential, the session credential and the device identity.
///
/// Cloning is cheap and clones share the backend and the device identity
/// lock.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn SecureStorage>,
    identity_lock: Arc<Mutex<()>>,
}

impl CredentialStore {
    /// Create a credential store over the given backend
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self {
            storage,
            identity_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying storage backend.
    pub fn storage(&self) -> &Arc<dyn SecureStorage> {
        &self.storage
    }

    // ==========================================
    // Project credential
    // ==========================================

    /// Store the project credential
    pub async fn set_project_credential(&self, credential: &str) -> StorageResult<()> {
        self.storage
            .set(StorageKeys::PROJECT_CREDENTIAL, credential)
            .await
    }

    /// Retrieve the project credential. Empty values count as absent.
    pub async fn project_credential(&self) -> StorageResult<Option<String>> {
        self.get_non_empty(StorageKeys::PROJECT_CREDENTIAL).await
    }

    // ==========================================
    // Session credential
    // ==========================================

    /// Store the session credential, replacing the previous one
    pub async fn set_session_credential(&self, credential: &str) -> StorageResult<()> {
        self.storage
            .set(StorageKeys::SESSION_CREDENTIAL, credential)
            .await
    }

    /// Retrieve the session credential. Empty values count as absent.
    pub async fn session_credential(&self) -> StorageResult<Option<String>> {
        self.get_non_empty(StorageKeys::SESSION_CREDENTIAL).await
    }

    /// Delete the session credential
    pub async fn clear_session(&self) -> StorageResult<bool> {
        self.storage.delete(StorageKeys::SESSION_CREDENTIAL).await
    }

    // ==========================================
    // Device identity
    // ==========================================

    /// Retrieve the device identity
    pub async fn device_identity(&self) -> StorageResult<Option<String>> {
        self.get_non_empty(StorageKeys::DEVICE_IDENTITY).await
    }

    /// Return the device identity, generating and storing one if needed.
    ///
    /// Concurrent callers are serialised, so at most one identity is ever
    /// written per store.
    pub async fn ensure_device_identity(&self) -> StorageResult<String> {
        let _guard = self.identity_lock.lock().await;

        if let Some(existing) = self.device_identity().await? {
            return Ok(existing);
        }

        tracing::debug!("Device identity not found, creating a new one");
        let identity = uuid::Uuid::new_v4().to_string();
        self.storage
            .set(StorageKeys::DEVICE_IDENTITY, &identity)
            .await?;
        tracing::info!("Device identity created");
        Ok(identity)
    }

    /// Delete the device identity. The next ensure generates a new one.
    pub async fn clear_device_identity(&self) -> StorageResult<bool> {
        let _guard = self.identity_lock.lock().await;
        self.storage.delete(StorageKeys::DEVICE_IDENTITY).await
    }

    // ==========================================
    // Clear All
    // ==========================================

    /// Delete every credential the SDK stores, including the project
    /// credential.
    pub async fn clear_all(&self) -> StorageResult<()> {
        for key in StorageKeys::ALL {
            self.storage.delete(key).await?;
        }
        Ok(())
    }

    async fn get_non_empty(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get_optional(key)
            .await?
            .filter(|value| !value.is_empty()))
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
