//! Storage trait definitions.

use crate::{StorageError, StorageResult};
use async_trait::async_trait;

/// Trait for secure storage backends.
///
/// Every operation may suspend and may be invoked concurrently. Backends do
/// not provide read-modify-write atomicity across keys; callers that need it
/// coordinate themselves.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Store a value securely, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value.
    ///
    /// A key that was never written yields [`StorageError::NotFound`].
    async fn get(&self, key: &str) -> StorageResult<String>;

    /// Delete a value. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Retrieve a value, mapping a missing key to `None`.
    async fn get_optional(&self, key: &str) -> StorageResult<Option<String>> {
        match self.get(key).await {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check if a key exists
    async fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get_optional(key).await?.is_some())
    }
}
