//! Linux Secret Service implementation.

use crate::{run_blocking, SecureStorage, StorageError, StorageResult};
use async_trait::async_trait;
use secret_service::{blocking::SecretService, EncryptionType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Secret Service based secure storage for Linux.
pub struct SecretServiceStorage {
    service_name: Arc<str>,
}

impl SecretServiceStorage {
    /// Create a new Secret Service storage instance.
    pub fn new(service_name: &str) -> StorageResult<Self> {
        // Fail at construction rather than on the first log call
        SecretService::connect(EncryptionType::Dh).map_err(|e| {
            StorageError::Platform(format!("Failed to connect to Secret Service: {}", e))
        })?;

        Ok(Self {
            service_name: Arc::from(service_name),
        })
    }

    fn with_collection<F, T>(f: F) -> StorageResult<T>
    where
        F: FnOnce(&secret_service::blocking::Collection) -> StorageResult<T>,
    {
        let ss = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| StorageError::Platform(e.to_string()))?;

        let collection = ss
            .get_default_collection()
            .map_err(|e| StorageError::Platform(e.to_string()))?;

        if collection.is_locked().unwrap_or(false) {
            collection.unlock().map_err(|e| {
                StorageError::Platform(format!("Failed to unlock collection: {}", e))
            })?;
        }

        f(&collection)
    }

    fn attributes<'a>(service: &'a str, key: &'a str) -> HashMap<&'a str, &'a str> {
        let mut attrs = HashMap::new();
        attrs.insert("service", service);
        attrs.insert("key", key);
        attrs
    }

    fn get_blocking(service: &str, key: &str) -> StorageResult<String> {
        Self::with_collection(|collection| {
            let items = collection
                .search_items(Self::attributes(service, key))
                .map_err(|e| StorageError::Platform(e.to_string()))?;

            let item = items
                .first()
                .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

            let secret = item
                .get_secret()
                .map_err(|e| StorageError::Platform(e.to_string()))?;

            String::from_utf8(secret).map_err(|e| StorageError::Encoding(e.to_string()))
        })
    }

    fn delete_blocking(service: &str, key: &str) -> StorageResult<bool> {
        Self::with_collection(|collection| {
            let items = collection
                .search_items(Self::attributes(service, key))
                .map_err(|e| StorageError::Platform(e.to_string()))?;

            let Some(item) = items.first() else {
                return Ok(false);
            };

            item.delete()
                .map_err(|e| StorageError::Platform(e.to_string()))?;

            Ok(true)
        })
    }

    fn set_blocking(service: &str, key: &str, value: &str) -> StorageResult<()> {
        Self::with_collection(|collection| {
            let label = format!("{}/{}", service, key);

            collection
                .create_item(
                    &label,
                    Self::attributes(service, key),
                    value.as_bytes(),
                    true, // replace
                    "text/plain",
                )
                .map_err(|e| StorageError::Platform(e.to_string()))?;

            Ok(())
        })
    }
}

#[async_trait]
impl SecureStorage for SecretServiceStorage {
    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Setting secret");

        let service = self.service_name.clone();
        let key = key.to_string();
        let value = value.to_string();
        run_blocking(move || Self::set_blocking(&service, &key, &value)).await
    }

    async fn get(&self, key: &str) -> StorageResult<String> {
        debug!(service = %self.service_name, key = %key, "Getting secret");

        let service = self.service_name.clone();
        let key = key.to_string();
        run_blocking(move || Self::get_blocking(&service, &key)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting secret");

        let service = self.service_name.clone();
        let key = key.to_string();
        run_blocking(move || Self::delete_blocking(&service, &key)).await
    }
}
