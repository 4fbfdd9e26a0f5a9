//! macOS Keychain implementation.

use crate::{run_blocking, SecureStorage, StorageError, StorageResult};
use async_trait::async_trait;
use security_framework::item::{ItemClass, ItemSearchOptions, Limit, SearchResult};
use security_framework::passwords::{delete_generic_password, set_generic_password};
use std::sync::Arc;
use tracing::debug;

/// Keychain-based secure storage for macOS.
pub struct KeychainStorage {
    service_name: Arc<str>,
}

/// Matches the various shapes of `errSecItemNotFound` (-25300).
fn is_item_not_found(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not found")
        || lower.contains("could not be found")
        || lower.contains("-25300")
        || lower.contains("errsecitemnotfound")
}

impl KeychainStorage {
    /// Create a new Keychain storage instance.
    pub fn new(service_name: &str) -> StorageResult<Self> {
        Ok(Self {
            service_name: Arc::from(service_name),
        })
    }

    fn get_blocking(service: &str, key: &str) -> StorageResult<String> {
        let mut search = ItemSearchOptions::new();
        search
            .class(ItemClass::generic_password())
            .service(service)
            .account(key)
            .limit(Limit::Max(1))
            .load_data(true);

        let results = match search.search() {
            Ok(results) => results,
            Err(e) if is_item_not_found(&e.to_string()) => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => {
                return Err(StorageError::Platform(format!(
                    "Failed to get keychain item: {}",
                    e
                )))
            }
        };

        match results.into_iter().next() {
            Some(SearchResult::Data(data)) => {
                String::from_utf8(data).map_err(|e| StorageError::Encoding(e.to_string()))
            }
            _ => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn set_blocking(service: &str, key: &str, value: &str) -> StorageResult<()> {
        // Replace semantics: the keychain refuses duplicate items
        let _ = delete_generic_password(service, key);

        set_generic_password(service, key, value.as_bytes())
            .map_err(|e| StorageError::Platform(format!("Failed to set keychain item: {}", e)))
    }

    fn delete_blocking(service: &str, key: &str) -> StorageResult<bool> {
        match delete_generic_password(service, key) {
            Ok(()) => Ok(true),
            Err(e) if is_item_not_found(&e.to_string()) => Ok(false),
            Err(e) => Err(StorageError::Platform(format!(
                "Failed to delete keychain item: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl SecureStorage for KeychainStorage {
    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Setting keychain item");

        let service = self.service_name.clone();
        let key = key.to_string();
        let value = value.to_string();
        run_blocking(move || Self::set_blocking(&service, &key, &value)).await
    }

    async fn get(&self, key: &str) -> StorageResult<String> {
        debug!(service = %self.service_name, key = %key, "Getting keychain item");

        let service = self.service_name.clone();
        let key = key.to_string();
        run_blocking(move || Self::get_blocking(&service, &key)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting keychain item");

        let service = self.service_name.clone();
        let key = key.to_string();
        run_blocking(move || Self::delete_blocking(&service, &key)).await
    }
}
