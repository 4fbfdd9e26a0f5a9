//! Windows Credential Vault implementation.

use crate::{run_blocking, SecureStorage, StorageError, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use windows::{
    core::HSTRING,
    Security::Credentials::{PasswordCredential, PasswordVault},
};

/// `ERROR_NOT_FOUND` as surfaced by the vault.
const VAULT_NOT_FOUND: u32 = 0x8007_0490;

/// Credential Vault based secure storage for Windows.
pub struct CredentialStorage {
    resource_name: Arc<str>,
}

fn vault() -> StorageResult<PasswordVault> {
    PasswordVault::new()
        .map_err(|e| StorageError::Platform(format!("Failed to access Credential Vault: {}", e)))
}

fn is_not_found(e: &windows::core::Error) -> bool {
    e.code().0 as u32 == VAULT_NOT_FOUND
}

impl CredentialStorage {
    /// Create a new Credential Vault storage instance.
    pub fn new(resource_name: &str) -> StorageResult<Self> {
        vault()?;

        Ok(Self {
            resource_name: Arc::from(resource_name),
        })
    }

    fn get_blocking(resource: &str, key: &str) -> StorageResult<String> {
        let vault = vault()?;

        let credential = match vault.Retrieve(&HSTRING::from(resource), &HSTRING::from(key)) {
            Ok(credential) => credential,
            Err(e) if is_not_found(&e) => return Err(StorageError::NotFound(key.to_string())),
            Err(e) => {
                return Err(StorageError::Platform(format!(
                    "Failed to retrieve credential: {}",
                    e
                )))
            }
        };

        // Populates the Password field
        credential
            .RetrievePassword()
            .map_err(|e| StorageError::Platform(format!("Failed to retrieve password: {}", e)))?;

        let password = credential
            .Password()
            .map_err(|e| StorageError::Platform(format!("Failed to get password: {}", e)))?;

        Ok(password.to_string())
    }

    fn delete_blocking(resource: &str, key: &str) -> StorageResult<bool> {
        let vault = vault()?;

        match vault.Retrieve(&HSTRING::from(resource), &HSTRING::from(key)) {
            Ok(credential) => {
                vault.Remove(&credential).map_err(|e| {
                    StorageError::Platform(format!("Failed to remove credential: {}", e))
                })?;
                Ok(true)
            }
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::Platform(format!(
                "Failed to find credential for deletion: {}",
                e
            ))),
        }
    }

    fn set_blocking(resource: &str, key: &str, value: &str) -> StorageResult<()> {
        let vault = vault()?;
        Self::delete_blocking(resource, key)?;

        let credential = PasswordCredential::CreatePasswordCredential(
            &HSTRING::from(resource),
            &HSTRING::from(key),
            &HSTRING::from(value),
        )
        .map_err(|e| StorageError::Platform(format!("Failed to create credential: {}", e)))?;

        vault
            .Add(&credential)
            .map_err(|e| StorageError::Platform(format!("Failed to add credential: {}", e)))
    }
}

#[async_trait]
impl SecureStorage for CredentialStorage {
    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(resource = %self.resource_name, key = %key, "Setting credential");

        let resource = self.resource_name.clone();
        let key = key.to_string();
        let value = value.to_string();
        run_blocking(move || Self::set_blocking(&resource, &key, &value)).await
    }

    async fn get(&self, key: &str) -> StorageResult<String> {
        debug!(resource = %self.resource_name, key = %key, "Getting credential");

        let resource = self.resource_name.clone();
        let key = key.to_string();
        run_blocking(move || Self::get_blocking(&resource, &key)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(resource = %self.resource_name, key = %key, "Deleting credential");

        let resource = self.resource_name.clone();
        let key = key.to_string();
        run_blocking(move || Self::delete_blocking(&resource, &key)).await
    }
}
