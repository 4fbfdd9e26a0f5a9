//! Session credential lifecycle.
//!
//! [`SessionTokenManager`] is the only writer of the stored session
//! credential. Every create or refresh runs under one async mutex, so callers
//! that arrive while a request is in flight wait for it and then reuse its
//! result instead of issuing their own.

use crate::api::SessionTokenApi;
use crate::error::AuthResult;
use crate::expiry::ExpiryPolicy;
use purlog_storage::CredentialStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Raises the in-flight flag for the lifetime of a network exchange.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Creates, refreshes and persists the session credential for one
/// credential pair.
pub struct SessionTokenManager {
    api: Arc<dyn SessionTokenApi>,
    store: CredentialStore,
    expiry: Arc<dyn ExpiryPolicy>,
    lock: Mutex<()>,
    refreshing: AtomicBool,
}

impl SessionTokenManager {
    /// Create a manager writing to `store` through `api`.
    pub fn new(
        api: Arc<dyn SessionTokenApi>,
        store: CredentialStore,
        expiry: Arc<dyn ExpiryPolicy>,
    ) -> Self {
        Self {
            api,
            store,
            expiry,
            lock: Mutex::new(()),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Whether a create or refresh request is currently in flight.
    ///
    /// Informational only; exclusion is provided by the manager itself.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Whether the expiry policy considers `session_credential` stale.
    pub fn is_expired(&self, session_credential: &str) -> bool {
        self.expiry.is_expired(session_credential)
    }

    /// Issue a new session credential and persist it.
    ///
    /// Always contacts the backend. On failure nothing is written.
    pub async fn create_token(
        &self,
        project_credential: &str,
        device_identity: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        let _guard = self.lock.lock().await;
        self.create_locked(project_credential, device_identity, project_id)
            .await
    }

    /// Exchange `session_credential` for a fresh one and persist it.
    ///
    /// If the stored credential no longer matches `session_credential`, a
    /// concurrent caller already replaced it and the stored value is returned
    /// without contacting the backend.
    pub async fn refresh_token(
        &self,
        project_credential: &str,
        session_credential: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        let _guard = self.lock.lock().await;

        if let Some(current) = self.store.session_credential().await? {
            if current != session_credential {
                debug!("Session JWT already replaced by a concurrent refresh");
                return Ok(current);
            }
        }

        self.refresh_locked(project_credential, session_credential, project_id)
            .await
    }

    /// Return the stored session credential, creating one if none exists.
    pub async fn ensure_session(
        &self,
        project_credential: &str,
        device_identity: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        if let Some(existing) = self.store.session_credential().await? {
            return Ok(existing);
        }

        let _guard = self.lock.lock().await;

        // Another caller may have created it while we waited for the lock
        if let Some(existing) = self.store.session_credential().await? {
            return Ok(existing);
        }

        debug!("Session JWT not found, creating a new one");
        self.create_locked(project_credential, device_identity, project_id)
            .await
    }

    /// Refresh `session_credential` if the expiry policy says so; otherwise
    /// return it unchanged.
    pub async fn refresh_if_expired(
        &self,
        project_credential: &str,
        session_credential: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        if !self.expiry.is_expired(session_credential) {
            return Ok(session_credential.to_string());
        }

        let _guard = self.lock.lock().await;

        let current = self
            .store
            .session_credential()
            .await?
            .unwrap_or_else(|| session_credential.to_string());

        if current != session_credential && !self.expiry.is_expired(&current) {
            debug!("Session JWT already refreshed by a concurrent caller");
            return Ok(current);
        }

        self.refresh_locked(project_credential, &current, project_id)
            .await
    }

    async fn create_locked(
        &self,
        project_credential: &str,
        device_identity: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        let token = {
            let _in_flight = InFlight::raise(&self.refreshing);
            self.api
                .create_session_token(project_credential, device_identity, project_id)
                .await
                .inspect_err(|e| warn!(error = %e, "Session JWT creation failed"))?
        };

        self.store.set_session_credential(&token).await?;
        info!(project_id = %project_id, "Session JWT created");
        Ok(token)
    }

    async fn refresh_locked(
        &self,
        project_credential: &str,
        session_credential: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        let token = {
            let _in_flight = InFlight::raise(&self.refreshing);
            self.api
                .refresh_session_token(project_credential, session_credential, project_id)
                .await
                .inspect_err(|e| warn!(error = %e, "Session JWT refresh failed"))?
        };

        self.store.set_session_credential(&token).await?;
        info!(project_id = %project_id, "Session JWT refreshed");
        Ok(token)
    }
}

impl std::fmt::Debug for SessionTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenManager")
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}
