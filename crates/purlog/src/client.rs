//! The PurLog client.
//!
//! A [`PurLog`] owns every service it needs: the credential store, the
//! session token manager, the dispatcher, the local sink and the device info
//! provider. Hosts usually build one at startup, call
//! [`initialize`](PurLog::initialize) once and share it behind an `Arc`.

use crate::config::{PurLogConfig, DEFAULT_API_URL};
use crate::device::{DeviceInfoProvider, SystemDeviceInfo};
use crate::dispatcher::{Dispatcher, HttpLogTransport, LogTransport, RecordContext};
use crate::error::{PurLogError, PurLogResult};
use crate::level::{should_log, LogLevel};
use crate::sink::{LocalSink, TracingSink};
use crate::Metadata;
use purlog_auth::{
    AuthError, ExpiryPolicy, HttpSessionTokenApi, JwtExpiry, SessionTokenApi, SessionTokenManager,
};
use purlog_storage::{CredentialStore, SecureStorage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info};

/// Default timeout of every HTTP request the client makes.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("purlog-rust/", env!("CARGO_PKG_VERSION"));

/// Lifecycle of a [`PurLog`] client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    /// `reset_credentials` is deleting stored credentials.
    Resetting,
}

struct Lifecycle {
    state: ClientState,
    config: Option<Arc<PurLogConfig>>,
    remote: Option<Arc<RecordContext>>,
}

/// Reverts an unfinished `initialize` so the host can retry.
struct InitGuard<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
    armed: bool,
}

impl InitGuard<'_> {
    fn complete(mut self, config: Arc<PurLogConfig>, remote: Option<Arc<RecordContext>>) {
        let mut lifecycle = lock(self.lifecycle);
        lifecycle.state = ClientState::Ready;
        lifecycle.config = Some(config);
        lifecycle.remote = remote;
        self.armed = false;
    }
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.lifecycle).state = ClientState::Uninitialized;
        }
    }
}

/// Restores the pre-reset state when `reset_credentials` does not finish.
struct ResetGuard<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
    previous: ClientState,
    armed: bool,
}

impl ResetGuard<'_> {
    fn complete(mut self) {
        let mut lifecycle = lock(self.lifecycle);
        lifecycle.state = ClientState::Uninitialized;
        lifecycle.config = None;
        lifecycle.remote = None;
        self.armed = false;
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.lifecycle).state = self.previous;
        }
    }
}

fn lock(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Leveled logger that renders locally and delivers to the PurLog service.
pub struct PurLog {
    store: CredentialStore,
    tokens: Arc<SessionTokenManager>,
    dispatcher: Dispatcher,
    sink: Arc<dyn LocalSink>,
    device_info: Arc<dyn DeviceInfoProvider>,
    lifecycle: Mutex<Lifecycle>,
}

impl PurLog {
    pub fn builder() -> PurLogBuilder {
        PurLogBuilder::default()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        lock(&self.lifecycle).state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ClientState::Ready
    }

    /// The configuration passed to a successful `initialize`.
    pub fn config(&self) -> Option<PurLogConfig> {
        lock(&self.lifecycle).config.as_deref().cloned()
    }

    /// The credential store this client reads from.
    ///
    /// Pass it to [`crate::PurLogConfigBuilder::build_and_store`] so the
    /// project credential lands where the client looks for it.
    pub fn credential_store(&self) -> &CredentialStore {
        &self.store
    }

    /// Whether a session credential request is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.tokens.is_refreshing()
    }

    /// Prepare the client for logging.
    ///
    /// With a project id this loads the project credential, ensures a device
    /// identity and a valid session credential. Without one the client is
    /// ready immediately and only renders locally.
    ///
    /// Fails with [`PurLogError::AlreadyInitialized`] unless the client is
    /// uninitialized. Any other failure leaves it uninitialized.
    pub async fn initialize(&self, config: PurLogConfig) -> PurLogResult<()> {
        let guard = {
            let mut lifecycle = lock(&self.lifecycle);
            if lifecycle.state != ClientState::Uninitialized {
                error!(state = ?lifecycle.state, "Initialization failed: Already initialized");
                return Err(PurLogError::AlreadyInitialized);
            }
            lifecycle.state = ClientState::Initializing;
            InitGuard {
                lifecycle: &self.lifecycle,
                armed: true,
            }
        };

        debug!(
            level = %config.level,
            env = %config.env,
            project_id = ?config.project_id,
            app_version = %config.app_version,
            "Initializing PurLog"
        );

        let remote = match self.bootstrap(&config).await {
            Ok(remote) => remote,
            Err(e) => {
                error!(error = %e, kind = ?e.kind(), "Failed to initialize PurLog");
                return Err(e);
            }
        };

        match &remote {
            Some(context) => info!(project_id = %context.project_id, "PurLog initialized"),
            None => info!("PurLog initialized without projectId"),
        }
        guard.complete(Arc::new(config), remote);
        Ok(())
    }

    async fn bootstrap(&self, config: &PurLogConfig) -> PurLogResult<Option<Arc<RecordContext>>> {
        let Some(project_id) = config.project_id.as_deref() else {
            return Ok(None);
        };

        let project_jwt = self
            .store
            .project_credential()
            .await?
            .ok_or(PurLogError::InvalidProjectCredential)?;

        let device_identity = self.store.ensure_device_identity().await?;

        let session_jwt = self
            .tokens
            .ensure_session(&project_jwt, &device_identity, project_id)
            .await
            .map_err(|e| match e {
                AuthError::TokenCreation(reason) => PurLogError::SessionCreation(reason),
                other => other.into(),
            })?;

        self.tokens
            .refresh_if_expired(&project_jwt, &session_jwt, project_id)
            .await?;

        Ok(Some(Arc::new(RecordContext {
            project_id: project_id.to_string(),
            env: config.env,
            device_info: self.device_info.device_info(),
            app_version: config.app_version.clone(),
        })))
    }

    /// Log `message` at `level` with attached metadata.
    ///
    /// Never fails: problems are reported through `tracing` and the line is
    /// dropped.
    pub async fn log(&self, level: LogLevel, message: &str, metadata: Metadata) {
        let (config, remote) = {
            let lifecycle = lock(&self.lifecycle);
            match (&lifecycle.state, &lifecycle.config) {
                (ClientState::Ready, Some(config)) => (config.clone(), lifecycle.remote.clone()),
                _ => {
                    error!("Log failed. PurLog must be initialized");
                    return;
                }
            }
        };

        if !should_log(level, config.level) {
            return;
        }

        if config.env.is_dev() {
            self.sink.render(level, config.env, message, &metadata);
        }

        if let Some(context) = remote {
            if let Err(e) = self.dispatcher.dispatch(&context, level, message, metadata).await {
                error!(error = %e, kind = ?e.kind(), "Failed to create log");
            }
        }
    }

    pub async fn verbose(&self, message: &str) {
        self.log(LogLevel::Verbose, message, Metadata::new()).await
    }

    pub async fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, Metadata::new()).await
    }

    pub async fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, Metadata::new()).await
    }

    pub async fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, Metadata::new()).await
    }

    pub async fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, Metadata::new()).await
    }

    pub async fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, message, Metadata::new()).await
    }

    /// Delete the session credential and device identity and return the
    /// client to [`ClientState::Uninitialized`].
    ///
    /// The project credential is kept. The next `initialize` creates a new
    /// device identity and session. While the reset runs the client is
    /// [`ClientState::Resetting`] and `initialize` is refused; a reset that
    /// fails or is dropped leaves the previous state in place.
    pub async fn reset_credentials(&self) -> PurLogResult<()> {
        let guard = {
            let mut lifecycle = lock(&self.lifecycle);
            let previous = lifecycle.state;
            if matches!(previous, ClientState::Initializing | ClientState::Resetting) {
                return Err(PurLogError::Config(format!(
                    "Cannot reset credentials while {:?}",
                    previous
                )));
            }
            lifecycle.state = ClientState::Resetting;
            ResetGuard {
                lifecycle: &self.lifecycle,
                previous,
                armed: true,
            }
        };

        self.store.clear_session().await?;
        self.store.clear_device_identity().await?;

        guard.complete();
        info!("Session credentials reset");
        Ok(())
    }
}

impl std::fmt::Debug for PurLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurLog")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PurLog`]. Every collaborator is optional.
pub struct PurLogBuilder {
    storage: Option<Arc<dyn SecureStorage>>,
    token_api: Option<Arc<dyn SessionTokenApi>>,
    transport: Option<Arc<dyn LogTransport>>,
    sink: Option<Arc<dyn LocalSink>>,
    device_info: Option<Arc<dyn DeviceInfoProvider>>,
    expiry: Option<Arc<dyn ExpiryPolicy>>,
    api_url: Option<String>,
    request_timeout: Duration,
}

impl Default for PurLogBuilder {
    fn default() -> Self {
        Self {
            storage: None,
            token_api: None,
            transport: None,
            sink: None,
            device_info: None,
            expiry: None,
            api_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PurLogBuilder {
    /// Credential backend. Defaults to the platform secure storage.
    pub fn storage(mut self, storage: Arc<dyn SecureStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn token_api(mut self, token_api: Arc<dyn SessionTokenApi>) -> Self {
        self.token_api = Some(token_api);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn LogTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Local renderer. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: Arc<dyn LocalSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn device_info(mut self, device_info: Arc<dyn DeviceInfoProvider>) -> Self {
        self.device_info = Some(device_info);
        self
    }

    /// Session expiry policy. Defaults to [`JwtExpiry`].
    pub fn expiry(mut self, expiry: Arc<dyn ExpiryPolicy>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Root of the PurLog API used by the default HTTP clients.
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> PurLogResult<PurLog> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => purlog_storage::create_storage()?,
        };
        let store = CredentialStore::new(storage);

        let api_url = self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        url::Url::parse(&api_url)
            .map_err(|e| PurLogError::Config(format!("Invalid API URL {}: {}", api_url, e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let token_api: Arc<dyn SessionTokenApi> = match self.token_api {
            Some(token_api) => token_api,
            None => Arc::new(HttpSessionTokenApi::with_client(
                http_client.clone(),
                api_url.clone(),
            )),
        };
        let transport: Arc<dyn LogTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpLogTransport::with_client(http_client, api_url)),
        };
        let expiry: Arc<dyn ExpiryPolicy> = match self.expiry {
            Some(expiry) => expiry,
            None => Arc::new(JwtExpiry::default()),
        };
        let sink: Arc<dyn LocalSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(TracingSink),
        };
        let device_info: Arc<dyn DeviceInfoProvider> = match self.device_info {
            Some(device_info) => device_info,
            None => Arc::new(SystemDeviceInfo::detect()),
        };

        let tokens = Arc::new(SessionTokenManager::new(token_api, store.clone(), expiry));
        let dispatcher = Dispatcher::new(store.clone(), tokens.clone(), transport);

        Ok(PurLog {
            store,
            tokens,
            dispatcher,
            sink,
            device_info,
            lifecycle: Mutex::new(Lifecycle {
                state: ClientState::Uninitialized,
                config: None,
                remote: None,
            }),
        })
    }
}

impl std::fmt::Debug for PurLogBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurLogBuilder")
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
