//! Client configuration and the settings file.

use crate::error::{PurLogError, PurLogResult};
use crate::level::{Environment, LogLevel};
use crate::Paths;
use purlog_storage::CredentialStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default API URL (can be overridden at compile time via PURLOG_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("PURLOG_API_URL") {
    Some(url) => url,
    None => "https://us-central1-purlog-45f7f.cloudfunctions.net",
};

/// App version reported when the host does not set one.
pub const DEFAULT_APP_VERSION: &str = "unknown";

/// Runtime configuration of a [`crate::PurLog`] client.
///
/// Without a `project_id` the client only renders locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurLogConfig {
    pub level: LogLevel,
    pub env: Environment,
    pub project_id: Option<String>,
    pub app_version: String,
}

impl Default for PurLogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            env: Environment::default(),
            project_id: None,
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }
}

impl PurLogConfig {
    pub fn builder() -> PurLogConfigBuilder {
        PurLogConfigBuilder::default()
    }
}

/// Builder for [`PurLogConfig`].
#[derive(Clone, Default)]
pub struct PurLogConfigBuilder {
    level: LogLevel,
    env: Environment,
    app_version: Option<String>,
    project: Option<(String, String)>,
}

impl PurLogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    /// Enable remote delivery for `project_id`, authenticated by the
    /// project credential issued for it.
    pub fn project(mut self, project_id: impl Into<String>, credential: impl Into<String>) -> Self {
        self.project = Some((project_id.into(), credential.into()));
        self
    }

    /// Validate and build the configuration.
    ///
    /// The project credential is not persisted; use
    /// [`build_and_store`](Self::build_and_store) unless it is already in
    /// storage.
    pub fn build(self) -> PurLogResult<PurLogConfig> {
        self.validate()?;
        Ok(self.into_config())
    }

    /// Validate, persist the project credential, then build.
    ///
    /// Fails without building if the credential cannot be stored.
    pub async fn build_and_store(self, store: &CredentialStore) -> PurLogResult<PurLogConfig> {
        self.validate()?;
        if let Some((project_id, credential)) = &self.project {
            store.set_project_credential(credential).await?;
            tracing::info!(project_id = %project_id, "Project JWT stored");
        }
        Ok(self.into_config())
    }

    fn validate(&self) -> PurLogResult<()> {
        if let Some((project_id, credential)) = &self.project {
            if project_id.trim().is_empty() {
                return Err(PurLogError::Config("Project id must not be empty".to_string()));
            }
            if credential.trim().is_empty() {
                return Err(PurLogError::Config(
                    "Project JWT must not be empty".to_string(),
                ));
            }
        }
        if matches!(&self.app_version, Some(v) if v.trim().is_empty()) {
            return Err(PurLogError::Config("App version must not be empty".to_string()));
        }
        Ok(())
    }

    fn into_config(self) -> PurLogConfig {
        PurLogConfig {
            level: self.level,
            env: self.env,
            project_id: self.project.map(|(project_id, _)| project_id),
            app_version: self
                .app_version
                .unwrap_or_else(|| DEFAULT_APP_VERSION.to_string()),
        }
    }
}

impl std::fmt::Debug for PurLogConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurLogConfigBuilder")
            .field("level", &self.level)
            .field("env", &self.env)
            .field("app_version", &self.app_version)
            .field("project_id", &self.project.as_ref().map(|(id, _)| id))
            .finish_non_exhaustive()
    }
}

/// Persisted settings used by the command line tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub level: LogLevel,
    pub env: Environment,
    pub project_id: Option<String>,
    pub api_url: String,
    pub app_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            env: Environment::default(),
            project_id: None,
            api_url: DEFAULT_API_URL.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a file, falling back to defaults if it does not
    /// exist.
    pub fn load(path: &Path) -> PurLogResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from the default location and apply environment overrides.
    pub fn load_default(paths: &Paths) -> PurLogResult<Self> {
        let mut settings = Self::load(&paths.config_file())?;
        settings.apply_env()?;
        Ok(settings)
    }

    /// Save settings to a file, creating its directory.
    pub fn save(&self, path: &Path) -> PurLogResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override from `PURLOG_LEVEL`, `PURLOG_ENV`, `PURLOG_PROJECT_ID` and
    /// `PURLOG_API_URL`.
    pub fn apply_env(&mut self) -> PurLogResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> PurLogResult<()> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = lookup("PURLOG_LEVEL") {
            self.level = level.parse()?;
        }
        if let Some(env) = lookup("PURLOG_ENV") {
            self.env = env.parse()?;
        }
        if let Some(project_id) = lookup("PURLOG_PROJECT_ID") {
            self.project_id = Some(project_id.trim().to_string());
        }
        if let Some(api_url) = lookup("PURLOG_API_URL") {
            self.api_url = api_url.trim().to_string();
        }
        self.validate()
    }

    /// The API URL as a parsed URL.
    pub fn api_url(&self) -> PurLogResult<Url> {
        Url::parse(&self.api_url)
            .map_err(|e| PurLogError::Config(format!("Invalid API URL {}: {}", self.api_url, e)))
    }

    fn validate(&self) -> PurLogResult<()> {
        self.api_url().map(|_| ())
    }

    /// The client configuration these settings describe.
    pub fn to_config(&self) -> PurLogConfig {
        PurLogConfig {
            level: self.level,
            env: self.env,
            project_id: self.project_id.clone(),
            app_version: self.app_version.clone(),
        }
    }
}
