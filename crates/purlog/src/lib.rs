//! Client logging SDK for the PurLog service.
//!
//! ```ignore
//! let client = purlog::PurLog::builder().build()?;
//! let config = purlog::PurLogConfig::builder()
//!     .level(purlog::LogLevel::Info)
//!     .project("my-project", project_jwt)
//!     .build_and_store(client.credential_store())
//!     .await?;
//! client.initialize(config).await?;
//! client.info("Checkout started").await;
//! ```

mod client;
mod config;
mod device;
mod dispatcher;
mod error;
mod level;
mod logging;
mod paths;
mod sink;

/// String key/value pairs attached to a log line.
pub type Metadata = std::collections::BTreeMap<String, String>;

pub use client::{ClientState, PurLog, PurLogBuilder, DEFAULT_REQUEST_TIMEOUT, USER_AGENT};
pub use config::{
    PurLogConfig, PurLogConfigBuilder, Settings, DEFAULT_API_URL, DEFAULT_APP_VERSION,
};
pub use device::{
    DeviceInfo, DeviceInfoProvider, SystemDeviceInfo, UNKNOWN_OS_NAME, UNKNOWN_OS_VERSION,
};
pub use dispatcher::{
    Dispatcher, HttpLogTransport, LogRecord, LogTransport, RecordContext, LOGS_PATH, SDK_NAME,
};
pub use error::{ErrorKind, PurLogError, PurLogResult};
pub use level::{should_log, Environment, LogLevel};
pub use logging::{init_logging, init_logging_with_format, LogFormat, LOG_FORMAT_ENV};
pub use paths::Paths;
pub use sink::{LocalSink, TracingSink, SINK_TARGET};

// Collaborator types hosts need to customise a client
pub use purlog_auth::{ExpiryPolicy, JwtExpiry, NeverExpires, SessionTokenApi};
pub use purlog_storage::{CredentialStore, MemoryStorage, SecureStorage};
