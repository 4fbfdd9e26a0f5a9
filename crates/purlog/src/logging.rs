//! Diagnostic logging initialization.
//!
//! The SDK reports its own progress and failures through `tracing`. Hosts
//! that already install a subscriber can skip this module; otherwise
//! [`init_logging`] installs a stderr subscriber.

use tracing_subscriber::EnvFilter;

/// Selects the output format of [`init_logging`].
pub const LOG_FORMAT_ENV: &str = "PURLOG_LOG_FORMAT";

/// Output format of the diagnostic subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Read the format from `PURLOG_LOG_FORMAT`.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Initialize diagnostic logging to stderr.
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` if a global
/// subscriber was already installed, in which case nothing changes.
///
/// ```ignore
/// purlog::init_logging("info");
/// tracing::info!("Host started");
/// ```
pub fn init_logging(level: &str) -> bool {
    init_logging_with_format(level, LogFormat::from_env())
}

/// Initialize diagnostic logging with an explicit format.
pub fn init_logging_with_format(level: &str, format: LogFormat) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.is_ok()
}
