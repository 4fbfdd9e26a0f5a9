//! Log levels, environments and the level filter.

use crate::error::PurLogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log line, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Every level in ascending severity.
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Verbose,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    /// Wire name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Verbose => "VERBOSE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = PurLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VERBOSE" => Ok(LogLevel::Verbose),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(PurLogError::Config(format!("Unknown log level: {}", s))),
        }
    }
}

/// Deployment environment of the host application.
///
/// Local rendering only happens in [`Environment::Dev`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    /// Wire name of the environment.
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Prod => "PROD",
        }
    }

    pub fn is_dev(self) -> bool {
        self == Environment::Dev
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = PurLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEV" | "DEVELOPMENT" => Ok(Environment::Dev),
            "PROD" | "PRODUCTION" => Ok(Environment::Prod),
            _ => Err(PurLogError::Config(format!("Unknown environment: {}", s))),
        }
    }
}

/// Whether a line at `message_level` passes a filter set to `configured`.
pub fn should_log(message_level: LogLevel, configured: LogLevel) -> bool {
    message_level.index() >= configured.index()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_log_all_pairs() {
        for (mi, message) in LogLevel::ALL.iter().enumerate() {
            for (ci, configured) in LogLevel::ALL.iter().enumerate() {
                assert_eq!(
                    should_log(*message, *configured),
                    mi >= ci,
                    "message {message} with filter {configured}"
                );
            }
        }
    }

    #[test]
    fn test_should_log_examples() {
        assert!(!should_log(LogLevel::Debug, LogLevel::Info));
        assert!(should_log(LogLevel::Info, LogLevel::Info));
        assert!(should_log(LogLevel::Fatal, LogLevel::Verbose));
        assert!(!should_log(LogLevel::Error, LogLevel::Fatal));
    }

    #[test]
    fn test_level_wire_names() {
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), r#""WARN""#);
        assert_eq!(serde_json::from_str::<LogLevel>(r#""FATAL""#).unwrap(), LogLevel::Fatal);
        assert_eq!(serde_json::to_string(&Environment::Prod).unwrap(), r#""PROD""#);
        for level in LogLevel::ALL {
            assert_eq!(serde_json::to_value(level).unwrap(), level.to_string());
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!(" Warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(LogLevel::default(), LogLevel::Verbose);
        assert_eq!(Environment::default(), Environment::Dev);
        assert!(Environment::Dev.is_dev());
        assert!(!Environment::Prod.is_dev());
    }
}
