//! Device metadata attached to every submitted log.

use serde::{Deserialize, Serialize};

/// Reported when the OS name cannot be determined.
pub const UNKNOWN_OS_NAME: &str = "Unknown OS Device";

/// Reported when the OS version cannot be determined.
pub const UNKNOWN_OS_VERSION: &str = "Unknown Version";

/// Operating system name and version of the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub os_name: String,
    pub os_version: String,
}

impl DeviceInfo {
    /// Build device info, substituting the fallbacks for missing or blank
    /// values.
    pub fn new(os_name: Option<String>, os_version: Option<String>) -> Self {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            os_name: non_blank(os_name).unwrap_or_else(|| UNKNOWN_OS_NAME.to_string()),
            os_version: non_blank(os_version).unwrap_or_else(|| UNKNOWN_OS_VERSION.to_string()),
        }
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Supplies the device info for submitted logs.
pub trait DeviceInfoProvider: Send + Sync {
    fn device_info(&self) -> DeviceInfo;
}

impl DeviceInfoProvider for DeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        self.clone()
    }
}

/// Device info detected from the running system once, at construction.
#[derive(Debug, Clone)]
pub struct SystemDeviceInfo {
    info: DeviceInfo,
}

impl SystemDeviceInfo {
    pub fn detect() -> Self {
        let info = DeviceInfo::new(Some(os_name().to_string()), os_version());
        tracing::debug!(
            os_name = %info.os_name,
            os_version = %info.os_version,
            "Detected device info"
        );
        Self { info }
    }
}

impl Default for SystemDeviceInfo {
    fn default() -> Self {
        Self::detect()
    }
}

impl DeviceInfoProvider for SystemDeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macOS",
        "ios" => "iOS",
        "linux" => "Linux",
        "windows" => "Windows",
        "android" => "Android",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

#[cfg(target_os = "linux")]
fn os_version() -> Option<String> {
    let content = std::fs::read_to_string("/etc/os-release").ok()?;
    parse_os_release_version(&content)
}

#[cfg(target_os = "macos")]
fn os_version() -> Option<String> {
    let output = std::process::Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn os_version() -> Option<String> {
    None
}

/// `VERSION_ID` from an os-release file, unquoted.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_os_release_version(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("VERSION_ID="))
        .map(|value| value.trim().trim_matches('"').to_string())
}
