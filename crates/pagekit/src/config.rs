//! Runtime settings.
//!
//! Settings are parsed from YAML text handed over by the caller; locating and
//! reading configuration files is left to the test harness. Environment
//! variables override the device section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceDescriptor, DeviceType};
use crate::result::{PageError, PageResult};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Environment variable overriding the device type
pub const ENV_DEVICE: &str = "PAGEKIT_DEVICE";

/// Environment variable overriding the OS version
pub const ENV_OS_VERSION: &str = "PAGEKIT_OS_VERSION";

/// Settings shared by every page built in a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timeout for presence and visibility checks
    pub wait_timeout_ms: u64,
    /// Polling interval for presence and visibility checks
    pub poll_interval_ms: u64,
    /// Device under test
    pub device: DeviceDescriptor,
    /// `tracing` filter directive, e.g. `pagekit=debug`
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            device: DeviceDescriptor::default(),
            log_filter: None,
        }
    }
}

impl Settings {
    /// Default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from YAML
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidConfig`] if the YAML is malformed or a
    /// value is out of range.
    pub fn from_yaml_str(yaml: &str) -> PageResult<Self> {
        let settings: Self = serde_yaml_ng::from_str(yaml).map_err(|e| PageError::InvalidConfig {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Render as YAML
    pub fn to_yaml_string(&self) -> PageResult<String> {
        serde_yaml_ng::to_string(self).map_err(|e| PageError::InvalidConfig {
            message: e.to_string(),
        })
    }

    fn validate(&self) -> PageResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(PageError::InvalidConfig {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Set the device under test
    #[must_use]
    pub fn with_device(mut self, device: DeviceDescriptor) -> Self {
        self.device = device;
        self
    }

    /// Set the wait timeout
    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Apply `PAGEKIT_DEVICE` / `PAGEKIT_OS_VERSION` from the process environment
    pub fn with_env_overrides(self) -> PageResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> PageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device) = lookup(ENV_DEVICE).filter(|v| !v.trim().is_empty()) {
            self.device.device_type = device.parse::<DeviceType>()?;
        }
        if let Some(version) = lookup(ENV_OS_VERSION) {
            self.device.os_version = version.trim().to_string();
        }
        Ok(self)
    }

    /// Polling options for presence checks
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions::new_with(self.wait_timeout_ms, self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.wait_timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
        assert_eq!(settings.device.device_type, DeviceType::Desktop);
        assert_eq!(settings.wait_options(), WaitOptions::default());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r"
wait_timeout_ms: 2500
device:
  device_type: android-phone
  os_version: '13.1'
log_filter: pagekit=debug
";
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.wait_timeout_ms, 2500);
        assert_eq!(settings.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(settings.device, DeviceDescriptor::new(DeviceType::AndroidPhone, "13.1"));
        assert_eq!(settings.log_filter.as_deref(), Some("pagekit=debug"));
        assert_eq!(settings.wait_options().timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_yaml_round_trip() {
        let settings = Settings::new().with_device(DeviceDescriptor::new(DeviceType::IosTablet, "17"));
        let yaml = settings.to_yaml_string().unwrap();
        assert_eq!(Settings::from_yaml_str(&yaml).unwrap(), settings);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Settings::from_yaml_str("device: {device_type: toaster}"),
            Err(PageError::InvalidConfig { .. })
        ));
        assert!(matches!(
            Settings::from_yaml_str("poll_interval_ms: 0"),
            Err(PageError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_DEVICE, "IOS_PHONE"), (ENV_OS_VERSION, " 16.4 ")]);
        let settings = Settings::new()
            .with_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();
        assert_eq!(settings.device, DeviceDescriptor::new(DeviceType::IosPhone, "16.4"));
    }

    #[test]
    fn test_invalid_override() {
        let err = Settings::new()
            .with_overrides(|key| (key == ENV_DEVICE).then(|| "fridge".to_string()))
            .unwrap_err();
        assert!(matches!(err, PageError::InvalidDevice { .. }));
    }
}
