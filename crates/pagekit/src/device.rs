//! Device descriptors driving variant selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::PageError;

/// Kind of device under test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    /// Desktop browser
    #[default]
    Desktop,
    /// Android phone
    AndroidPhone,
    /// Android tablet
    AndroidTablet,
    /// Android TV
    AndroidTv,
    /// iPhone
    IosPhone,
    /// iPad
    IosTablet,
    /// Apple TV
    AppleTv,
}

impl DeviceType {
    /// All device types
    pub const ALL: [Self; 7] = [
        Self::Desktop,
        Self::AndroidPhone,
        Self::AndroidTablet,
        Self::AndroidTv,
        Self::IosPhone,
        Self::IosTablet,
        Self::AppleTv,
    ];

    /// Kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::AndroidPhone => "android-phone",
            Self::AndroidTablet => "android-tablet",
            Self::AndroidTv => "android-tv",
            Self::IosPhone => "ios-phone",
            Self::IosTablet => "ios-tablet",
            Self::AppleTv => "apple-tv",
        }
    }

    /// Operating system family of this device type
    #[must_use]
    pub const fn os_family(self) -> OsFamily {
        match self {
            Self::Desktop => OsFamily::Desktop,
            Self::AndroidPhone | Self::AndroidTablet | Self::AndroidTv => OsFamily::Android,
            Self::IosPhone | Self::IosTablet => OsFamily::Ios,
            Self::AppleTv => OsFamily::Tvos,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = PageError;

    /// Accepts kebab or snake case, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| PageError::InvalidDevice {
                value: s.to_string(),
            })
    }
}

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Desktop operating systems
    Desktop,
    /// Android
    Android,
    /// iOS and iPadOS
    Ios,
    /// tvOS
    Tvos,
}

/// Default major version when the device reports none
pub const DEFAULT_MAJOR_VERSION: &str = "1";

/// Major component of a dotted version
#[must_use]
pub fn major_version(version: &str) -> &str {
    let version = version.trim();
    if version.is_empty() {
        return DEFAULT_MAJOR_VERSION;
    }
    version.split('.').next().unwrap_or(DEFAULT_MAJOR_VERSION)
}

/// Runtime-detected device
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDescriptor {
    /// Device type
    pub device_type: DeviceType,
    /// Dotted OS version, empty when unknown
    pub os_version: String,
}

impl DeviceDescriptor {
    /// Describe a device
    #[must_use]
    pub fn new(device_type: DeviceType, os_version: impl Into<String>) -> Self {
        Self {
            device_type,
            os_version: os_version.into(),
        }
    }

    /// OS family derived from the device type
    #[must_use]
    pub const fn os_family(&self) -> OsFamily {
        self.device_type.os_family()
    }

    /// Major OS version, `"1"` when unknown
    #[must_use]
    pub fn major_version(&self) -> &str {
        major_version(&self.os_version)
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.os_version.is_empty() {
            write!(f, "{}", self.device_type)
        } else {
            write!(f, "{} {}", self.device_type, self.os_version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_type() {
        assert_eq!("android-phone".parse::<DeviceType>().unwrap(), DeviceType::AndroidPhone);
        assert_eq!("IOS_TABLET".parse::<DeviceType>().unwrap(), DeviceType::IosTablet);
        assert_eq!(" apple-tv ".parse::<DeviceType>().unwrap(), DeviceType::AppleTv);
        assert!(matches!(
            "toaster".parse::<DeviceType>(),
            Err(PageError::InvalidDevice { .. })
        ));
    }

    #[test]
    fn test_families() {
        assert_eq!(DeviceType::AndroidTv.os_family(), OsFamily::Android);
        assert_eq!(DeviceType::IosTablet.os_family(), OsFamily::Ios);
        assert_eq!(DeviceType::AppleTv.os_family(), OsFamily::Tvos);
        assert_eq!(DeviceType::Desktop.os_family(), OsFamily::Desktop);
    }

    #[test]
    fn test_major_version() {
        assert_eq!(DeviceDescriptor::new(DeviceType::AndroidPhone, "10.2").major_version(), "10");
        assert_eq!(DeviceDescriptor::new(DeviceType::IosPhone, "17").major_version(), "17");
        assert_eq!(DeviceDescriptor::new(DeviceType::AndroidTablet, "").major_version(), "1");
    }

    #[test]
    fn test_serde_names() {
        let device = DeviceDescriptor::new(DeviceType::AndroidTablet, "13");
        let json = serde_json::to_string(&device).unwrap();
        assert_eq!(json, r#"{"device_type":"android-tablet","os_version":"13"}"#);
        let back: DeviceDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, device);
        assert_eq!(device.to_string(), "android-tablet 13");
    }
}
