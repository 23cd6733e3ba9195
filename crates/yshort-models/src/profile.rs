//! Source client profiles and quality tiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device category a source client identifies itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    Mobile,
    Desktop,
}

impl DeviceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Mobile => "mobile",
            DeviceCategory::Desktop => "desktop",
        }
    }
}

/// Identity used when constructing a source client.
///
/// Profiles are tried in [`PROFILE_ROTATION`] order; some videos are only
/// reachable through one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClientProfile {
    Android,
    Ios,
    Web,
}

/// Fixed order in which profiles are attempted for remote acquisition.
pub const PROFILE_ROTATION: [ClientProfile; 3] =
    [ClientProfile::Android, ClientProfile::Ios, ClientProfile::Web];

impl ClientProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientProfile::Android => "android",
            ClientProfile::Ios => "ios",
            ClientProfile::Web => "web",
        }
    }

    /// Device category reported by clients built for this profile.
    pub fn device_category(&self) -> DeviceCategory {
        match self {
            ClientProfile::Android | ClientProfile::Ios => DeviceCategory::Mobile,
            ClientProfile::Web => DeviceCategory::Desktop,
        }
    }
}

impl fmt::Display for ClientProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quality tier requested from the source for a combined video+audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Smallest stream that still carries both tracks. Used for clip conversion.
    #[default]
    Efficient,
    /// Highest quality combined stream.
    Best,
}

impl Quality {
    /// Map a caller-supplied hint (`high` → best) onto a tier.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_ascii_lowercase()) {
            Some(h) if h == "high" || h == "best" => Quality::Best,
            _ => Quality::Efficient,
        }
    }
}
