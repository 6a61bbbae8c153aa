//! Device identity and capability checks.
//!
//! The identity is fetched once when a session opens and cached on it. Feature
//! checks are pure functions over the cached hardware model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::connection::netconf::element_text;
use crate::error::{Error, Result};

/// Identity reported by `<get-system-information/>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInformation {
    /// Hardware model, e.g. `vsrx`, `mx480`
    pub hardware_model: String,
    /// Operating system name
    pub os_name: String,
    /// Software version
    pub os_version: String,
    /// Chassis serial number
    pub serial_number: Option<String>,
    /// Configured host name
    pub host_name: Option<String>,
}

impl SystemInformation {
    /// Parse the body of a `<system-information>` reply.
    pub fn from_reply(data: &str) -> Result<Self> {
        let hardware_model = element_text(data, "hardware-model")
            .filter(|model| !model.is_empty())
            .ok_or_else(|| Error::Other {
                message: "reply carries no hardware-model".to_string(),
                source: None,
            })?;

        Ok(Self {
            hardware_model,
            os_name: element_text(data, "os-name").unwrap_or_default(),
            os_version: element_text(data, "os-version").unwrap_or_default(),
            serial_number: element_text(data, "serial-number"),
            host_name: element_text(data, "host-name"),
        })
    }

    /// Returns true if the hardware model belongs to a family that has `feature`.
    pub fn supports(&self, feature: Feature) -> bool {
        let model = self.hardware_model.to_ascii_lowercase();
        feature
            .model_prefixes()
            .iter()
            .any(|prefix| model.starts_with(prefix))
    }
}

/// Feature tags callers check before staging model-specific configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Security policies, zones, NAT
    Security,
    /// SRX chassis cluster
    ChassisCluster,
    /// Routing platforms
    Router,
    /// Ethernet switching
    Switching,
}

impl Feature {
    /// All known features
    pub const ALL: [Feature; 4] = [
        Feature::Security,
        Feature::ChassisCluster,
        Feature::Router,
        Feature::Switching,
    ];

    /// String tag
    pub fn tag(self) -> &'static str {
        match self {
            Feature::Security => "security",
            Feature::ChassisCluster => "chassis-cluster",
            Feature::Router => "router",
            Feature::Switching => "switching",
        }
    }

    fn model_prefixes(self) -> &'static [&'static str] {
        match self {
            Feature::Security => &["srx", "vsrx", "j"],
            Feature::ChassisCluster => &["srx", "vsrx"],
            Feature::Router => &["mx", "vmx", "ptx"],
            Feature::Switching => &["ex", "qfx"],
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown feature tag '{}'", s)))
    }
}
