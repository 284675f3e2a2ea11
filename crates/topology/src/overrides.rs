/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

//! Static per-site configuration applied on top of what was discovered.
//!
//! ```yaml
//! LBNL:
//!   dp_switch:
//!     name: lbnl-data-sw
//!   nodes:
//!     lbnl-w1.fabric-testbed.net: { ram: 768, disk: 2000 }
//!   stitch_ports:
//!     - port: HundredGigE0/0/0/5
//!       peer: "AL2S agg3.ashb HundredGigE0/0/0/1"
//!       vlan_range: "2000-2100"
//!   facility_ports:
//!     RENCI-DTN:
//!       stitch_port: HundredGigE0/0/0/5
//!       description: RENCI data transfer node
//!       vlan_range: "2001"
//!       mtu: 9000
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(thiserror::Error, Debug)]
pub enum OverrideError {
    #[error("Could not read overrides from {path}: {error}")]
    CouldNotRead {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("Invalid JSON in overrides file {path}: {error}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },
    #[error("Invalid YAML in overrides file {path}: {error}")]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },
}

/// Capacities to force on a named node. Sizes are in GB.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CapacityOverride {
    #[serde(default)]
    pub ram: Option<u64>,
    #[serde(default)]
    pub cpu: Option<u64>,
    #[serde(default)]
    pub core: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
}

/// A dataplane switch port that connects the site to an outside network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct StitchPort {
    pub port: String,
    /// Description of what sits on the other end.
    #[serde(default)]
    pub peer: Option<String>,
    #[serde(default)]
    pub vlan_range: Option<String>,
    #[serde(default)]
    pub mtu: Option<u64>,
    #[serde(default)]
    pub bandwidth: Option<u64>,
}

/// A facility hanging off a stitch port.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FacilityPort {
    #[serde(default)]
    pub stitch_port: Option<String>,
    /// Carried onto the facility port as its details.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vlan_range: Option<String>,
    #[serde(default)]
    pub ipv4_net: Option<String>,
    #[serde(default)]
    pub ipv6_net: Option<String>,
    #[serde(default)]
    pub local_device: Option<String>,
    #[serde(default)]
    pub local_port: Option<String>,
    #[serde(default)]
    pub mtu: Option<u64>,
    #[serde(default)]
    pub bandwidth: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct DpSwitchAlias {
    /// Name the dataplane switch should be advertised under.
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SiteOverrides {
    #[serde(default)]
    pub dp_switch: Option<DpSwitchAlias>,
    #[serde(default)]
    pub nodes: BTreeMap<String, CapacityOverride>,
    #[serde(default)]
    pub stitch_ports: Vec<StitchPort>,
    #[serde(default)]
    pub facility_ports: BTreeMap<String, FacilityPort>,
}

impl SiteOverrides {
    /// Whether the site declares ports that need the dataplane switch.
    pub fn declares_stitching(&self) -> bool {
        !self.stitch_ports.is_empty() || !self.facility_ports.is_empty()
    }
}

/// Overrides for every site, keyed by upper-case site name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StaticOverrides(BTreeMap<String, SiteOverrides>);

impl StaticOverrides {
    /// Load overrides from a `.yaml`/`.yml` or JSON file. A missing file is
    /// logged and treated as empty.
    pub fn load(path: &Path) -> Result<Self, OverrideError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Overrides file not found, continuing without overrides");
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(OverrideError::CouldNotRead {
                    path: path.to_path_buf(),
                    error,
                });
            }
        };

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_str(&text).map_err(|error| OverrideError::InvalidYaml {
                path: path.to_path_buf(),
                error,
            })
        } else {
            Self::from_json_str(&text).map_err(|error| OverrideError::InvalidJson {
                path: path.to_path_buf(),
                error,
            })
        }
    }

    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn site(&self, name: &str) -> Option<&SiteOverrides> {
        self.0.get(&name.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const YAML: &str = r#"
LBNL:
  dp_switch:
    name: lbnl-data-sw
  nodes:
    lbnl-w1.fabric-testbed.net: { ram: 768, disk: 2000 }
  stitch_ports:
    - port: HundredGigE0/0/0/5
      peer: "AL2S agg3.ashb HundredGigE0/0/0/1"
      vlan_range: "2000-2100"
  facility_ports:
    RENCI-DTN:
      stitch_port: HundredGigE0/0/0/5
      description: RENCI data transfer node
      vlan_range: "2001"
      mtu: 9000
"#;

    #[test]
    fn test_parse_yaml_overrides() {
        let overrides = StaticOverrides::from_yaml_str(YAML).unwrap();
        let site = overrides.site("lbnl").unwrap();
        assert_eq!(site.dp_switch.as_ref().unwrap().name, "lbnl-data-sw");
        assert_eq!(
            site.nodes["lbnl-w1.fabric-testbed.net"],
            CapacityOverride {
                ram: Some(768),
                disk: Some(2000),
                ..Default::default()
            }
        );
        let dtn = &site.facility_ports["RENCI-DTN"];
        assert_eq!(dtn.mtu, Some(9000));
        assert_eq!(dtn.description.as_deref(), Some("RENCI data transfer node"));
        assert!(site.declares_stitching());
        assert!(overrides.site("STAR").is_none());
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"STAR": {{"nodes": {{"star-w1": {{"core": 32}}}}}}}}"#
        )
        .unwrap();
        let overrides = StaticOverrides::load(file.path()).unwrap();
        let site = overrides.site("star").unwrap();
        assert_eq!(site.nodes["star-w1"].core, Some(32));
        assert!(!site.declares_stitching());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = StaticOverrides::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(overrides, StaticOverrides::default());
    }

    #[test]
    fn test_load_malformed_yaml_fails() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        write!(file, "LBNL: [unterminated").unwrap();
        assert!(matches!(
            StaticOverrides::load(file.path()),
            Err(OverrideError::InvalidYaml { .. })
        ));
    }
}
