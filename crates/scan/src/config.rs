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
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use topology::{LinkMode, SynthesisOptions};

const DEFAULT_RECORDS_PATH: &str = "records.json";
const DEFAULT_OUTPUT_PATH: &str = "topology.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Only synthesize this site when the records hold several.
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub postal_address: Option<String>,
    #[serde(default = "Defaults::records_path")]
    pub records_path: PathBuf,
    #[serde(default)]
    pub overrides_path: Option<PathBuf>,
    #[serde(default = "Defaults::output_path")]
    pub output_path: PathBuf,
    #[serde(default = "Defaults::dedicated_vlan_range")]
    pub dedicated_vlan_range: String,
    #[serde(default)]
    pub link_mode: LinkMode,
}

pub struct Defaults;

impl Defaults {
    pub fn records_path() -> PathBuf {
        DEFAULT_RECORDS_PATH.into()
    }
    pub fn output_path() -> PathBuf {
        DEFAULT_OUTPUT_PATH.into()
    }
    pub fn dedicated_vlan_range() -> String {
        topology::synthesizer::DEFAULT_DEDICATED_VLAN_RANGE.to_string()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {path}: {error}")]
    CouldNotRead { path: String, error: std::io::Error },
    #[error("Invalid TOML in config file: {path}: {error}")]
    InvalidToml {
        path: String,
        error: toml::de::Error,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: None,
            postal_address: None,
            records_path: Defaults::records_path(),
            overrides_path: None,
            output_path: Defaults::output_path(),
            dedicated_vlan_range: Defaults::dedicated_vlan_range(),
            link_mode: LinkMode::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            postal_address: self.postal_address.clone(),
            dedicated_vlan_range: self.dedicated_vlan_range.clone(),
            link_mode: self.link_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
site = "LBNL"
records_path = "/var/lib/substrate/lbnl.json"
link_mode = "subnet"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.site.as_deref(), Some("LBNL"));
        assert_eq!(
            config.records_path,
            PathBuf::from("/var/lib/substrate/lbnl.json")
        );
        assert_eq!(config.link_mode, LinkMode::Subnet);
        assert_eq!(config.output_path, Defaults::output_path());
        assert_eq!(config.dedicated_vlan_range, "1-4095");
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/substrate.toml"));
        assert!(matches!(missing, Err(ConfigError::CouldNotRead { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "link_mode = \"sideways\"").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::InvalidToml { .. })
        ));
    }
}
