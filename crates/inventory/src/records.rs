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

//! Records of one site as handed over by the retrieval layer. Vendor field
//! names have already been mapped onto these structures.

use std::net::Ipv4Addr;

use serde::{Deserialize, Deserializer, Serialize};
use substrate_network::{VlanId, VlanRangeSet};

use crate::describe::{PortField, derive_nvme_fields};
use crate::port::PortRecord;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model: String,
    #[serde(default)]
    pub ram: Option<String>,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub core: Option<u32>,
    #[serde(default)]
    pub disk: Option<String>,
}

/// An NVMe drive. When loaded, any of `bdf`, `model` and `disk` missing from
/// the record is derived from `description`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NvmeRecord {
    pub serial: String,
    pub description: String,
    pub bdf: String,
    pub model: String,
    /// Size as written by inventory, e.g. `1TB`.
    pub disk: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("NVMe drive {serial} has no {field} and its description does not name one")]
pub struct NvmeFieldError {
    pub serial: String,
    pub field: PortField,
}

#[derive(Deserialize)]
struct RawNvmeRecord {
    serial: String,
    description: String,
    #[serde(default)]
    bdf: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    disk: Option<String>,
}

impl RawNvmeRecord {
    fn complete(self) -> Result<NvmeRecord, NvmeFieldError> {
        let mut fields = derive_nvme_fields(&self.description);
        let mut pick = |given: Option<String>, field: PortField| {
            given
                .or_else(|| fields.take(field))
                .ok_or_else(|| NvmeFieldError {
                    serial: self.serial.clone(),
                    field,
                })
        };
        let bdf = pick(self.bdf, PortField::Bdf)?;
        let model = pick(self.model, PortField::Model)?;
        let disk = pick(self.disk, PortField::Disk)?;
        Ok(NvmeRecord {
            serial: self.serial,
            description: self.description,
            bdf,
            model,
            disk,
        })
    }
}

impl NvmeRecord {
    /// Build a drive out of its serial number and inventory description.
    pub fn from_description(serial: &str, description: &str) -> Result<Self, NvmeFieldError> {
        RawNvmeRecord {
            serial: serial.to_string(),
            description: description.to_string(),
            bdf: None,
            model: None,
            disk: None,
        }
        .complete()
    }
}

impl<'de> Deserialize<'de> for NvmeRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawNvmeRecord::deserialize(deserializer)?
            .complete()
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuRecord {
    pub model: String,
    #[serde(default)]
    pub description: String,
    pub bdf: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpgaRecord {
    pub model: String,
    #[serde(default)]
    pub description: String,
    pub bdf: String,
    pub serial: String,
    #[serde(default)]
    pub usb_id: Option<String>,
    /// Dataplane switch ports the FPGA is cabled to.
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub numa: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub name: String,
    pub serial: String,
    #[serde(default)]
    pub model: Option<ModelRecord>,
    #[serde(default)]
    pub ports: Vec<PortRecord>,
    #[serde(default)]
    pub nvme: Vec<NvmeRecord>,
    #[serde(default)]
    pub gpus: Vec<GpuRecord>,
    #[serde(default)]
    pub fpgas: Vec<FpgaRecord>,
    /// Addressed interfaces outside the inventoried cards.
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub name: String,
    pub serial: String,
    #[serde(default)]
    pub model: Option<ModelRecord>,
}

/// A switch known to inventory. `ports` is only used for a P4 switch, where
/// it lists the card ports facing the dataplane switch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub name: String,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub mgmt_ip: Option<Ipv4Addr>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub ports: Vec<PortRecord>,
}

/// An interface reported by a network controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub name: String,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub ipv4: Option<Ipv4Addr>,
    /// Dotted-decimal or prefix length.
    #[serde(default)]
    pub netmask: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub mtu: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRecord {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
}

/// A port on an exchange switch whose VLAN availability is advertised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub device: String,
    pub interface: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Capacity in Mbps.
    #[serde(default)]
    pub capacity_mbps: Option<u64>,
    /// Cloud provider name for cloud-connect ports.
    #[serde(default)]
    pub provider: Option<String>,
    /// VLANs delegated to this port. Takes precedence over the provider
    /// space when present.
    #[serde(default)]
    pub delegations: Option<VlanRangeSet>,
    #[serde(default)]
    pub in_use: Vec<VlanId>,
    #[serde(default)]
    pub region: Option<String>,
}

/// A link confirmed by a network controller, identified by the IPv4
/// addresses of its two ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerLink {
    pub local: Ipv4Addr,
    pub remote: Ipv4Addr,
}

/// Everything retrieved for one site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecords {
    pub site: String,
    #[serde(default)]
    pub workers: Vec<WorkerRecord>,
    #[serde(default)]
    pub storage: Option<StorageRecord>,
    #[serde(default)]
    pub dp_switch: Option<SwitchRecord>,
    #[serde(default)]
    pub p4_switch: Option<SwitchRecord>,
    #[serde(default)]
    pub routers: Vec<RouterRecord>,
    #[serde(default)]
    pub endpoints: Vec<EndpointRecord>,
    /// When present, link inference uses exactly these links.
    #[serde(default)]
    pub controller_links: Option<Vec<ControllerLink>>,
}
