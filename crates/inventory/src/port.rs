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
use std::str::FromStr;

use mac_address::MacAddress;
use serde::{Deserialize, Serialize};

use crate::describe::{PortField, derive_port_fields};

/// Slot id assigned to physical functions whose description does not name a
/// slot.
pub const SENTINEL_SLOT: &str = "0";

/// Connection strings of usable card ports name the site's dataplane switch.
const DATAPLANE_SWITCH_MARKER: &str = "data-sw";

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum PortRole {
    PhysicalFunction,
    VirtualFunction,
}

/// One NIC port discovered on a server. For a virtual function `bdf` is the
/// BDF of the parent physical function and `vbdf` is the function's own BDF.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    pub role: PortRole,
    pub mac: String,
    pub bdf: String,
    #[serde(default)]
    pub vbdf: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub connection: String,
    #[serde(default)]
    pub peer_port: Option<String>,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub numa: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub vlan: Option<String>,
}

impl PortRecord {
    /// Build a port out of the raw strings inventory keeps for it. Returns
    /// `None` for ports that are not cabled to the dataplane switch or whose
    /// description carries no BDF.
    pub fn from_descriptions(
        mac: &str,
        speed: Option<&str>,
        description: &str,
        connection: &str,
    ) -> Option<Self> {
        if !connection.contains(DATAPLANE_SWITCH_MARKER) {
            tracing::debug!(%mac, %connection, "Port is not connected to a dataplane switch");
            return None;
        }
        let mut fields = derive_port_fields(description, connection);
        let bdf = fields.take(PortField::Bdf)?;
        let vbdf = fields.take(PortField::Vbdf);
        let role = if vbdf.is_some() {
            PortRole::VirtualFunction
        } else {
            PortRole::PhysicalFunction
        };

        Some(Self {
            role,
            mac: normalize_mac(mac),
            bdf,
            vbdf,
            description: description.to_string(),
            connection: connection.to_string(),
            peer_port: fields.take(PortField::PeerPort),
            slot: fields.take(PortField::Slot),
            model: fields.take(PortField::Model),
            numa: fields.take(PortField::Numa),
            speed: speed.map(str::to_string),
            vlan: fields.take(PortField::Vlan),
        })
    }

    pub fn is_virtual(&self) -> bool {
        self.role == PortRole::VirtualFunction
    }

    /// The slot this port sits in, or [`SENTINEL_SLOT`] when unknown.
    pub fn slot_or_sentinel(&self) -> &str {
        self.slot.as_deref().unwrap_or(SENTINEL_SLOT)
    }

    /// The BDF that identifies this port on its own: the vBDF for virtual
    /// functions, the BDF otherwise.
    pub fn own_bdf(&self) -> &str {
        match (&self.role, &self.vbdf) {
            (PortRole::VirtualFunction, Some(vbdf)) => vbdf.as_str(),
            _ => self.bdf.as_str(),
        }
    }
}

/// Canonical colon-separated upper-case form, or the input unchanged if it is
/// not a MAC address.
fn normalize_mac(mac: &str) -> String {
    match MacAddress::from_str(mac.trim()) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => mac.to_string(),
    }
}
