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

//! The interface topology synthesis drives to build a graph. Handles returned
//! by one call are threaded into later calls; their representation belongs to
//! the implementation.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[allow(clippy::upper_case_acronyms)]
pub enum NodeType {
    Server,
    NAS,
    Switch,
    Router,
    Facility,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[allow(clippy::upper_case_acronyms)]
pub enum ServiceType {
    MPLS,
    L3VPN,
    VLAN,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
pub enum InterfaceType {
    TrunkPort,
    DedicatedPort,
    SharedPort,
    FacilityPort,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[allow(clippy::upper_case_acronyms)]
pub enum ComponentType {
    SharedNIC,
    SmartNIC,
    NVME,
    GPU,
    FPGA,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
pub enum LinkType {
    /// A cable between a card port and a switch port.
    Patch,
    /// A layer 2 path between two network devices.
    L2Path,
}

/// Quantities attached to graph objects. Sizes are in GB, bandwidth in Gbps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bw: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u64>,
}

impl Capacities {
    pub fn units(unit: u64) -> Self {
        Self {
            unit: Some(unit),
            ..Default::default()
        }
    }

    /// Fields set in `other` replace the ones in `self`.
    pub fn merge(self, other: Capacities) -> Self {
        Self {
            unit: other.unit.or(self.unit),
            cpu: other.cpu.or(self.cpu),
            core: other.core.or(self.core),
            ram: other.ram.or(self.ram),
            disk: other.disk.or(self.disk),
            bw: other.bw.or(self.bw),
            mtu: other.mtu.or(self.mtu),
        }
    }
}

/// Identifying and addressing attributes. `mac`, `bdf` and `vlan` are lists
/// because a shared NIC port carries one entry per virtual function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mac: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bdf: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vlan: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Labels {
    pub fn is_empty(&self) -> bool {
        *self == Labels::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: String,
    pub node_type: NodeType,
    pub model: Option<String>,
    pub site: String,
    pub serial: Option<String>,
    pub location: Option<String>,
    pub capacities: Capacities,
    pub labels: Labels,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub name: String,
    pub interface_type: InterfaceType,
    pub details: Option<String>,
    pub labels: Labels,
    pub capacities: Capacities,
}

impl InterfaceSpec {
    pub fn new(name: impl Into<String>, interface_type: InterfaceType) -> Self {
        Self {
            name: name.into(),
            interface_type,
            details: None,
            labels: Labels::default(),
            capacities: Capacities::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentSpec {
    pub name: String,
    pub component_type: ComponentType,
    pub model: Option<String>,
    pub details: Option<String>,
    pub interfaces: Vec<InterfaceSpec>,
    pub capacities: Capacities,
    pub labels: Labels,
}

/// A graph that topology synthesis can populate.
pub trait GraphBuilder {
    type Node: Copy + Eq + Hash + Debug;
    type Service: Copy + Eq + Hash + Debug;
    type Interface: Copy + Eq + Hash + Debug;
    type Component: Copy + Eq + Hash + Debug;
    type Link: Copy + Eq + Hash + Debug;
    type Facility: Copy + Eq + Hash + Debug;

    fn add_node(&mut self, spec: NodeSpec) -> Result<Self::Node, GraphError>;

    fn add_network_service(
        &mut self,
        node: Self::Node,
        name: &str,
        service_type: ServiceType,
        labels: Labels,
    ) -> Result<Self::Service, GraphError>;

    fn add_interface(
        &mut self,
        service: Self::Service,
        spec: InterfaceSpec,
    ) -> Result<Self::Interface, GraphError>;

    /// Adds a component together with one interface per entry of
    /// `spec.interfaces`.
    fn add_component(
        &mut self,
        node: Self::Node,
        spec: ComponentSpec,
    ) -> Result<Self::Component, GraphError>;

    /// Links two interfaces. An interface takes at most one `Patch` link,
    /// while `L2Path` links may share an interface.
    fn add_link(
        &mut self,
        name: &str,
        link_type: LinkType,
        interfaces: [Self::Interface; 2],
        capacities: Capacities,
    ) -> Result<Self::Link, GraphError>;

    /// Adds a facility with a single facility port carrying `details`,
    /// `labels` and `capacities`.
    fn add_facility(
        &mut self,
        name: &str,
        site: &str,
        details: Option<String>,
        labels: Labels,
        capacities: Capacities,
    ) -> Result<Self::Facility, GraphError>;

    /// Interfaces of a component, in the order they were given.
    fn component_interfaces(
        &self,
        component: Self::Component,
    ) -> Result<Vec<Self::Interface>, GraphError>;

    fn facility_interface(&self, facility: Self::Facility) -> Result<Self::Interface, GraphError>;

    fn find_node(&self, name: &str) -> Option<Self::Node>;

    fn node_capacities(&self, node: Self::Node) -> Result<Capacities, GraphError>;

    fn set_node_capacities(
        &mut self,
        node: Self::Node,
        capacities: Capacities,
    ) -> Result<(), GraphError>;

    fn rename_node(&mut self, node: Self::Node, name: &str) -> Result<(), GraphError>;

    fn set_node_labels(&mut self, node: Self::Node, labels: Labels) -> Result<(), GraphError>;
}
