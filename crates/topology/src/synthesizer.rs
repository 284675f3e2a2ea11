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
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use inventory::{
    CardGroup, CardKind, EndpointRecord, InterfaceRecord, PortHierarchyOrganizer, PortRecord,
    RouterRecord, SiteRecords, SwitchRecord, UnitPrefix, WorkerRecord, parse_size_spec,
    parse_speed_spec,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use substrate_network::{Ipv4Netmask, VlanRangeSet, VlanSpace, format_ranges};

use crate::builder::{
    Capacities, ComponentSpec, ComponentType, GraphBuilder, InterfaceSpec, InterfaceType, Labels,
    LinkType, NodeSpec, NodeType, ServiceType,
};
use crate::error::{SynthesisError, SynthesisResult};
use crate::links::{AddressedInterface, AuthoritativeLinkSet, LinkInferenceEngine};
use crate::overrides::SiteOverrides;

/// Label advertised on ports of dedicated cards unless configured otherwise.
pub const DEFAULT_DEDICATED_VLAN_RANGE: &str = "1-4095";

/// ASN of the layer 3 VPN service on the exchange node.
pub const EXCHANGE_ASN: &str = "398900";

/// How interface links are inferred.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::EnumString,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LinkMode {
    /// Pair interfaces on the same IPv4 subnet.
    Subnet,
    /// Only controller-reported links count. Fails if the records carry none.
    Authoritative,
    /// Controller links when the records carry them, subnets otherwise.
    #[default]
    Auto,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub postal_address: Option<String>,
    pub dedicated_vlan_range: String,
    pub link_mode: LinkMode,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            postal_address: None,
            dedicated_vlan_range: DEFAULT_DEDICATED_VLAN_RANGE.to_string(),
            link_mode: LinkMode::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisSummary {
    pub nodes: usize,
    pub shared_cards: usize,
    pub dedicated_cards: usize,
    pub patch_links: usize,
    pub inferred_links: usize,
    pub facilities: usize,
    pub exchange_ports: usize,
}

/// State owned by one synthesis run. Runs that share a context number their
/// links as one sequence.
#[derive(Debug, Default)]
pub struct SynthesisContext {
    link_index: usize,
    pub summary: SynthesisSummary,
}

impl SynthesisContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_link_name(&mut self) -> String {
        self.link_index += 1;
        format!("l{}", self.link_index)
    }
}

struct Build<'c, G: GraphBuilder> {
    graph: G,
    ctx: &'c mut SynthesisContext,
    location: Option<String>,
    dedicated_vlan_range: String,
    /// Switch ports named by card ports, with the card interface facing them.
    patch_targets: Vec<(String, G::Interface)>,
    engine: LinkInferenceEngine<G::Interface>,
    dp_switch: Option<(G::Node, G::Service)>,
    dp_ports: HashMap<String, G::Interface>,
    /// Dataplane switch ports that already carry a patch link.
    patched_ports: HashSet<String>,
    exchange_ports: HashMap<String, G::Interface>,
}

impl<G: GraphBuilder> Build<'_, G> {
    fn add_node(&mut self, spec: NodeSpec) -> SynthesisResult<G::Node> {
        let node = self.graph.add_node(spec)?;
        self.ctx.summary.nodes += 1;
        Ok(node)
    }

    fn add_link(
        &mut self,
        link_type: LinkType,
        interfaces: [G::Interface; 2],
    ) -> SynthesisResult<G::Link> {
        let name = self.ctx.next_link_name();
        Ok(self
            .graph
            .add_link(&name, link_type, interfaces, Capacities::default())?)
    }

    /// The dataplane switch port called `name`, created on first use.
    fn dp_port(&mut self, name: &str) -> SynthesisResult<Option<G::Interface>> {
        if let Some(port) = self.dp_ports.get(name) {
            return Ok(Some(*port));
        }
        let Some((_, service)) = self.dp_switch else {
            return Ok(None);
        };
        let mut spec = InterfaceSpec::new(name, InterfaceType::TrunkPort);
        spec.labels.local_name = Some(name.to_string());
        let port = self.graph.add_interface(service, spec)?;
        self.dp_ports.insert(name.to_string(), port);
        Ok(Some(port))
    }

    fn add_patch_target(&mut self, node: &str, peer: Option<&str>, interface: G::Interface) {
        let Some(peer) = peer else {
            tracing::warn!(%node, "Card port has no switch peer, it will not be patched");
            return;
        };
        if self.patch_targets.iter().any(|(name, _)| name == peer) {
            tracing::warn!(%node, %peer, "Switch port is already patched to another card port");
            return;
        }
        self.patch_targets.push((peer.to_string(), interface));
    }

    /// A port a facility can attach to: a dataplane switch port, or an
    /// exchange port named either `device:interface` or just `interface`
    /// when that is unique.
    fn resolve_stitch_port(&self, name: &str) -> Option<G::Interface> {
        if let Some(port) = self.dp_ports.get(name).or_else(|| self.exchange_ports.get(name)) {
            return Some(*port);
        }
        let suffix = format!(":{name}");
        self.exchange_ports
            .iter()
            .filter(|(key, _)| key.ends_with(&suffix))
            .map(|(_, port)| *port)
            .exactly_one()
            .ok()
    }
}

fn size_gb(node: &str, field: &'static str, value: Option<&str>) -> SynthesisResult<u64> {
    let value = value.ok_or_else(|| SynthesisError::FatalField {
        node: node.to_string(),
        field,
    })?;
    parse_size_spec(value)
        .map(|q| q.whole(UnitPrefix::G))
        .map_err(|source| SynthesisError::Spec {
            node: node.to_string(),
            source,
        })
}

fn bandwidth_gbps(node: &str, speed: Option<&str>) -> SynthesisResult<Option<u64>> {
    speed
        .map(|s| parse_speed_spec(s).map(|q| q.whole(UnitPrefix::G)))
        .transpose()
        .map_err(|source| SynthesisError::Spec {
            node: node.to_string(),
            source,
        })
}

/// A single VLAN becomes a `vlan` label, anything else a `vlan_range`.
fn vlan_labels(node: &str, vlan_range: Option<&str>) -> SynthesisResult<Labels> {
    let Some(text) = vlan_range else {
        return Ok(Labels::default());
    };
    let vlans = VlanRangeSet::from_str(text).map_err(|source| SynthesisError::VlanRange {
        node: node.to_string(),
        source,
    })?;
    Ok(match vlans.as_single() {
        Some(vlan) => Labels {
            vlan: vec![vlan.to_string()],
            ..Default::default()
        },
        None => Labels {
            vlan_range: Some(vlans.to_string()),
            ..Default::default()
        },
    })
}

/// Builds the substrate topology of one site.
///
/// The graph is handed in and handed back on success. On error it is
/// dropped, so a caller never sees a partially built topology.
pub struct TopologySynthesizer<'a> {
    records: &'a SiteRecords,
    options: &'a SynthesisOptions,
    overrides: Option<&'a SiteOverrides>,
}

impl<'a> TopologySynthesizer<'a> {
    pub fn new(records: &'a SiteRecords, options: &'a SynthesisOptions) -> Self {
        Self {
            records,
            options,
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: Option<&'a SiteOverrides>) -> Self {
        self.overrides = overrides;
        self
    }

    fn site(&self) -> &str {
        &self.records.site
    }

    pub fn synthesize<G: GraphBuilder>(
        &self,
        graph: G,
        ctx: &mut SynthesisContext,
    ) -> SynthesisResult<G> {
        tracing::info!(site = %self.site(), "Synthesizing substrate topology");

        let dedicated_vlan_range = VlanRangeSet::from_str(&self.options.dedicated_vlan_range)
            .map_err(|source| SynthesisError::VlanRange {
                node: self.site().to_string(),
                source,
            })?
            .to_string();
        if self.options.postal_address.is_none() {
            tracing::warn!(site = %self.site(), "No postal address for site, nodes will have no location");
        }

        let mut build = Build {
            graph,
            ctx,
            location: self.options.postal_address.clone(),
            dedicated_vlan_range,
            patch_targets: Vec::new(),
            engine: LinkInferenceEngine::new(),
            dp_switch: None,
            dp_ports: HashMap::new(),
            patched_ports: HashSet::new(),
            exchange_ports: HashMap::new(),
        };

        for worker in &self.records.workers {
            self.add_server(&mut build, worker)?;
        }
        self.add_storage(&mut build)?;
        self.add_dp_switch(&mut build)?;
        self.add_p4_switch(&mut build)?;
        for router in &self.records.routers {
            self.add_router(&mut build, router)?;
        }
        self.add_exchange(&mut build)?;
        self.infer_links(&mut build)?;
        if let Some(overrides) = self.overrides {
            self.apply_overrides(&mut build, overrides)?;
        }

        tracing::info!(site = %self.site(), summary = ?build.ctx.summary, "Substrate topology synthesized");
        Ok(build.graph)
    }

    fn add_server<G: GraphBuilder>(
        &self,
        build: &mut Build<'_, G>,
        worker: &WorkerRecord,
    ) -> SynthesisResult<()> {
        let name = worker.name.as_str();
        let model = worker
            .model
            .as_ref()
            .ok_or_else(|| SynthesisError::FatalField {
                node: name.to_string(),
                field: "model",
            })?;
        let capacities = Capacities {
            unit: Some(1),
            cpu: model.cpu.map(u64::from),
            core: model.core.map(u64::from),
            ram: Some(size_gb(name, "ram", model.ram.as_deref())?),
            disk: Some(size_gb(name, "disk", model.disk.as_deref())?),
            ..Default::default()
        };
        let node = build.add_node(NodeSpec {
            name: name.to_string(),
            node_type: NodeType::Server,
            model: Some(model.model.clone()),
            site: self.site().to_string(),
            serial: Some(worker.serial.clone()),
            location: build.location.clone(),
            capacities,
            labels: Labels::default(),
        })?;

        for (index, nvme) in worker.nvme.iter().enumerate() {
            build.graph.add_component(
                node,
                ComponentSpec {
                    name: format!("{name}-nvme{}", index + 1),
                    component_type: ComponentType::NVME,
                    model: Some(nvme.model.clone()),
                    details: Some(nvme.description.clone()),
                    interfaces: Vec::new(),
                    capacities: Capacities {
                        unit: Some(1),
                        disk: Some(size_gb(name, "disk", Some(nvme.disk.as_str()))?),
                        ..Default::default()
                    },
                    labels: Labels {
                        bdf: vec![nvme.bdf.clone()],
                        ..Default::default()
                    },
                },
            )?;
        }

        for (index, gpu) in worker.gpus.iter().enumerate() {
            build.graph.add_component(
                node,
                ComponentSpec {
                    name: format!("{name}-gpu{}", index + 1),
                    component_type: ComponentType::GPU,
                    model: Some(gpu.model.clone()),
                    details: Some(gpu.description.clone()),
                    interfaces: Vec::new(),
                    capacities: Capacities::units(1),
                    labels: Labels {
                        bdf: vec![gpu.bdf.clone()],
                        ..Default::default()
                    },
                },
            )?;
        }

        for (index, fpga) in worker.fpgas.iter().enumerate() {
            if fpga.ports.is_empty() {
                tracing::warn!(node = %name, fpga = %fpga.serial, "FPGA has no dataplane ports");
            }
            let interfaces = (1..=fpga.ports.len())
                .map(|port| InterfaceSpec::new(format!("p{port}"), InterfaceType::DedicatedPort))
                .collect();
            let component = build.graph.add_component(
                node,
                ComponentSpec {
                    name: format!("{name}-fpga{}", index + 1),
                    component_type: ComponentType::FPGA,
                    model: Some(fpga.model.clone()),
                    details: Some(fpga.description.clone()),
                    interfaces,
                    capacities: Capacities::units(1),
                    labels: Labels {
                        bdf: vec![fpga.bdf.clone()],
                        numa: fpga.numa.clone(),
                        ..Default::default()
                    },
                },
            )?;
            let ports = build.graph.component_interfaces(component)?;
            for (peer, interface) in fpga.ports.iter().zip(ports) {
                build.add_patch_target(name, Some(peer.as_str()), interface);
            }
        }

        if !worker.interfaces.is_empty() {
            let service = build.graph.add_network_service(
                node,
                &format!("{name}-ns"),
                ServiceType::MPLS,
                Labels::default(),
            )?;
            self.add_addressed_interfaces(build, name, service, &worker.interfaces)?;
        }

        self.add_cards(build, node, worker)
    }

    fn add_cards<G: GraphBuilder>(
        &self,
        build: &mut Build<'_, G>,
        node: G::Node,
        worker: &WorkerRecord,
    ) -> SynthesisResult<()> {
        let name = worker.name.as_str();
        let organizer_error = |source| SynthesisError::Organizer {
            node: name.to_string(),
            source,
        };

        let mut organizer = PortHierarchyOrganizer::new();
        for port in &worker.ports {
            organizer.add(port).map_err(organizer_error)?;
        }
        organizer.organize().map_err(organizer_error)?;

        for group in organizer.card_groups().map_err(organizer_error)? {
            match group.kind {
                CardKind::Shared => self.add_shared_card(build, node, name, &group, &organizer)?,
                CardKind::Dedicated => self.add_dedicated_card(build, node, name, &group)?,
            }
        }
        Ok(())
    }

    /// One SharedNIC component per slot, with an interface per physical
    /// function listing the function's VFs.
    fn add_shared_card<G: GraphBuilder>(
        &self,
        build: &mut Build<'_, G>,
        node: G::Node,
        name: &str,
        group: &CardGroup<'_>,
        organizer: &PortHierarchyOrganizer<'_>,
    ) -> SynthesisResult<()> {
        let organizer_error = |source| SynthesisError::Organizer {
            node: name.to_string(),
            source,
        };

        let mut interfaces = Vec::with_capacity(group.ports.len());
        let mut peers = Vec::with_capacity(group.ports.len());
        let mut child_bdfs = Vec::new();
        let mut units = 0;
        for (index, pf) in group.ports.iter().enumerate() {
            let vfs = organizer.vfs_of_parent(&pf.bdf).map_err(organizer_error)?;
            let labels = Labels {
                mac: vfs.iter().map(|vf| vf.mac.clone()).collect(),
                bdf: vfs.iter().map(|vf| vf.own_bdf().to_string()).collect(),
                vlan: vfs.iter().filter_map(|vf| vf.vlan.clone()).collect(),
                numa: pf.numa.clone(),
                ..Default::default()
            };
            child_bdfs.extend(labels.bdf.iter().cloned());
            units += vfs.len() as u64;

            // VF records carry no switch port of their own
            let peer = match vfs.first() {
                Some(vf) => organizer
                    .parent_of_vf(vf.own_bdf())
                    .map_err(organizer_error)?
                    .and_then(|parent| parent.peer_port.clone()),
                None => pf.peer_port.clone(),
            };
            peers.push(peer);

            interfaces.push(InterfaceSpec {
                name: format!("p{}", index + 1),
                interface_type: InterfaceType::SharedPort,
                details: None,
                labels,
                capacities: Capacities {
                    bw: bandwidth_gbps(name, pf.speed.as_deref())?,
                    ..Default::default()
                },
            });
        }

        let component = build.graph.add_component(
            node,
            ComponentSpec {
                name: format!("{name}-slot{}", group.slot),
                component_type: ComponentType::SharedNIC,
                model: card_model(group),
                details: card_details(group),
                interfaces,
                capacities: Capacities::units(units),
                labels: Labels {
                    bdf: child_bdfs,
                    ..Default::default()
                },
            },
        )?;
        build.ctx.summary.shared_cards += 1;

        let ports = build.graph.component_interfaces(component)?;
        for (peer, interface) in peers.into_iter().zip(ports) {
            build.add_patch_target(name, peer.as_deref(), interface);
        }
        Ok(())
    }

    /// One SmartNIC component per slot, each port open to the configured
    /// VLAN range.
    fn add_dedicated_card<G: GraphBuilder>(
        &self,
        build: &mut Build<'_, G>,
        node: G::Node,
        name: &str,
        group: &CardGroup<'_>,
    ) -> SynthesisResult<()> {
        let interfaces = group
            .ports
            .iter()
            .enumerate()
            .map(|(index, pf)| {
                Ok(InterfaceSpec {
                    name: format!("p{}", index + 1),
                    interface_type: InterfaceType::DedicatedPort,
                    details: None,
                    labels: Labels {
                        mac: vec![pf.mac.clone()],
                        vlan_range: Some(build.dedicated_vlan_range.clone()),
                        numa: pf.numa.clone(),
                        ..Default::default()
                    },
                    capacities: Capacities {
                        bw: bandwidth_gbps(name, pf.speed.as_deref())?,
                        ..Default::default()
                    },
                })
            })
            .collect::<SynthesisResult<Vec<_>>>()?;

        let component = build.graph.add_component(
            node,
            ComponentSpec {
                name: format!("{name}-slot{}", group.slot),
                component_type: ComponentType::SmartNIC,
                model: card_model(group),
                details: card_details(group),
                interfaces,
                capacities: Capacities::units(1),
                labels: Labels {
                    bdf: group.ports.iter().map(|pf| pf.bdf.clone()).collect(),
                    ..Default::default()
                },
            },
        )?;
        build.ctx.summary.dedicated_cards += 1;

        let ports = build.graph.component_interfaces(component)?;
        for (pf, interface) in group.ports.iter().zip(ports) {
            build.add_patch_target(name, pf.peer_port.as_deref(), interface);
        }
        Ok(())
    }

    fn add_storage<G: GraphBuilder>(&self, build: &mut Build<'_, G>) -> SynthesisResult<()> {
        let Some(storage) = &self.records.storage else {
            tracing::warn!(site = %self.site(), "No storage found for site, continuing");
            return Ok(());
        };
        let name = storage.name.as_str();
        let model = storage
            .model
            .as_ref()
            .ok_or_else(|| SynthesisError::FatalField {
                node: name.to_string(),
                field: "model",
            })?;
        build.add_node(NodeSpec {
            name: name.to_string(),
            node_type: NodeType::NAS,
            model: Some(model.model.clone()),
            site: self.site().to_string(),
            serial: Some(storage.serial.clone()),
            location: build.location.clone(),
            capacities: Capacities {
                unit: Some(1),
                disk: Some(size_gb(name, "disk", model.disk.as_deref())?),
                ..Default::default()
            },
            labels: Labels::default(),
        })?;
        Ok(())
    }

    /// The dataplane switch, with a trunk port and a patch link for every
    /// card port cabled to it.
    fn add_dp_switch<G: GraphBuilder>(&self, build: &mut Build<'_, G>) -> SynthesisResult<()> {
        let required = !build.patch_targets.is_empty()
            || self.overrides.is_some_and(SiteOverrides::declares_stitching);
        let Some(switch) = &self.records.dp_switch else {
            if required {
                return Err(SynthesisError::FatalField {
                    node: self.site().to_string(),
                    field: "dp_switch",
                });
            }
            tracing::warn!(site = %self.site(), "No dataplane switch found for site, continuing");
            return Ok(());
        };

        let node = build.add_node(NodeSpec {
            name: switch.name.clone(),
            node_type: NodeType::Switch,
            model: switch.model.clone(),
            site: self.site().to_string(),
            serial: switch.serial.clone(),
            location: build.location.clone(),
            capacities: Capacities::default(),
            labels: switch_labels(switch),
        })?;
        let service = build.graph.add_network_service(
            node,
            &format!("{}-ns", switch.name),
            ServiceType::MPLS,
            Labels::default(),
        )?;
        build.dp_switch = Some((node, service));

        for (peer, card_port) in std::mem::take(&mut build.patch_targets) {
            if let Some(switch_port) = build.dp_port(&peer)? {
                build.add_link(LinkType::Patch, [switch_port, card_port])?;
                build.patched_ports.insert(peer);
                build.ctx.summary.patch_links += 1;
            }
        }
        Ok(())
    }

    fn add_p4_switch<G: GraphBuilder>(&self, build: &mut Build<'_, G>) -> SynthesisResult<()> {
        let Some(switch) = &self.records.p4_switch else {
            tracing::info!(site = %self.site(), "No P4 switch found for site");
            return Ok(());
        };
        if build.dp_switch.is_none() {
            tracing::warn!(site = %self.site(), p4 = %switch.name, "P4 switch found without a dataplane switch, skipping it");
            return Ok(());
        }

        let node = build.add_node(NodeSpec {
            name: switch.name.clone(),
            node_type: NodeType::Switch,
            model: switch.model.clone(),
            site: self.site().to_string(),
            serial: switch.serial.clone(),
            location: build.location.clone(),
            capacities: Capacities::default(),
            labels: switch_labels(switch),
        })?;
        let service = build.graph.add_network_service(
            node,
            &format!("{}-ns", switch.name),
            ServiceType::MPLS,
            Labels::default(),
        )?;

        let uplinks = switch
            .ports
            .iter()
            .filter_map(|port| port.peer_port.as_deref().map(|peer| (port, peer)));
        for (index, (port, peer)) in uplinks.enumerate() {
            let spec = p4_port_spec(&switch.name, index, port)?;
            let p4_port = build.graph.add_interface(service, spec)?;
            if build.patched_ports.contains(peer) {
                tracing::warn!(p4 = %switch.name, %peer, "P4 uplink peer is already patched, not linking it");
                continue;
            }
            if let Some(switch_port) = build.dp_port(peer)? {
                build.add_link(LinkType::Patch, [p4_port, switch_port])?;
                build.patched_ports.insert(peer.to_string());
                build.ctx.summary.patch_links += 1;
            }
        }
        Ok(())
    }

    /// A controller-scanned device with its interfaces.
    fn add_router<G: GraphBuilder>(
        &self,
        build: &mut Build<'_, G>,
        router: &RouterRecord,
    ) -> SynthesisResult<()> {
        let name = router.name.as_str();
        let node = build.add_node(NodeSpec {
            name: name.to_string(),
            node_type: NodeType::Router,
            model: router.model.clone(),
            site: self.site().to_string(),
            serial: None,
            location: build.location.clone(),
            capacities: Capacities::default(),
            labels: Labels::default(),
        })?;
        let service = build.graph.add_network_service(
            node,
            &format!("{name}-ns"),
            ServiceType::MPLS,
            Labels::default(),
        )?;

        self.add_addressed_interfaces(build, name, service, &router.interfaces)
    }

    /// Every interface with both an IPv4 address and a netmask takes part in
    /// link inference.
    fn add_addressed_interfaces<G: GraphBuilder>(
        &self,
        build: &mut Build<'_, G>,
        name: &str,
        service: G::Service,
        records: &[InterfaceRecord],
    ) -> SynthesisResult<()> {
        for record in records {
            let netmask = record
                .netmask
                .as_deref()
                .map(Ipv4Netmask::from_str)
                .transpose()
                .map_err(|source| SynthesisError::Netmask {
                    node: name.to_string(),
                    source,
                })?;
            let addressed = record.ipv4.zip(netmask);
            let spec = InterfaceSpec {
                name: record.name.clone(),
                interface_type: InterfaceType::TrunkPort,
                details: None,
                labels: Labels {
                    mac: record.mac.iter().cloned().collect(),
                    ipv4: record.ipv4.map(|ip| ip.to_string()),
                    ipv6: record.ipv6.clone(),
                    ipv4_subnet: addressed
                        .map(|(address, netmask)| netmask.subnet_of(address).to_string()),
                    local_name: Some(record.name.clone()),
                    ..Default::default()
                },
                capacities: Capacities {
                    bw: bandwidth_gbps(name, record.speed.as_deref())?,
                    mtu: record.mtu.map(u64::from),
                    ..Default::default()
                },
            };
            let handle = build.graph.add_interface(service, spec)?;
            match addressed {
                Some((address, netmask)) => build.engine.register(AddressedInterface {
                    handle,
                    address,
                    netmask,
                }),
                None => {
                    tracing::debug!(node = %name, interface = %record.name, "Interface has no IPv4 address and netmask, not inferring its links")
                }
            }
        }
        Ok(())
    }

    /// Exchange ports advertise the VLANs still available on them.
    fn add_exchange<G: GraphBuilder>(&self, build: &mut Build<'_, G>) -> SynthesisResult<()> {
        if self.records.endpoints.is_empty() {
            return Ok(());
        }
        let name = format!("{}-exchange", self.site());
        let node = build.add_node(NodeSpec {
            name: name.clone(),
            node_type: NodeType::Switch,
            model: None,
            site: self.site().to_string(),
            serial: None,
            location: build.location.clone(),
            capacities: Capacities::default(),
            labels: Labels {
                local_name: Some(name.clone()),
                ..Default::default()
            },
        })?;
        let l2 = build.graph.add_network_service(
            node,
            &format!("{name}-ns"),
            ServiceType::MPLS,
            Labels::default(),
        )?;
        build.graph.add_network_service(
            node,
            &format!("{name}-l3vpn"),
            ServiceType::L3VPN,
            Labels {
                asn: Some(EXCHANGE_ASN.to_string()),
                ..Default::default()
            },
        )?;

        for endpoint in &self.records.endpoints {
            let spec = endpoint_spec(endpoint);
            let key = spec.name.clone();
            let port = build.graph.add_interface(l2, spec)?;
            build.exchange_ports.insert(key, port);
            build.ctx.summary.exchange_ports += 1;
        }
        Ok(())
    }

    fn infer_links<G: GraphBuilder>(&self, build: &mut Build<'_, G>) -> SynthesisResult<()> {
        let controller_links = match self.options.link_mode {
            LinkMode::Subnet => None,
            LinkMode::Auto => self.records.controller_links.as_ref(),
            LinkMode::Authoritative => Some(self.records.controller_links.as_ref().ok_or_else(
                || SynthesisError::FatalField {
                    node: self.site().to_string(),
                    field: "controller_links",
                },
            )?),
        };
        let authoritative: Option<AuthoritativeLinkSet> =
            controller_links.map(|links| links.iter().copied().collect());

        let engine = std::mem::take(&mut build.engine);
        tracing::debug!(
            interfaces = engine.len(),
            authoritative = authoritative.is_some(),
            "Inferring links"
        );
        for candidate in engine.infer(authoritative.as_ref()) {
            build.add_link(LinkType::L2Path, [candidate.a.handle, candidate.b.handle])?;
            build.ctx.summary.inferred_links += 1;
        }
        Ok(())
    }

    fn apply_overrides<G: GraphBuilder>(
        &self,
        build: &mut Build<'_, G>,
        overrides: &SiteOverrides,
    ) -> SynthesisResult<()> {
        for (name, forced) in &overrides.nodes {
            let Some(node) = build.graph.find_node(name) else {
                tracing::warn!(%name, "Capacity override names an unknown node, ignoring it");
                continue;
            };
            let capacities = build.graph.node_capacities(node)?.merge(Capacities {
                ram: forced.ram,
                cpu: forced.cpu,
                core: forced.core,
                disk: forced.disk,
                ..Default::default()
            });
            build.graph.set_node_capacities(node, capacities)?;
            tracing::info!(%name, ?capacities, "Applied capacity override");
        }

        for stitch in &overrides.stitch_ports {
            let peer = stitch
                .peer
                .as_deref()
                .ok_or_else(|| SynthesisError::AmbiguousStitch {
                    site: self.site().to_string(),
                    port: stitch.port.clone(),
                })?;
            let Some((_, service)) = build.dp_switch else {
                return Err(SynthesisError::FatalField {
                    node: self.site().to_string(),
                    field: "dp_switch",
                });
            };
            if build.dp_ports.contains_key(&stitch.port) {
                tracing::warn!(port = %stitch.port, "Stitch port is already cabled to a server, ignoring it");
                continue;
            }
            let mut labels = vlan_labels(&stitch.port, stitch.vlan_range.as_deref())?;
            labels.local_name = Some(stitch.port.clone());
            let port = build.graph.add_interface(
                service,
                InterfaceSpec {
                    name: stitch.port.clone(),
                    interface_type: InterfaceType::TrunkPort,
                    details: Some(peer.to_string()),
                    labels,
                    capacities: Capacities {
                        bw: stitch.bandwidth,
                        mtu: stitch.mtu,
                        ..Default::default()
                    },
                },
            )?;
            build.dp_ports.insert(stitch.port.clone(), port);
        }

        for (name, facility) in &overrides.facility_ports {
            let ambiguous = || SynthesisError::AmbiguousStitch {
                site: self.site().to_string(),
                port: name.clone(),
            };
            let stitch_port = facility.stitch_port.as_deref().ok_or_else(ambiguous)?;
            let target = build
                .resolve_stitch_port(&stitch_port.replace(' ', ""))
                .ok_or_else(ambiguous)?;

            let mut labels = vlan_labels(name, facility.vlan_range.as_deref())?;
            labels.ipv4_subnet = facility.ipv4_net.clone();
            labels.ipv6_subnet = facility.ipv6_net.clone();
            labels.device_name = facility.local_device.clone();
            labels.local_name = facility.local_port.clone();
            let capacities = Capacities {
                bw: facility.bandwidth,
                mtu: facility.mtu,
                ..Default::default()
            };
            let handle = build.graph.add_facility(
                name,
                self.site(),
                facility.description.clone(),
                labels,
                capacities,
            )?;
            let facility_port = build.graph.facility_interface(handle)?;
            build.graph.add_link(
                &format!("{name}-link"),
                LinkType::L2Path,
                [facility_port, target],
                Capacities::default(),
            )?;
            build.ctx.summary.facilities += 1;
        }

        if let Some(alias) = &overrides.dp_switch {
            match (build.dp_switch, &self.records.dp_switch) {
                (Some((node, _)), Some(switch)) => {
                    build.graph.rename_node(node, &alias.name)?;
                    // keep the inventory name reachable after the rename
                    build.graph.set_node_labels(
                        node,
                        Labels {
                            local_name: Some(switch.name.clone()),
                            ..switch_labels(switch)
                        },
                    )?;
                }
                _ => tracing::warn!(alias = %alias.name, "Dataplane switch alias given but no switch was found"),
            }
        }
        Ok(())
    }
}

fn switch_labels(switch: &SwitchRecord) -> Labels {
    Labels {
        ipv4: switch.mgmt_ip.map(|ip| ip.to_string()),
        ..Default::default()
    }
}

fn card_model(group: &CardGroup<'_>) -> Option<String> {
    group.ports.first().and_then(|pf| pf.model.clone())
}

fn card_details(group: &CardGroup<'_>) -> Option<String> {
    group
        .ports
        .first()
        .map(|pf| pf.description.clone())
        .filter(|description| !description.is_empty())
}

fn p4_port_spec(switch: &str, index: usize, port: &PortRecord) -> SynthesisResult<InterfaceSpec> {
    Ok(InterfaceSpec {
        name: format!("p{}", index + 1),
        interface_type: InterfaceType::TrunkPort,
        details: None,
        labels: Labels {
            mac: vec![port.mac.clone()],
            ..Default::default()
        },
        capacities: Capacities {
            bw: bandwidth_gbps(switch, port.speed.as_deref())?,
            ..Default::default()
        },
    })
}

fn endpoint_spec(endpoint: &EndpointRecord) -> InterfaceSpec {
    let space = match &endpoint.delegations {
        Some(delegations) if !delegations.is_empty() => VlanSpace::from(delegations.clone()),
        _ => VlanSpace::for_provider(endpoint.provider.as_deref()),
    };
    let available = space.available(endpoint.in_use.iter().copied());
    let name = format!("{}:{}", endpoint.device, endpoint.interface);
    if available.is_empty() {
        tracing::warn!(port = %name, "No VLANs left on exchange port");
    }

    InterfaceSpec {
        details: endpoint.description.clone(),
        labels: Labels {
            vlan_range: Some(format_ranges(&available)).filter(|ranges| !ranges.is_empty()),
            local_name: Some(endpoint.interface.clone()),
            device_name: Some(endpoint.device.clone()),
            region: endpoint.region.clone(),
            ..Default::default()
        },
        capacities: Capacities {
            bw: endpoint.capacity_mbps.map(|mbps| mbps / 1000),
            ..Default::default()
        },
        ..InterfaceSpec::new(name, InterfaceType::TrunkPort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlan_labels() {
        assert_eq!(
            vlan_labels("p", Some("2001")).unwrap().vlan,
            vec!["2001".to_string()]
        );
        assert_eq!(
            vlan_labels("p", Some("100-200")).unwrap().vlan_range.as_deref(),
            Some("100-200")
        );
        assert_eq!(vlan_labels("p", None).unwrap(), Labels::default());
        assert!(matches!(
            vlan_labels("p", Some("200-100")),
            Err(SynthesisError::VlanRange { .. })
        ));
    }

    #[test]
    fn test_endpoint_spec_uses_delegations_first() {
        let endpoint = EndpointRecord {
            device: "agg3.ashb".to_string(),
            interface: "HundredGigE0/0/0/1".to_string(),
            description: None,
            capacity_mbps: Some(100_000),
            provider: Some("AWS".to_string()),
            delegations: Some("100-199".parse().unwrap()),
            in_use: vec![101, 102],
            region: None,
        };
        let spec = endpoint_spec(&endpoint);
        assert_eq!(spec.name, "agg3.ashb:HundredGigE0/0/0/1");
        assert_eq!(spec.labels.vlan_range.as_deref(), Some("100-100,103-199"));
        assert_eq!(spec.capacities.bw, Some(100));

        let provider_only = EndpointRecord {
            delegations: None,
            in_use: vec![2, 3],
            ..endpoint
        };
        assert_eq!(
            endpoint_spec(&provider_only).labels.vlan_range.as_deref(),
            Some("4-4094")
        );
    }

    #[test]
    fn test_link_mode_from_str() {
        assert_eq!("subnet".parse::<LinkMode>().unwrap(), LinkMode::Subnet);
        assert_eq!(
            "Authoritative".parse::<LinkMode>().unwrap(),
            LinkMode::Authoritative
        );
        assert_eq!(LinkMode::default().to_string(), "auto");
    }

    #[test]
    fn test_context_numbers_links() {
        let mut ctx = SynthesisContext::new();
        assert_eq!(ctx.next_link_name(), "l1");
        assert_eq!(ctx.next_link_name(), "l2");
        assert_eq!(SynthesisContext::new().next_link_name(), "l1");
    }
}
