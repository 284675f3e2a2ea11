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
use std::collections::HashMap;

use serde::Serialize;

use crate::builder::{
    Capacities, ComponentSpec, ComponentType, GraphBuilder, InterfaceSpec, InterfaceType, Labels,
    LinkType, NodeSpec, NodeType, ServiceType,
};
use crate::error::GraphError;

macro_rules! handle {
    ($name:ident, $kind:literal) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            const KIND: &'static str = $kind;

            pub fn index(&self) -> usize {
                self.0
            }
        }
    };
}

handle!(NodeId, "node");
handle!(ServiceId, "network service");
handle!(InterfaceId, "interface");
handle!(ComponentId, "component");
handle!(LinkId, "link");
handle!(FacilityId, "facility");

fn lookup<'a, T>(items: &'a [T], kind: &'static str, index: usize) -> Result<&'a T, GraphError> {
    items
        .get(index)
        .ok_or(GraphError::UnknownHandle { kind, index })
}

fn lookup_mut<'a, T>(
    items: &'a mut [T],
    kind: &'static str,
    index: usize,
) -> Result<&'a mut T, GraphError> {
    items
        .get_mut(index)
        .ok_or(GraphError::UnknownHandle { kind, index })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub site: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub capacities: Capacities,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Service {
    pub node: NodeId,
    pub name: String,
    pub service_type: ServiceType,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceOwner {
    Service(ServiceId),
    Component(ComponentId),
    Facility(FacilityId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub owner: InterfaceOwner,
    pub name: String,
    pub interface_type: InterfaceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    pub capacities: Capacities,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Component {
    pub node: NodeId,
    pub name: String,
    pub component_type: ComponentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub capacities: Capacities,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    pub interfaces: Vec<InterfaceId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Link {
    pub name: String,
    pub link_type: LinkType,
    pub interfaces: [InterfaceId; 2],
    pub capacities: Capacities,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Facility {
    pub name: String,
    pub site: String,
    pub interface: InterfaceId,
}

/// An in-memory substrate graph. Objects live in per-kind arenas and refer to
/// each other by index.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SubstrateGraph {
    nodes: Vec<Node>,
    services: Vec<Service>,
    interfaces: Vec<Interface>,
    components: Vec<Component>,
    links: Vec<Link>,
    facilities: Vec<Facility>,
    #[serde(skip)]
    node_names: HashMap<String, NodeId>,
    #[serde(skip)]
    link_names: HashMap<String, LinkId>,
    #[serde(skip)]
    linked: HashMap<InterfaceId, Vec<LinkId>>,
}

impl SubstrateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        lookup(&self.nodes, NodeId::KIND, id.0)
    }

    pub fn interface(&self, id: InterfaceId) -> Result<&Interface, GraphError> {
        lookup(&self.interfaces, InterfaceId::KIND, id.0)
    }

    pub fn component(&self, id: ComponentId) -> Result<&Component, GraphError> {
        lookup(&self.components, ComponentId::KIND, id.0)
    }

    /// The node an interface ultimately belongs to. Facility ports have none.
    pub fn interface_node(&self, id: InterfaceId) -> Result<Option<NodeId>, GraphError> {
        Ok(match self.interface(id)?.owner {
            InterfaceOwner::Service(service) => {
                Some(lookup(&self.services, ServiceId::KIND, service.0)?.node)
            }
            InterfaceOwner::Component(component) => Some(self.component(component)?.node),
            InterfaceOwner::Facility(_) => None,
        })
    }

    /// Interfaces hosted by the network services of `node`.
    pub fn node_interfaces(&self, node: NodeId) -> Vec<InterfaceId> {
        self.interfaces
            .iter()
            .enumerate()
            .filter(|(_, interface)| match interface.owner {
                InterfaceOwner::Service(service) => self
                    .services
                    .get(service.0)
                    .is_some_and(|s| s.node == node),
                _ => false,
            })
            .map(|(index, _)| InterfaceId(index))
            .collect()
    }

    /// The first link attached to `interface`.
    pub fn link_of(&self, interface: InterfaceId) -> Option<&Link> {
        self.links_of(interface).next()
    }

    /// Every link attached to `interface`, in the order they were added.
    pub fn links_of(&self, interface: InterfaceId) -> impl Iterator<Item = &Link> {
        self.linked
            .get(&interface)
            .into_iter()
            .flatten()
            .filter_map(|link| self.links.get(link.0))
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn push_interface(&mut self, owner: InterfaceOwner, spec: InterfaceSpec) -> InterfaceId {
        let id = InterfaceId(self.interfaces.len());
        self.interfaces.push(Interface {
            owner,
            name: spec.name,
            interface_type: spec.interface_type,
            details: spec.details,
            labels: spec.labels,
            capacities: spec.capacities,
        });
        id
    }
}

impl GraphBuilder for SubstrateGraph {
    type Node = NodeId;
    type Service = ServiceId;
    type Interface = InterfaceId;
    type Component = ComponentId;
    type Link = LinkId;
    type Facility = FacilityId;

    fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId, GraphError> {
        if self.node_names.contains_key(&spec.name) {
            return Err(GraphError::DuplicateName {
                kind: NodeId::KIND,
                name: spec.name,
            });
        }
        let id = NodeId(self.nodes.len());
        self.node_names.insert(spec.name.clone(), id);
        self.nodes.push(Node {
            name: spec.name,
            node_type: spec.node_type,
            model: spec.model,
            site: spec.site,
            serial: spec.serial,
            location: spec.location,
            capacities: spec.capacities,
            labels: spec.labels,
        });
        Ok(id)
    }

    fn add_network_service(
        &mut self,
        node: NodeId,
        name: &str,
        service_type: ServiceType,
        labels: Labels,
    ) -> Result<ServiceId, GraphError> {
        self.node(node)?;
        let id = ServiceId(self.services.len());
        self.services.push(Service {
            node,
            name: name.to_string(),
            service_type,
            labels,
        });
        Ok(id)
    }

    fn add_interface(
        &mut self,
        service: ServiceId,
        spec: InterfaceSpec,
    ) -> Result<InterfaceId, GraphError> {
        lookup(&self.services, ServiceId::KIND, service.0)?;
        Ok(self.push_interface(InterfaceOwner::Service(service), spec))
    }

    fn add_component(
        &mut self,
        node: NodeId,
        spec: ComponentSpec,
    ) -> Result<ComponentId, GraphError> {
        self.node(node)?;
        let id = ComponentId(self.components.len());
        let interfaces = spec
            .interfaces
            .into_iter()
            .map(|interface| self.push_interface(InterfaceOwner::Component(id), interface))
            .collect();
        self.components.push(Component {
            node,
            name: spec.name,
            component_type: spec.component_type,
            model: spec.model,
            details: spec.details,
            capacities: spec.capacities,
            labels: spec.labels,
            interfaces,
        });
        Ok(id)
    }

    fn add_link(
        &mut self,
        name: &str,
        link_type: LinkType,
        interfaces: [InterfaceId; 2],
        capacities: Capacities,
    ) -> Result<LinkId, GraphError> {
        if self.link_names.contains_key(name) {
            return Err(GraphError::DuplicateName {
                kind: LinkId::KIND,
                name: name.to_string(),
            });
        }
        for interface in interfaces {
            self.interface(interface)?;
            // a port takes one cable but may carry any number of paths
            if link_type != LinkType::Patch {
                continue;
            }
            if let Some(link) = self
                .links_of(interface)
                .find(|link| link.link_type == LinkType::Patch)
            {
                return Err(GraphError::InterfaceInUse {
                    index: interface.0,
                    link: link.name.clone(),
                });
            }
        }
        let id = LinkId(self.links.len());
        for interface in interfaces {
            self.linked.entry(interface).or_default().push(id);
        }
        self.link_names.insert(name.to_string(), id);
        self.links.push(Link {
            name: name.to_string(),
            link_type,
            interfaces,
            capacities,
        });
        Ok(id)
    }

    fn add_facility(
        &mut self,
        name: &str,
        site: &str,
        details: Option<String>,
        labels: Labels,
        capacities: Capacities,
    ) -> Result<FacilityId, GraphError> {
        if self.facilities.iter().any(|f| f.name == name) {
            return Err(GraphError::DuplicateName {
                kind: FacilityId::KIND,
                name: name.to_string(),
            });
        }
        let id = FacilityId(self.facilities.len());
        let interface = self.push_interface(
            InterfaceOwner::Facility(id),
            InterfaceSpec {
                name: format!("{name}-int"),
                interface_type: InterfaceType::FacilityPort,
                details,
                labels,
                capacities,
            },
        );
        self.facilities.push(Facility {
            name: name.to_string(),
            site: site.to_string(),
            interface,
        });
        Ok(id)
    }

    fn component_interfaces(&self, component: ComponentId) -> Result<Vec<InterfaceId>, GraphError> {
        Ok(self.component(component)?.interfaces.clone())
    }

    fn facility_interface(&self, facility: FacilityId) -> Result<InterfaceId, GraphError> {
        Ok(lookup(&self.facilities, FacilityId::KIND, facility.0)?.interface)
    }

    fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_names.get(name).copied()
    }

    fn node_capacities(&self, node: NodeId) -> Result<Capacities, GraphError> {
        Ok(self.node(node)?.capacities)
    }

    fn set_node_capacities(
        &mut self,
        node: NodeId,
        capacities: Capacities,
    ) -> Result<(), GraphError> {
        lookup_mut(&mut self.nodes, NodeId::KIND, node.0)?.capacities = capacities;
        Ok(())
    }

    fn rename_node(&mut self, node: NodeId, name: &str) -> Result<(), GraphError> {
        if let Some(existing) = self.node_names.get(name) {
            if *existing == node {
                return Ok(());
            }
            return Err(GraphError::DuplicateName {
                kind: NodeId::KIND,
                name: name.to_string(),
            });
        }
        let entry = lookup_mut(&mut self.nodes, NodeId::KIND, node.0)?;
        let old = std::mem::replace(&mut entry.name, name.to_string());
        self.node_names.remove(&old);
        self.node_names.insert(name.to_string(), node);
        Ok(())
    }

    fn set_node_labels(&mut self, node: NodeId, labels: Labels) -> Result<(), GraphError> {
        lookup_mut(&mut self.nodes, NodeId::KIND, node.0)?.labels = labels;
        Ok(())
    }
}
