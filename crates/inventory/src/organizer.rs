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
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::port::{PortRecord, PortRole};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrganizerError {
    #[error("Port {bdf} is a {actual} port, expected a {expected} port")]
    RoleMismatch {
        bdf: String,
        expected: PortRole,
        actual: PortRole,
    },
    #[error("Ports must be organized before they can be queried")]
    NotOrganized,
    #[error("Ports are already organized, no further ports can be added")]
    AlreadyOrganized,
    #[error("Virtual function {vbdf} names parent {parent} which is not a known physical function")]
    MissingParent { vbdf: String, parent: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardKind {
    /// No port of the card is a VF parent.
    Dedicated,
    /// At least one port of the card is partitioned into SR-IOV virtual
    /// functions.
    Shared,
}

/// The physical functions sharing one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardGroup<'a> {
    pub slot: String,
    pub kind: CardKind,
    pub ports: Vec<&'a PortRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Accumulating,
    Organized,
}

/// Rebuilds the card hierarchy of one server out of its flat port list.
///
/// Ports are added in any order with [`add_physical`](Self::add_physical) and
/// [`add_virtual`](Self::add_virtual), then [`organize`](Self::organize) is
/// called exactly once. Queries fail with [`OrganizerError::NotOrganized`]
/// until then, and adding fails with [`OrganizerError::AlreadyOrganized`]
/// afterwards.
#[derive(Debug)]
pub struct PortHierarchyOrganizer<'a> {
    /// Physical functions in the order they were added.
    physical: Vec<&'a PortRecord>,
    physical_by_bdf: HashMap<String, usize>,
    /// Virtual functions keyed by parent BDF, in the order they were added.
    virtuals: HashMap<String, Vec<&'a PortRecord>>,
    virtual_order: Vec<String>,
    vf_parent_of: HashMap<String, String>,
    vf_parents: BTreeSet<String>,
    dedicated: BTreeMap<String, Vec<&'a PortRecord>>,
    shared: BTreeMap<String, Vec<&'a PortRecord>>,
    state: State,
}

impl Default for PortHierarchyOrganizer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PortHierarchyOrganizer<'a> {
    pub fn new() -> Self {
        Self {
            physical: Vec::new(),
            physical_by_bdf: HashMap::new(),
            virtuals: HashMap::new(),
            virtual_order: Vec::new(),
            vf_parent_of: HashMap::new(),
            vf_parents: BTreeSet::new(),
            dedicated: BTreeMap::new(),
            shared: BTreeMap::new(),
            state: State::Accumulating,
        }
    }

    fn check_accumulating(&self) -> Result<(), OrganizerError> {
        match self.state {
            State::Accumulating => Ok(()),
            State::Organized => Err(OrganizerError::AlreadyOrganized),
        }
    }

    fn check_organized(&self) -> Result<(), OrganizerError> {
        match self.state {
            State::Organized => Ok(()),
            State::Accumulating => Err(OrganizerError::NotOrganized),
        }
    }

    /// Index a physical function by its BDF. A second port with the same BDF
    /// replaces the first.
    pub fn add_physical(&mut self, port: &'a PortRecord) -> Result<(), OrganizerError> {
        self.check_accumulating()?;
        if port.role != PortRole::PhysicalFunction {
            return Err(OrganizerError::RoleMismatch {
                bdf: port.own_bdf().to_string(),
                expected: PortRole::PhysicalFunction,
                actual: port.role,
            });
        }
        match self.physical_by_bdf.get(&port.bdf) {
            Some(&index) => {
                tracing::warn!(bdf = %port.bdf, "Duplicate physical function, keeping the last one seen");
                self.physical[index] = port;
            }
            None => {
                self.physical_by_bdf
                    .insert(port.bdf.clone(), self.physical.len());
                self.physical.push(port);
            }
        }
        Ok(())
    }

    /// Index a virtual function under the BDF of its parent.
    pub fn add_virtual(&mut self, port: &'a PortRecord) -> Result<(), OrganizerError> {
        self.check_accumulating()?;
        if port.role != PortRole::VirtualFunction {
            return Err(OrganizerError::RoleMismatch {
                bdf: port.own_bdf().to_string(),
                expected: PortRole::VirtualFunction,
                actual: port.role,
            });
        }
        let children = self.virtuals.entry(port.bdf.clone()).or_insert_with(|| {
            self.virtual_order.push(port.bdf.clone());
            Vec::new()
        });
        children.push(port);
        Ok(())
    }

    /// Add a port under whichever role it carries.
    pub fn add(&mut self, port: &'a PortRecord) -> Result<(), OrganizerError> {
        match port.role {
            PortRole::PhysicalFunction => self.add_physical(port),
            PortRole::VirtualFunction => self.add_virtual(port),
        }
    }

    /// Classify every physical function into a dedicated or shared card by
    /// slot. Fails if any virtual function names a parent that was never
    /// added.
    pub fn organize(&mut self) -> Result<(), OrganizerError> {
        self.check_accumulating()?;

        for parent in &self.virtual_order {
            if !self.physical_by_bdf.contains_key(parent) {
                let vbdf = self.virtuals[parent]
                    .first()
                    .map(|vf| vf.own_bdf().to_string())
                    .unwrap_or_default();
                return Err(OrganizerError::MissingParent {
                    vbdf,
                    parent: parent.clone(),
                });
            }
        }

        for (parent, children) in &self.virtuals {
            self.vf_parents.insert(parent.clone());
            for child in children {
                self.vf_parent_of
                    .insert(child.own_bdf().to_string(), parent.clone());
            }
        }

        // one VF parent makes the whole slot shared
        let shared_slots: BTreeSet<&str> = self
            .physical
            .iter()
            .filter(|port| self.vf_parents.contains(&port.bdf))
            .map(|port| port.slot_or_sentinel())
            .collect();
        for port in &self.physical {
            let slot = port.slot_or_sentinel().to_string();
            let cards = if shared_slots.contains(slot.as_str()) {
                &mut self.shared
            } else {
                &mut self.dedicated
            };
            cards.entry(slot).or_default().push(*port);
        }

        tracing::debug!(
            physical = self.physical.len(),
            shared_slots = self.shared.len(),
            dedicated_slots = self.dedicated.len(),
            "Organized card ports"
        );
        self.state = State::Organized;
        Ok(())
    }

    /// Physical functions of cards without virtual functions, keyed by slot.
    pub fn dedicated_cards(
        &self,
    ) -> Result<&BTreeMap<String, Vec<&'a PortRecord>>, OrganizerError> {
        self.check_organized()?;
        Ok(&self.dedicated)
    }

    /// Physical functions of SR-IOV cards, keyed by slot. Every port of such
    /// a card is listed, including the ones without virtual functions.
    pub fn shared_cards(&self) -> Result<&BTreeMap<String, Vec<&'a PortRecord>>, OrganizerError> {
        self.check_organized()?;
        Ok(&self.shared)
    }

    /// Both kinds of cards, shared ones first, each ordered by slot.
    pub fn card_groups(&self) -> Result<Vec<CardGroup<'a>>, OrganizerError> {
        self.check_organized()?;
        let shared = self.shared.iter().map(|(slot, ports)| CardGroup {
            slot: slot.clone(),
            kind: CardKind::Shared,
            ports: ports.clone(),
        });
        let dedicated = self.dedicated.iter().map(|(slot, ports)| CardGroup {
            slot: slot.clone(),
            kind: CardKind::Dedicated,
            ports: ports.clone(),
        });
        Ok(shared.chain(dedicated).collect())
    }

    /// Physical functions that have at least one virtual function, in the
    /// order they were added.
    pub fn vf_parents(&self) -> Result<Vec<&'a PortRecord>, OrganizerError> {
        self.check_organized()?;
        Ok(self
            .physical
            .iter()
            .filter(|port| self.vf_parents.contains(&port.bdf))
            .copied()
            .collect())
    }

    /// Virtual functions of the physical function at `bdf`; empty when it has
    /// none.
    pub fn vfs_of_parent(&self, bdf: &str) -> Result<&[&'a PortRecord], OrganizerError> {
        self.check_organized()?;
        Ok(self.virtuals.get(bdf).map(Vec::as_slice).unwrap_or_default())
    }

    /// The physical function a virtual function (given by its own vBDF)
    /// belongs to.
    pub fn parent_of_vf(&self, vbdf: &str) -> Result<Option<&'a PortRecord>, OrganizerError> {
        self.check_organized()?;
        Ok(self
            .vf_parent_of
            .get(vbdf)
            .and_then(|parent| self.physical_by_bdf.get(parent))
            .map(|&index| self.physical[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pf(bdf: &str, slot: Option<&str>) -> PortRecord {
        PortRecord {
            role: PortRole::PhysicalFunction,
            mac: format!("mac-{bdf}"),
            bdf: bdf.to_string(),
            vbdf: None,
            description: String::new(),
            connection: String::new(),
            peer_port: None,
            slot: slot.map(str::to_string),
            model: None,
            numa: None,
            speed: None,
            vlan: None,
        }
    }

    fn vf(parent: &str, vbdf: &str, vlan: &str) -> PortRecord {
        PortRecord {
            role: PortRole::VirtualFunction,
            vbdf: Some(vbdf.to_string()),
            vlan: Some(vlan.to_string()),
            ..pf(parent, None)
        }
    }

    #[test]
    fn test_shared_card_classification() {
        let a = pf("0000:41:00.0", Some("1"));
        let b = pf("0000:41:00.1", Some("1"));
        let v1 = vf("0000:41:00.0", "0000:41:00.2", "1001");
        let v2 = vf("0000:41:00.0", "0000:41:00.3", "1002");

        let mut organizer = PortHierarchyOrganizer::new();
        // arrival order should not matter
        organizer.add_virtual(&v1).unwrap();
        organizer.add_physical(&a).unwrap();
        organizer.add_virtual(&v2).unwrap();
        organizer.add_physical(&b).unwrap();
        organizer.organize().unwrap();

        let shared = organizer.shared_cards().unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared["1"], vec![&a, &b]);
        assert!(organizer.dedicated_cards().unwrap().is_empty());
        assert_eq!(organizer.vfs_of_parent(&a.bdf).unwrap(), &[&v1, &v2]);
        assert!(organizer.vfs_of_parent(&b.bdf).unwrap().is_empty());
        assert_eq!(organizer.parent_of_vf("0000:41:00.2").unwrap(), Some(&a));
        assert_eq!(organizer.parent_of_vf("0000:ff:00.0").unwrap(), None);
        assert_eq!(organizer.vf_parents().unwrap(), vec![&a]);
    }

    #[test]
    fn test_dedicated_cards_by_slot() {
        let a = pf("0000:41:00.0", Some("1"));
        let b = pf("0000:41:00.1", Some("1"));
        let c = pf("0000:81:00.0", Some("5"));

        let mut organizer = PortHierarchyOrganizer::new();
        for port in [&a, &b, &c] {
            organizer.add(port).unwrap();
        }
        organizer.organize().unwrap();

        let dedicated = organizer.dedicated_cards().unwrap();
        assert_eq!(dedicated["1"], vec![&a, &b]);
        assert_eq!(dedicated["5"], vec![&c]);
        assert!(organizer.shared_cards().unwrap().is_empty());

        let groups = organizer.card_groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.kind == CardKind::Dedicated));
        assert!(
            groups
                .iter()
                .all(|g| g.ports.iter().all(|p| p.slot_or_sentinel() == g.slot))
        );
    }

    #[test]
    fn test_missing_slot_gets_sentinel() {
        let a = pf("0000:02:00.0", None);
        let mut organizer = PortHierarchyOrganizer::new();
        organizer.add_physical(&a).unwrap();
        organizer.organize().unwrap();
        assert_eq!(organizer.dedicated_cards().unwrap()["0"], vec![&a]);
    }

    #[test]
    fn test_queries_before_organize_fail() {
        let organizer = PortHierarchyOrganizer::new();
        assert_eq!(
            organizer.dedicated_cards().unwrap_err(),
            OrganizerError::NotOrganized
        );
        assert_eq!(
            organizer.shared_cards().unwrap_err(),
            OrganizerError::NotOrganized
        );
        assert_eq!(
            organizer.parent_of_vf("0000:41:00.2").unwrap_err(),
            OrganizerError::NotOrganized
        );
    }

    #[test]
    fn test_role_mismatch() {
        let a = pf("0000:41:00.0", Some("1"));
        let v1 = vf("0000:41:00.0", "0000:41:00.2", "1001");
        let mut organizer = PortHierarchyOrganizer::new();
        assert!(matches!(
            organizer.add_virtual(&a),
            Err(OrganizerError::RoleMismatch {
                expected: PortRole::VirtualFunction,
                ..
            })
        ));
        assert_eq!(
            organizer.add_physical(&v1),
            Err(OrganizerError::RoleMismatch {
                bdf: "0000:41:00.2".to_string(),
                expected: PortRole::PhysicalFunction,
                actual: PortRole::VirtualFunction,
            })
        );
    }

    #[test]
    fn test_missing_parent_fails() {
        let orphan = vf("0000:99:00.0", "0000:99:00.4", "10");
        let mut organizer = PortHierarchyOrganizer::new();
        organizer.add_virtual(&orphan).unwrap();
        assert_eq!(
            organizer.organize(),
            Err(OrganizerError::MissingParent {
                vbdf: "0000:99:00.4".to_string(),
                parent: "0000:99:00.0".to_string(),
            })
        );
    }

    #[test]
    fn test_no_adding_after_organize() {
        let a = pf("0000:41:00.0", Some("1"));
        let mut organizer = PortHierarchyOrganizer::new();
        organizer.organize().unwrap();
        assert_eq!(
            organizer.add_physical(&a),
            Err(OrganizerError::AlreadyOrganized)
        );
        assert_eq!(organizer.organize(), Err(OrganizerError::AlreadyOrganized));
    }
}
