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
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::str::FromStr;

use inventory::ControllerLink;
use substrate_network::{Ipv4Netmask, Ipv4Subnet, NetmaskError};

/// An interface that takes part in link inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressedInterface<H> {
    pub handle: H,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Netmask,
}

impl<H> AddressedInterface<H> {
    /// `netmask` may be dotted-decimal or a prefix length.
    pub fn new(handle: H, address: Ipv4Addr, netmask: &str) -> Result<Self, NetmaskError> {
        Ok(Self {
            handle,
            address,
            netmask: Ipv4Netmask::from_str(netmask)?,
        })
    }

    pub fn subnet(&self) -> Ipv4Subnet {
        self.netmask.subnet_of(self.address)
    }
}

/// Two interfaces found to be the ends of the same link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkCandidate<H> {
    pub a: AddressedInterface<H>,
    pub b: AddressedInterface<H>,
}

/// Links confirmed by a network controller, keyed by `"localIP-remoteIP"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthoritativeLinkSet(HashMap<String, (Ipv4Addr, Ipv4Addr)>);

impl AuthoritativeLinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(local: Ipv4Addr, remote: Ipv4Addr) -> String {
        format!("{local}-{remote}")
    }

    pub fn insert(&mut self, local: Ipv4Addr, remote: Ipv4Addr) {
        self.0.insert(Self::key(local, remote), (local, remote));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the controller reported a link between `a` and `b`, in either
    /// direction.
    pub fn connects(&self, a: Ipv4Addr, b: Ipv4Addr) -> bool {
        self.0.contains_key(&Self::key(a, b)) || self.0.contains_key(&Self::key(b, a))
    }
}

impl FromIterator<ControllerLink> for AuthoritativeLinkSet {
    fn from_iter<T: IntoIterator<Item = ControllerLink>>(iter: T) -> Self {
        let mut links = Self::new();
        for link in iter {
            links.insert(link.local, link.remote);
        }
        links
    }
}

/// Pairs up interfaces that sit on the two ends of a link.
///
/// Interfaces are registered during a synthesis pass and paired once all of
/// them are known. Without an [`AuthoritativeLinkSet`] two interfaces pair
/// when their masks and network addresses are equal. With one, only the
/// controller's links count and subnets are never looked at. Either way an
/// interface ends up in at most one [`LinkCandidate`].
#[derive(Debug)]
pub struct LinkInferenceEngine<H> {
    pending: VecDeque<AddressedInterface<H>>,
}

impl<H> Default for LinkInferenceEngine<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> LinkInferenceEngine<H> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    pub fn register(&mut self, interface: AddressedInterface<H>) {
        self.pending.push_back(interface);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consume the registered interfaces and return the links between them.
    /// When more than two interfaces share a subnet the first one registered
    /// pairs with the next one, and the rest are paired among themselves.
    pub fn infer(mut self, authoritative: Option<&AuthoritativeLinkSet>) -> Vec<LinkCandidate<H>> {
        let mut links = Vec::new();
        while let Some(current) = self.pending.pop_front() {
            let partner = self.pending.iter().position(|other| match authoritative {
                Some(set) => set.connects(current.address, other.address),
                None => current.subnet() == other.subnet(),
            });
            match partner.and_then(|index| self.pending.remove(index)) {
                Some(other) => links.push(LinkCandidate { a: current, b: other }),
                None => tracing::debug!(address = %current.address, "No link partner found"),
            }
        }
        links
    }
}
