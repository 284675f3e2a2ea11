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
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::str::FromStr;

use super::{VLAN_ID_RANGE, VlanId, VlanRange, VlanRangeSet, compute_available};

/// VLAN ids usable on a port that has neither delegations nor a known cloud
/// provider.
pub const DEFAULT_VLAN_SPACE: RangeInclusive<VlanId> = VLAN_ID_RANGE;

/// Cloud providers reachable through exchange ports. Each one reserves a
/// slightly different part of the 802.1Q space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::EnumString, strum_macros::Display)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum CloudProvider {
    Azure,
    Aws,
    Gcp,
    Oci,
}

impl CloudProvider {
    pub fn vlan_ids(&self) -> RangeInclusive<VlanId> {
        match self {
            CloudProvider::Azure => 1..=4094,
            CloudProvider::Aws => 2..=4094,
            CloudProvider::Gcp => 2..=4094,
            CloudProvider::Oci => 100..=4094,
        }
    }
}

/// The full candidate VLAN space of one interface, before anything in use is
/// subtracted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VlanSpace(BTreeSet<VlanId>);

impl Default for VlanSpace {
    fn default() -> Self {
        Self(DEFAULT_VLAN_SPACE.collect())
    }
}

impl VlanSpace {
    /// The space for a cloud-connect port. Unknown (or absent) providers get
    /// [`DEFAULT_VLAN_SPACE`].
    pub fn for_provider(provider: Option<&str>) -> Self {
        match provider.map(CloudProvider::from_str) {
            Some(Ok(provider)) => Self(provider.vlan_ids().collect()),
            _ => Self::default(),
        }
    }

    /// The union of the delegated ranges. Delegation bounds are inclusive.
    pub fn from_delegations(delegations: &[VlanRange]) -> Self {
        Self(delegations.iter().flat_map(|r| r.ids()).collect())
    }

    pub fn ids(&self) -> &BTreeSet<VlanId> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Availability of this space given the VLANs currently in use.
    pub fn available<I: IntoIterator<Item = VlanId>>(&self, in_use: I) -> VlanRangeSet {
        let in_use: BTreeSet<VlanId> = in_use.into_iter().collect();
        compute_available(&self.0, &in_use)
    }
}

impl From<VlanRangeSet> for VlanSpace {
    fn from(value: VlanRangeSet) -> Self {
        Self(value.ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_spaces() {
        let oci = VlanSpace::for_provider(Some("oci"));
        assert_eq!(oci.ids().first(), Some(&100));
        assert_eq!(oci.ids().last(), Some(&4094));

        let aws = VlanSpace::for_provider(Some("AWS"));
        assert_eq!(aws.ids().first(), Some(&2));

        assert_eq!(VlanSpace::for_provider(Some("nimbus")), VlanSpace::default());
        assert_eq!(VlanSpace::for_provider(None), VlanSpace::default());
    }

    #[test]
    fn test_delegations_are_inclusive() {
        let space = VlanSpace::from_delegations(&[
            VlanRange::new(100, 110).unwrap(),
            VlanRange::new(200, 200).unwrap(),
        ]);
        assert_eq!(space.ids().len(), 12);
        assert_eq!(space.available([105, 200]).to_string(), "100-104,106-110");
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(CloudProvider::Gcp.to_string(), "GCP");
    }
}
