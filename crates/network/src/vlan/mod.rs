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

//! VLAN availability: turning "total space minus what is in use" into the
//! compact `start-end,start-end` form advertised on interfaces, and back.

pub mod space;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type VlanId = u16;

/// Ids accepted when a VLAN range is parsed from text or a number.
pub const VLAN_ID_RANGE: std::ops::RangeInclusive<VlanId> = 1..=4095;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VlanRangeError {
    #[error("Malformed VLAN range token '{token}'")]
    Malformed { token: String },
    #[error("VLAN range start {start} is greater than its end {end}")]
    Inverted { start: VlanId, end: VlanId },
}

/// A closed interval of VLAN ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VlanRange {
    pub start: VlanId,
    pub end: VlanId,
}

impl VlanRange {
    pub fn new(start: VlanId, end: VlanId) -> Result<Self, VlanRangeError> {
        if start > end {
            return Err(VlanRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(id: VlanId) -> Self {
        Self { start: id, end: id }
    }

    pub fn contains(&self, id: VlanId) -> bool {
        self.start <= id && id <= self.end
    }

    /// Number of ids in the range; never zero.
    pub fn size(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn ids(&self) -> std::ops::RangeInclusive<VlanId> {
        self.start..=self.end
    }
}

impl fmt::Display for VlanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for VlanRange {
    type Err = VlanRangeError;

    /// Parses either `a-b` or a bare id `a`. Ids outside [`VLAN_ID_RANGE`]
    /// are malformed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let malformed = || VlanRangeError::Malformed {
            token: token.to_string(),
        };
        let parse_id = |part: &str| {
            part.trim()
                .parse::<VlanId>()
                .ok()
                .filter(|id| VLAN_ID_RANGE.contains(id))
                .ok_or_else(malformed)
        };

        match token.split('-').collect::<Vec<_>>().as_slice() {
            [id] => Ok(Self::single(parse_id(*id)?)),
            [start, end] => Self::new(parse_id(*start)?, parse_id(*end)?),
            _ => Err(malformed()),
        }
    }
}

/// An ascending, coalesced sequence of [`VlanRange`]s. No two ranges in the
/// set overlap or touch; `[1-3, 4-6]` is always stored as `[1-6]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VlanRangeSet(Vec<VlanRange>);

impl VlanRangeSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds the minimal set of ranges covering `ids`. Input order and
    /// duplicates do not matter.
    pub fn from_ids<I: IntoIterator<Item = VlanId>>(ids: I) -> Self {
        let sorted: BTreeSet<VlanId> = ids.into_iter().collect();
        let mut ranges: Vec<VlanRange> = Vec::new();
        for id in sorted {
            match ranges.last_mut() {
                Some(last) if last.end.checked_add(1) == Some(id) => last.end = id,
                _ => ranges.push(VlanRange::single(id)),
            }
        }
        Self(ranges)
    }

    pub fn from_ranges<I: IntoIterator<Item = VlanRange>>(ranges: I) -> Self {
        Self::from_ids(ranges.into_iter().flat_map(|r| r.ids()))
    }

    pub fn ranges(&self) -> &[VlanRange] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of VLAN ids covered by the set.
    pub fn count(&self) -> usize {
        self.0.iter().map(VlanRange::size).sum()
    }

    pub fn contains(&self, id: VlanId) -> bool {
        self.0.iter().any(|r| r.contains(id))
    }

    /// Expands the set back into its member ids.
    pub fn ids(&self) -> BTreeSet<VlanId> {
        self.0.iter().flat_map(|r| r.ids()).collect()
    }

    /// A single VLAN id, if that is all the set holds.
    pub fn as_single(&self) -> Option<VlanId> {
        match self.0.as_slice() {
            [only] if only.is_single() => Some(only.start),
            _ => None,
        }
    }
}

impl fmt::Display for VlanRangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", tokens.join(","))
    }
}

impl FromStr for VlanRangeSet {
    type Err = VlanRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_vlan_ids(s).map(Self::from_ids)
    }
}

impl<'a> IntoIterator for &'a VlanRangeSet {
    type Item = &'a VlanRange;
    type IntoIter = std::slice::Iter<'a, VlanRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for VlanRangeSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VlanRangeSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(VlanRangeSetVisitor)
    }
}

struct VlanRangeSetVisitor;
impl Visitor<'_> for VlanRangeSetVisitor {
    type Value = VlanRangeSet;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a VLAN id or a comma separated list of start-end ranges")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Self::Value::from_str(v).map_err(E::custom)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let id = VlanId::try_from(v)
            .ok()
            .filter(|id| VLAN_ID_RANGE.contains(id))
            .ok_or_else(|| {
                E::custom(VlanRangeError::Malformed {
                    token: v.to_string(),
                })
            })?;
        Ok(VlanRangeSet(vec![VlanRange::single(id)]))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let v = u64::try_from(v).map_err(|_| {
            E::custom(VlanRangeError::Malformed {
                token: v.to_string(),
            })
        })?;
        self.visit_u64(v)
    }
}

/// The VLANs of `total` that are not in `in_use`, coalesced into ranges.
pub fn compute_available(total: &BTreeSet<VlanId>, in_use: &BTreeSet<VlanId>) -> VlanRangeSet {
    VlanRangeSet::from_ids(total.difference(in_use).copied())
}

/// Comma-joined `start-end` tokens; the empty set formats as `""`.
pub fn format_ranges(ranges: &VlanRangeSet) -> String {
    ranges.to_string()
}

/// Expands a comma separated list of `start-end` tokens and bare ids into the
/// set of ids it names. An empty (or all-whitespace) string is the empty set.
pub fn parse_vlan_ids(text: &str) -> Result<BTreeSet<VlanId>, VlanRangeError> {
    let mut ids = BTreeSet::new();
    if text.trim().is_empty() {
        return Ok(ids);
    }
    for token in text.split(',') {
        let range = VlanRange::from_str(token)?;
        ids.extend(range.ids());
    }
    Ok(ids)
}
