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
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetmaskError {
    #[error("Netmask '{0}' is neither a dotted-decimal mask nor a prefix length")]
    Unparsable(String),
    #[error("Netmask '{0}' does not have contiguous leading ones")]
    NonContiguous(String),
    #[error("Prefix length {0} is out of range for IPv4")]
    PrefixLength(u8),
}

/// An IPv4 netmask. Controllers report masks either as dotted-decimal
/// (`255.255.255.252`) or as a prefix length (`30`, `/30`); both forms parse
/// into the same value, so two masks compare equal regardless of how they
/// arrived.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Ipv4Netmask {
    prefix_len: u8,
    mask: Ipv4Addr,
}

impl Ipv4Netmask {
    pub fn from_prefix_len(prefix_len: u8) -> Result<Self, NetmaskError> {
        let net = Ipv4Net::new(Ipv4Addr::UNSPECIFIED, prefix_len)
            .map_err(|_| NetmaskError::PrefixLength(prefix_len))?;
        Ok(Self {
            prefix_len,
            mask: net.netmask(),
        })
    }

    pub fn from_dotted(mask: Ipv4Addr) -> Result<Self, NetmaskError> {
        let prefix_len = ipnet::ipv4_mask_to_prefix(mask)
            .map_err(|_| NetmaskError::NonContiguous(mask.to_string()))?;
        Ok(Self { prefix_len, mask })
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The dotted-decimal form of the mask.
    pub fn mask(&self) -> Ipv4Addr {
        self.mask
    }

    /// The subnet `address` belongs to under this mask.
    pub fn subnet_of(&self, address: Ipv4Addr) -> Ipv4Subnet {
        let network = Ipv4Addr::from_bits(address.to_bits() & self.mask.to_bits());
        Ipv4Subnet {
            network,
            netmask: *self,
        }
    }
}

impl FromStr for Ipv4Netmask {
    type Err = NetmaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if trimmed.contains('.') {
            let mask = Ipv4Addr::from_str(trimmed)
                .map_err(|_| NetmaskError::Unparsable(s.to_string()))?;
            Self::from_dotted(mask)
        } else {
            let prefix_len = trimmed
                .parse::<u8>()
                .map_err(|_| NetmaskError::Unparsable(s.to_string()))?;
            Self::from_prefix_len(prefix_len)
        }
    }
}

impl Display for Ipv4Netmask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mask)
    }
}

/// A network address together with the mask that produced it. Two interfaces
/// sit on the same segment iff their subnets are equal, which also requires
/// their masks to be equal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Ipv4Subnet {
    network: Ipv4Addr,
    netmask: Ipv4Netmask,
}

impl Ipv4Subnet {
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn netmask(&self) -> Ipv4Netmask {
        self.netmask
    }
}

impl Display for Ipv4Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.netmask.prefix_len)
    }
}
