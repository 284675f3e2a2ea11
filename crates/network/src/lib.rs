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

//! Addressing primitives used while synthesizing a substrate topology:
//! VLAN availability ranges and IPv4 netmask/subnet handling.

pub mod ip;
pub mod vlan;

pub use ip::netmask::{Ipv4Netmask, Ipv4Subnet, NetmaskError};
pub use vlan::space::{CloudProvider, VlanSpace};
pub use vlan::{
    VLAN_ID_RANGE, VlanId, VlanRange, VlanRangeError, VlanRangeSet, compute_available,
    format_ranges, parse_vlan_ids,
};
