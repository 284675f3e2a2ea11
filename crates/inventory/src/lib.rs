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

//! Inventory records consumed by topology synthesis, the free-text field
//! derivation used to build them, and the organizer that rebuilds the NIC
//! card hierarchy out of a flat list of ports.

pub mod describe;
pub mod organizer;
pub mod port;
pub mod records;
pub mod units;

pub use describe::{DerivedFields, FieldSource, PortField, derive_nvme_fields, derive_port_fields};
pub use organizer::{CardGroup, CardKind, OrganizerError, PortHierarchyOrganizer};
pub use port::{PortRecord, PortRole, SENTINEL_SLOT};
pub use records::{
    ControllerLink, EndpointRecord, FpgaRecord, GpuRecord, InterfaceRecord, ModelRecord,
    NvmeFieldError, NvmeRecord, RouterRecord, SiteRecords, StorageRecord, SwitchRecord,
    WorkerRecord,
};
pub use units::{
    Quantity, SpecParseError, UnitPrefix, normalize_units, parse_size_spec, parse_speed_spec,
};
