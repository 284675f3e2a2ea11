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

use lazy_static::lazy_static;
use regex::Regex;

/// Structured fields that can be recovered from the free-text description and
/// connection strings inventory systems attach to a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum PortField {
    Bdf,
    Vbdf,
    PeerPort,
    Vlan,
    Model,
    Slot,
    Numa,
    Disk,
}

/// Which of the two text blobs a pattern is applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSource {
    Description,
    Connection,
}

struct FieldPattern {
    field: PortField,
    source: FieldSource,
    /// Tried in order, first match wins. All capture groups of the winning
    /// pattern are joined with a space.
    patterns: &'static [&'static str],
}

// Descriptions look like
//   "Mellanox Technologies MT27800 Family [ConnectX-5] in PCIe Slot 3 (0000:41:00.0)"
//   "Mellanox Technologies MT28908 Family [ConnectX-6 Virtual Function] in (0000:e2:00.1)/(0000:e2:12.3)"
//   "Mellanox Technologies MT42822 BlueField-2 integrated ConnectX-6 Dx network controller (rev 01) in PCIe Slot 5 (0000:81:00.0) on NUMA Node 7"
// and connections like
//   "Connected to port HundredGigE0/0/0/21 and Tagged using VLAN 2018 on lbnl-data-sw"
const CARD_PORT_PATTERNS: &[FieldPattern] = &[
    FieldPattern {
        field: PortField::Bdf,
        source: FieldSource::Description,
        patterns: &[r"^.+?\(([0-9a-f:.]+)\).*"],
    },
    FieldPattern {
        field: PortField::Vbdf,
        source: FieldSource::Description,
        patterns: &[r"^.+/\(([0-9a-f:.]+)\).*"],
    },
    FieldPattern {
        field: PortField::PeerPort,
        source: FieldSource::Connection,
        patterns: &[r"^.+port ([\w/]+) .+"],
    },
    FieldPattern {
        field: PortField::Vlan,
        source: FieldSource::Connection,
        patterns: &[r"^.+ VLAN (\d+) on.+"],
    },
    FieldPattern {
        field: PortField::Model,
        source: FieldSource::Description,
        patterns: &[
            r"^.+\[([\w-]+).*?\].*",
            r"^.*?\b(BlueField-\d+)\b.*?\b(ConnectX-\d+)\b",
        ],
    },
    FieldPattern {
        field: PortField::Slot,
        source: FieldSource::Description,
        patterns: &[r"^.+Slot (\d+) .*"],
    },
    FieldPattern {
        field: PortField::Numa,
        source: FieldSource::Description,
        patterns: &[r"^.+ NUMA Node ([+\-\d]+).*"],
    },
];

// "Dell Express Flash NVMe P4510 1TB SFF in PCIe SSD Slot 22 in Bay 2 (0000:21:00.0)"
const NVME_PATTERNS: &[FieldPattern] = &[
    FieldPattern {
        field: PortField::Bdf,
        source: FieldSource::Description,
        patterns: &[r"^.+\(([0-9a-f:.]+)\).*"],
    },
    FieldPattern {
        field: PortField::Model,
        source: FieldSource::Description,
        patterns: &[r"^.+(?:NVMe|CD5) (\w+).*"],
    },
    FieldPattern {
        field: PortField::Disk,
        source: FieldSource::Description,
        patterns: &[r"^.+ (\d+[MGTP]B|\d+[MGTP]) .*"],
    },
];

struct CompiledPattern {
    field: PortField,
    source: FieldSource,
    regexes: Vec<Regex>,
}

fn compile(table: &[FieldPattern]) -> Vec<CompiledPattern> {
    table
        .iter()
        .map(|p| CompiledPattern {
            field: p.field,
            source: p.source,
            regexes: p.patterns.iter().map(|re| Regex::new(re).unwrap()).collect(),
        })
        .collect()
}

lazy_static! {
    static ref CARD_PORT_TABLE: Vec<CompiledPattern> = compile(CARD_PORT_PATTERNS);
    static ref NVME_TABLE: Vec<CompiledPattern> = compile(NVME_PATTERNS);
}

/// The fields a pattern table managed to extract. Fields whose patterns did
/// not match are simply absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivedFields(HashMap<PortField, String>);

impl DerivedFields {
    pub fn get(&self, field: PortField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn take(&mut self, field: PortField) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn contains(&self, field: PortField) -> bool {
        self.0.contains_key(&field)
    }
}

fn apply(table: &[CompiledPattern], description: &str, connection: &str) -> DerivedFields {
    let mut derived = HashMap::new();
    for entry in table {
        let text = match entry.source {
            FieldSource::Description => description,
            FieldSource::Connection => connection,
        };
        let found = entry.regexes.iter().find_map(|re| {
            re.captures(text).map(|caps| {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
        });
        if let Some(value) = found {
            derived.insert(entry.field, value);
        }
    }
    DerivedFields(derived)
}

/// Derive BDF, vBDF, peer port, VLAN, model, slot and NUMA node of a NIC port
/// from its description and connection strings.
pub fn derive_port_fields(description: &str, connection: &str) -> DerivedFields {
    apply(&CARD_PORT_TABLE, description, connection)
}

/// Derive BDF, model and raw disk size of an NVMe drive from its description.
pub fn derive_nvme_fields(description: &str) -> DerivedFields {
    apply(&NVME_TABLE, description, "")
}
