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
use inventory::{OrganizerError, SpecParseError};
use substrate_network::{NetmaskError, VlanRangeError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown {kind} handle {index}")]
    UnknownHandle { kind: &'static str, index: usize },
    #[error("A {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("Interface {index} is already patched by link '{link}'")]
    InterfaceInUse { index: usize, link: String },
}

/// Errors that abort a synthesis run. No partial topology is produced when
/// one of these is returned.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("{node} is missing required field '{field}'")]
    FatalField { node: String, field: &'static str },
    #[error("Site {site} declares stitch port '{port}' with no resolvable peer")]
    AmbiguousStitch { site: String, port: String },
    #[error("Unable to organize card ports of {node}")]
    Organizer {
        node: String,
        #[source]
        source: OrganizerError,
    },
    #[error("Unparsable size or speed on {node}")]
    Spec {
        node: String,
        #[source]
        source: SpecParseError,
    },
    #[error("Invalid netmask on {node}")]
    Netmask {
        node: String,
        #[source]
        source: NetmaskError,
    },
    #[error("Invalid VLAN range on {node}")]
    VlanRange {
        node: String,
        #[source]
        source: VlanRangeError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;
