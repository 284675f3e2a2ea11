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

//! Substrate topology synthesis: turns one site's inventory and controller
//! records into a graph of nodes, components, interfaces and links.

pub mod builder;
pub mod error;
pub mod graph;
pub mod links;
pub mod overrides;
pub mod synthesizer;

pub use builder::{
    Capacities, ComponentSpec, ComponentType, GraphBuilder, InterfaceSpec, InterfaceType, Labels,
    LinkType, NodeSpec, NodeType, ServiceType,
};
pub use error::{GraphError, SynthesisError, SynthesisResult};
pub use graph::SubstrateGraph;
pub use links::{AddressedInterface, AuthoritativeLinkSet, LinkCandidate, LinkInferenceEngine};
pub use overrides::{OverrideError, SiteOverrides, StaticOverrides};
pub use synthesizer::{
    LinkMode, SynthesisContext, SynthesisOptions, SynthesisSummary, TopologySynthesizer,
};
