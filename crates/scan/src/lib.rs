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

use eyre::WrapErr;
use inventory::SiteRecords;
use serde::Deserialize;
use substrate_network::{
    VlanRangeError, VlanSpace, compute_available, format_ranges, parse_vlan_ids,
};
use topology::{
    StaticOverrides, SubstrateGraph, SynthesisContext, SynthesisSummary, TopologySynthesizer,
};

use crate::config::Config;

pub mod config;

/// A records file holds either one site or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Site(SiteRecords),
    Sites(Vec<SiteRecords>),
}

fn select_sites(file: RecordsFile, site: Option<&str>) -> eyre::Result<Vec<SiteRecords>> {
    let sites = match file {
        RecordsFile::Site(records) => vec![records],
        RecordsFile::Sites(sites) => sites,
    };
    let Some(site) = site else {
        return Ok(sites);
    };
    let selected: Vec<_> = sites
        .into_iter()
        .filter(|records| records.site.eq_ignore_ascii_case(site))
        .collect();
    if selected.is_empty() {
        eyre::bail!("No records found for site {site}");
    }
    Ok(selected)
}

/// Synthesizes every selected site into one graph and writes it to
/// `config.output_path`.
pub fn run(config: &Config) -> eyre::Result<SynthesisSummary> {
    let text = std::fs::read_to_string(&config.records_path).wrap_err_with(|| {
        format!(
            "Failed to read records from {}",
            config.records_path.display()
        )
    })?;
    let file: RecordsFile = serde_json::from_str(&text).wrap_err_with(|| {
        format!("Invalid site records in {}", config.records_path.display())
    })?;
    let sites = select_sites(file, config.site.as_deref())?;

    let overrides = match &config.overrides_path {
        Some(path) => StaticOverrides::load(path).wrap_err("Failed to load static overrides")?,
        None => StaticOverrides::default(),
    };

    let options = config.synthesis_options();
    let mut ctx = SynthesisContext::new();
    let mut graph = SubstrateGraph::new();
    for records in &sites {
        graph = TopologySynthesizer::new(records, &options)
            .with_overrides(overrides.site(&records.site))
            .synthesize(graph, &mut ctx)
            .wrap_err_with(|| {
                format!("Failed to synthesize topology for site {}", records.site)
            })?;
    }

    let json = graph
        .to_json_pretty()
        .wrap_err("Failed to serialize substrate topology")?;
    std::fs::write(&config.output_path, json).wrap_err_with(|| {
        format!(
            "Failed to write topology to {}",
            config.output_path.display()
        )
    })?;
    tracing::info!(
        output = %config.output_path.display(),
        sites = sites.len(),
        summary = ?ctx.summary,
        "Wrote substrate topology"
    );
    Ok(ctx.summary)
}

/// VLANs still available out of `total`, or out of the provider's space when
/// no total is given.
pub fn available_vlans(
    total: Option<&str>,
    provider: Option<&str>,
    in_use: &str,
) -> Result<String, VlanRangeError> {
    let total: BTreeSet<_> = match total {
        Some(total) => parse_vlan_ids(total)?,
        None => VlanSpace::for_provider(provider).ids().clone(),
    };
    let in_use = parse_vlan_ids(in_use)?;
    Ok(format_ranges(&compute_available(&total, &in_use)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str) -> SiteRecords {
        SiteRecords {
            site: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_sites() {
        let file = RecordsFile::Sites(vec![site("LBNL"), site("STAR")]);
        let selected = select_sites(file, Some("star")).unwrap();
        assert_eq!(selected, vec![site("STAR")]);

        let file = RecordsFile::Site(site("LBNL"));
        assert_eq!(select_sites(file, None).unwrap().len(), 1);

        let file = RecordsFile::Site(site("LBNL"));
        assert!(select_sites(file, Some("UTAH")).is_err());
    }

    #[test]
    fn test_available_vlans() {
        assert_eq!(
            available_vlans(Some("1-4094"), None, "10-12").unwrap(),
            "1-9,13-4094"
        );
        assert_eq!(available_vlans(None, Some("oci"), "").unwrap(), "100-4094");
        assert!(available_vlans(Some("12-10"), None, "").is_err());
    }
}
