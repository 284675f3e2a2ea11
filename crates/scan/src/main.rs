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
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use eyre::WrapErr;
use substrate_scan::config::{Config, ConfigError};
use topology::LinkMode;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

fn main() -> Result<(), eyre::Report> {
    let options = Options::parse();

    let level = match options.debug {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let (text_layer, json_layer) = match options.log_format {
        LogFormat::Text => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };
    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(env_filter)
        .try_init()?;

    match options.command {
        Command::Run(run_command) => {
            let config: Config = run_command.try_into()?;
            let summary =
                substrate_scan::run(&config).wrap_err("Failed to build substrate topology")?;
            tracing::info!(
                nodes = summary.nodes,
                links = summary.patch_links + summary.inferred_links + summary.facilities,
                "Done"
            );
        }
        Command::Vlans(vlans) => {
            let available = substrate_scan::available_vlans(
                vlans.total.as_deref(),
                vlans.provider.as_deref(),
                &vlans.in_use,
            )
            .wrap_err("Invalid VLAN range")?;
            println!("{available}");
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
pub struct Options {
    #[clap(short, long, action = ArgAction::Count, global = true, help = "Increase log verbosity")]
    pub debug: u8,

    #[clap(long, value_enum, default_value_t, global = true, help = "Log output format")]
    pub log_format: LogFormat,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Parser)]
pub enum Command {
    #[clap(about = "Build the substrate topology of a site")]
    Run(RunCommand),
    #[clap(about = "Print the VLANs still available on a port")]
    Vlans(VlansCommand),
}

#[derive(Parser)]
pub struct RunCommand {
    #[clap(long, short = 'f', help = "Path to TOML configuration file")]
    config_file: Option<PathBuf>,

    #[clap(short = 'r', long, help = "Path to the site records JSON")]
    pub records: Option<PathBuf>,

    #[clap(long, help = "Path to the static overrides (JSON or YAML)")]
    pub overrides: Option<PathBuf>,

    #[clap(short = 'o', long, help = "Where to write the topology JSON")]
    pub output: Option<PathBuf>,

    #[clap(short = 's', long, help = "Only build this site")]
    pub site: Option<String>,

    #[clap(short = 'a', long, help = "Postal address of the site")]
    pub address: Option<String>,

    #[clap(long, help = "VLAN range advertised on dedicated NIC ports")]
    pub dedicated_vlan_range: Option<String>,

    #[clap(long, help = "How links are inferred: subnet, authoritative or auto")]
    pub link_mode: Option<LinkMode>,
}

#[derive(Parser)]
pub struct VlansCommand {
    #[clap(long, help = "Candidate VLAN ranges, e.g. 1-4094")]
    pub total: Option<String>,

    #[clap(
        long,
        conflicts_with = "total",
        help = "Cloud provider whose VLAN space is the candidate set"
    )]
    pub provider: Option<String>,

    #[clap(long, default_value = "", help = "VLANs in use, e.g. 10-12,20")]
    pub in_use: String,
}

impl TryInto<Config> for RunCommand {
    type Error = ConfigError;

    fn try_into(self) -> Result<Config, Self::Error> {
        let mut config = if let Some(config_path) = self.config_file {
            Config::load(&config_path)?
        } else {
            Config::default()
        };

        if let Some(records) = self.records {
            config.records_path = records;
        }
        if let Some(overrides) = self.overrides {
            config.overrides_path = Some(overrides);
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(site) = self.site {
            config.site = Some(site);
        }
        if let Some(address) = self.address {
            config.postal_address = Some(address);
        }
        if let Some(range) = self.dedicated_vlan_range {
            config.dedicated_vlan_range = range;
        }
        if let Some(link_mode) = self.link_mode {
            config.link_mode = link_mode;
        }

        Ok(config)
    }
}
