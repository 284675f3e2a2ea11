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
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecParseError {
    #[error("Unable to parse size specification '{0}'")]
    Size(String),
    #[error("Unable to parse speed specification '{0}'")]
    Speed(String),
}

/// Decimal unit prefixes used by inventory for RAM, disk and port speeds.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum_macros::EnumString,
    strum_macros::Display,
)]
pub enum UnitPrefix {
    M,
    G,
    T,
    P,
}

impl UnitPrefix {
    fn exponent(self) -> i32 {
        match self {
            UnitPrefix::M => 2,
            UnitPrefix::G => 3,
            UnitPrefix::T => 4,
            UnitPrefix::P => 5,
        }
    }
}

/// Convert `value` expressed in `from` units into `to` units.
pub fn normalize_units(value: f64, from: UnitPrefix, to: UnitPrefix) -> f64 {
    value * 1000f64.powi(from.exponent() - to.exponent())
}

/// A number with a decimal unit prefix, e.g. `1.5 T`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: UnitPrefix,
}

impl Quantity {
    pub fn to(&self, unit: UnitPrefix) -> f64 {
        normalize_units(self.value, self.unit, unit)
    }

    /// The quantity in `unit`, truncated to a whole number.
    pub fn whole(&self, unit: UnitPrefix) -> u64 {
        let value = self.to(unit);
        if value.is_finite() && value > 0.0 {
            value as u64
        } else {
            0
        }
    }
}

lazy_static! {
    static ref SIZE_RE: Regex = Regex::new(r"^([\d.]+) ?([MGTP])B?").unwrap();
    static ref SPEED_RE: Regex = Regex::new(r"^([\d.]+) ?([MGT])(?:bps)?").unwrap();
}

fn parse_spec(re: &Regex, spec: &str) -> Option<Quantity> {
    let caps = re.captures(spec.trim())?;
    let value = f64::from_str(caps.get(1)?.as_str()).ok()?;
    let unit = UnitPrefix::from_str(caps.get(2)?.as_str()).ok()?;
    Some(Quantity { value, unit })
}

/// Parse a storage size such as `512G`, `1.5 TB` or `0.0 TB`.
pub fn parse_size_spec(spec: &str) -> Result<Quantity, SpecParseError> {
    parse_spec(&SIZE_RE, spec).ok_or_else(|| SpecParseError::Size(spec.to_string()))
}

/// Parse a link speed such as `25 Gbps`, `100G` or `1000M`.
pub fn parse_speed_spec(spec: &str) -> Result<Quantity, SpecParseError> {
    parse_spec(&SPEED_RE, spec).ok_or_else(|| SpecParseError::Speed(spec.to_string()))
}
