//! Pollutant identity and regulatory target types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pollutant known to the catalog, with its per-source vocabulary aliases.
///
/// `key` is the canonical identifier every aggregation output is keyed by.
/// Any alias may be absent when the source does not carry the pollutant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pollutant {
    pub key: String,
    /// Name in the satellite (Copernicus) vocabulary, e.g. "pm2p5_conc".
    pub satellite_key: Option<String>,
    /// Name in the observation (EEA readings) vocabulary, e.g. "PM2.5".
    pub observation_key: Option<String>,
    /// Name in the emissions inventory vocabulary, e.g. "NOx".
    pub emissions_key: Option<String>,
}

/// Source vocabulary an alias belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasSource {
    Satellite,
    Observation,
    Emissions,
}

/// Measurement basis a regulatory target is defined against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measurement {
    /// Annual mean concentration.
    #[serde(rename = "calendar_year")]
    CalendarYear,
    /// Daily mean concentration.
    #[serde(rename = "day")]
    Day,
    /// Hourly mean concentration.
    #[serde(rename = "hour")]
    Hour,
    /// Maximum daily running 8-hour mean.
    #[serde(rename = "max_8hour_mean")]
    Max8HourMean,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::CalendarYear => "calendar_year",
            Measurement::Day => "day",
            Measurement::Hour => "hour",
            Measurement::Max8HourMean => "max_8hour_mean",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A regulatory concentration target for one pollutant and measurement basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub measurement: Measurement,
    /// Limit value in `unit`.
    pub value: f64,
    pub unit: String,
    /// Permitted number of exceedances per year, where the directive
    /// defines one.
    pub count_limit: Option<u32>,
}
