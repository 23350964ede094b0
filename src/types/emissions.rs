//! Emissions inventory records and the NFR sector-group classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One reported emissions figure for a (year, country, pollutant, sector).
///
/// `sector_code` is the raw NFR09 sector code; its sector group is derived
/// with [`SectorGroup::from_sector_code`] when the record enters an
/// [`crate::EmissionsStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionsInput {
    pub year: i32,
    /// Pollutant name as reported by the inventory (e.g. "SOx", "NOx").
    pub pollutant: String,
    /// ISO country code.
    pub country: String,
    /// Raw NFR09 sector code, e.g. "1A3bi".
    pub sector_code: String,
    pub unit: String,
    pub emissions: f64,
}

/// Reporting sector groups the raw NFR sector codes collapse into.
///
/// `NationalTotal` doubles as the catch-all for codes outside the mapping,
/// so every record classifies to some group and country-wide totals stay
/// queryable as a group of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorGroup {
    Agriculture,
    CommercialInstitutionalHouseholds,
    EnergyProductionDistribution,
    EnergyUseInIndustry,
    IndustrialProcesses,
    RoadTransport,
    NonRoadTransport,
    Other,
    Waste,
    NationalTotal,
}

const AGRICULTURE: &[&str] = &[
    "3B1a", "3B1b", "3B2", "3B3", "3B4a", "3B4d", "3B4e", "3B4f", "3B4gi", "3B4gii", "3B4giii",
    "3B4giv", "3B4h", "3Da1", "3Da2a", "3Da2b", "3Da2c", "3Da3", "3Da4", "3Db", "3Dc", "3Dd",
    "3De", "3Df", "3F", "3I",
];

const COMMERCIAL_INSTITUTIONAL_HOUSEHOLDS: &[&str] = &[
    "1A4ai", "1A4aii", "1A4bi", "1Ab4ii", "1A4ci", "1A4cii", "1A5a", "1A5b",
];

const ENERGY_PRODUCTION_DISTRIBUTION: &[&str] = &[
    "1A1a", "1A1b", "1A1c", "1B1a", "1B1b", "1B1c", "1B2ai", "1B2aiv", "1B2av", "1B2b", "1B2c",
    "1B2d",
];

const ENERGY_USE_IN_INDUSTRY: &[&str] = &[
    "1A2a", "1A2b", "1A2c", "1A2d", "1A2e", "1A2f", "1A2gvii", "1A2gviii",
];

const INDUSTRIAL_PROCESSES: &[&str] = &[
    "2A1", "2A2", "2A3", "2A5a", "2A5b", "2A5c", "2A6", "2B1", "2B10a", "2B10b", "2B2", "2B3",
    "2B5", "2B6", "2B7", "2C1", "2C2", "2C3", "2C4", "2C5", "2C6", "2C7a", "2C7b", "2C7c", "2C7d",
    "2D3a", "2D3b", "2D3c", "2D3d", "2D3e", "2D3f", "2D3g", "2D3h", "2D3i", "2G", "2H1", "2H2",
    "2H3", "2I", "2J", "2K", "2L",
];

const ROAD_TRANSPORT: &[&str] = &[
    "1A3bi", "1A3bii", "1A3biii", "1A3biv", "1A3bv", "1A3bvi", "1A3bvii",
];

const NON_ROAD_TRANSPORT: &[&str] = &[
    "1A3ai(i)", "1A3aii(i)", "1A3c", "1A3di(ii)", "1A3dii", "1A3ei", "1A3eii", "1A4ciii",
];

const OTHER: &[&str] = &["6A"];

const WASTE: &[&str] = &[
    "5A", "5B1", "5B2", "5C1a", "5C1bi", "5C1bii", "5C1biii", "5C1biv", "5C1bv", "5C1bvi", "5C2",
    "5D1", "5D2", "5D3", "5E",
];

impl SectorGroup {
    /// Classifies a raw NFR09 sector code. Codes outside the table (including
    /// the literal "NATIONAL_TOTAL" rows) map to [`SectorGroup::NationalTotal`].
    pub fn from_sector_code(sector_code: &str) -> SectorGroup {
        if AGRICULTURE.contains(&sector_code) {
            SectorGroup::Agriculture
        } else if COMMERCIAL_INSTITUTIONAL_HOUSEHOLDS.contains(&sector_code) {
            SectorGroup::CommercialInstitutionalHouseholds
        } else if ENERGY_PRODUCTION_DISTRIBUTION.contains(&sector_code) {
            SectorGroup::EnergyProductionDistribution
        } else if ENERGY_USE_IN_INDUSTRY.contains(&sector_code) {
            SectorGroup::EnergyUseInIndustry
        } else if INDUSTRIAL_PROCESSES.contains(&sector_code) {
            SectorGroup::IndustrialProcesses
        } else if ROAD_TRANSPORT.contains(&sector_code) {
            SectorGroup::RoadTransport
        } else if NON_ROAD_TRANSPORT.contains(&sector_code) {
            SectorGroup::NonRoadTransport
        } else if OTHER.contains(&sector_code) {
            SectorGroup::Other
        } else if WASTE.contains(&sector_code) {
            SectorGroup::Waste
        } else {
            SectorGroup::NationalTotal
        }
    }

    /// Reporting label used as the grouping key in aggregation output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectorGroup::Agriculture => "Agriculture",
            SectorGroup::CommercialInstitutionalHouseholds => {
                "Commercial, institutional and households"
            }
            SectorGroup::EnergyProductionDistribution => "Energy production and distribution",
            SectorGroup::EnergyUseInIndustry => "Energy use in industry",
            SectorGroup::IndustrialProcesses => "Industrial processes and product use",
            SectorGroup::RoadTransport => "Road transport",
            SectorGroup::NonRoadTransport => "Non-road transport",
            SectorGroup::Other => "Other",
            SectorGroup::Waste => "Waste",
            SectorGroup::NationalTotal => "NATIONAL_TOTAL",
        }
    }
}

impl fmt::Display for SectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
