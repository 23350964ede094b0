//! Data structures for NUTS administrative regions: the raw ingestion record,
//! the indexed region, and the constants describing the supported
//! classification (EU country list, current publication year).

use geo::Geometry;
use serde::{Deserialize, Serialize};

/// NUTS version used when callers do not ask for a specific one.
/// Regions are versioned by publication year; records from different years
/// must never be compared or merged without explicit reconciliation.
pub const CURRENT_NUTS_YEAR: i32 = 2016;

/// ISO country codes of the EU member states covered by the application.
pub const EU_ISOCODES: [&str; 28] = [
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT", "LV",
    "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE", "UK",
];

/// One row of a NUTS boundary file, as handed over by the ingestion layer.
///
/// `geometry` is a WKT string (POLYGON or MULTIPOLYGON in EPSG:4326).
/// Level-0 records occasionally ship without usable geometry; levels 1-3
/// must be well formed or the whole load fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Stable primary key, unique across levels and years.
    pub key: String,
    /// Publication year of the classification this record belongs to.
    pub year: i32,
    /// Hierarchy level, 0 (country) through 3 (sub-region).
    pub level: u8,
    /// NUTS identifier string, e.g. "AT", "AT1", "AT11", "AT111".
    pub nuts_id: String,
    /// ISO country code the region belongs to.
    pub country_code: String,
    /// Human-readable region name.
    pub name: String,
    /// Feature id of the source file the record came from.
    pub fid: String,
    /// Whether the region belongs to an EU member state.
    pub eu_member: bool,
    /// Polygon geometry as WKT.
    pub geometry: String,
}

/// An administrative region held by the [`crate::RegionIndex`].
///
/// Effectively immutable after load; carries both the original WKT string
/// (returned verbatim in boundary queries) and the parsed geometry used for
/// containment tests.
#[derive(Debug, Clone)]
pub struct Region {
    pub key: String,
    pub year: i32,
    pub level: u8,
    pub nuts_id: String,
    pub country_code: String,
    pub name: String,
    pub fid: String,
    pub eu_member: bool,
    /// Original WKT geometry string.
    pub geometry_wkt: String,
    /// Parsed geometry; `None` only for level-0 records without usable WKT.
    pub(crate) geometry: Option<Geometry<f64>>,
}

/// Boundary record returned by [`crate::RegionIndex::boundaries`],
/// serialized with the field names the reporting layer expects.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegionBoundary {
    pub name: String,
    pub country_code: String,
    #[serde(rename = "geography")]
    pub geometry: String,
}

/// Metadata-only variant of [`RegionBoundary`], without the (large) geometry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegionInfo {
    pub name: String,
    pub country_code: String,
}
