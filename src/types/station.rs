//! Observation station records: the raw metadata row coming from the EEA
//! station inventory and the registered station with resolved region
//! references.

use serde::{Deserialize, Serialize};

/// One station metadata row as delivered by the ingestion layer.
///
/// Coordinates are geographic (lat/lon degrees); `projection` names the
/// coordinate reference system they were reported in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationRecord {
    /// Stable station identifier, unique across countries.
    pub id: String,
    /// ISO country code.
    pub country: String,
    /// Measurement network the station reports into.
    pub network: String,
    /// EoI station code.
    pub eoi_code: String,
    /// National station code.
    pub national_code: String,
    /// CRS of the reported coordinates, e.g. "EPSG:4326".
    pub projection: String,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    /// Area classification (urban / suburban / rural ...).
    pub area: String,
}

/// A registered station, carrying the region references resolved at load
/// time. Each reference holds the key of the containing region at that
/// level, or `None` when the point resolved to no (or more than one) region.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Station {
    pub id: String,
    pub country: String,
    pub network: String,
    pub eoi_code: String,
    pub national_code: String,
    pub projection: String,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    pub area: String,
    /// Level-1 region key.
    pub region_1: Option<String>,
    /// Level-2 region key.
    pub region_2: Option<String>,
    /// Level-3 region key.
    pub region_3: Option<String>,
}
