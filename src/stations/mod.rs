//! Station registry: region assignment at load time and stratified
//! selection of stations for map views.

use crate::regions::index::RegionIndex;
use crate::types::region::CURRENT_NUTS_YEAR;
use crate::types::station::{Station, StationRecord};
use bon::bon;
use log::warn;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Registry of observation stations keyed by station id.
///
/// The level-1..3 region references are resolved spatially once when a
/// station is registered; aggregation never re-resolves coordinates.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: BTreeMap<String, Station>,
}

impl StationRegistry {
    pub fn new() -> StationRegistry {
        StationRegistry::default()
    }

    /// Registers a station, resolving its region references against the
    /// index.
    ///
    /// A point that resolves to no region at some level (or sits in an
    /// unsupported CRS) leaves that reference empty; the station is
    /// registered regardless. A resolved chain whose NUTS ids do not nest
    /// is logged as inconsistent source data.
    pub fn insert(&mut self, record: StationRecord, regions: &RegionIndex) {
        let resolve = |level: u8| {
            regions
                .resolve_point(
                    record.latitude,
                    record.longitude,
                    &record.projection,
                    level,
                    CURRENT_NUTS_YEAR,
                )
                .map(|region| region.key.clone())
        };
        let region_1 = resolve(1);
        let region_2 = resolve(2);
        let region_3 = resolve(3);

        let nuts_id = |key: &Option<String>| {
            key.as_deref()
                .and_then(|key| regions.get(key))
                .map(|region| region.nuts_id.clone())
        };
        if !hierarchy_consistent(
            nuts_id(&region_1).as_deref(),
            nuts_id(&region_2).as_deref(),
            nuts_id(&region_3).as_deref(),
        ) {
            warn!(
                "Station {} resolved to an inconsistent region chain ({:?}, {:?}, {:?}).",
                record.id, region_1, region_2, region_3
            );
        }

        self.stations.insert(
            record.id.clone(),
            Station {
                id: record.id,
                country: record.country.to_uppercase(),
                network: record.network,
                eoi_code: record.eoi_code,
                national_code: record.national_code,
                projection: record.projection,
                longitude: record.longitude,
                latitude: record.latitude,
                altitude: record.altitude,
                area: record.area,
                region_1,
                region_2,
                region_3,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[bon]
impl StationRegistry {
    /// Selects stations stratified by the region reference at `level`
    /// (level 0 strata are countries).
    ///
    /// Each stratum contributes `min(n, stratum size)` stations sampled
    /// uniformly, or `frac` of the stratum when given; a fraction that
    /// rounds to zero falls back to the whole stratum. Stations without a
    /// region reference at the level are not part of any stratum.
    #[builder]
    pub fn stratified_stations(
        &self,
        level: Option<u8>,
        n: Option<usize>,
        frac: Option<f64>,
        countries: Option<Vec<String>>,
    ) -> Vec<String> {
        let level = level.unwrap_or(1);
        let n = n.unwrap_or(1);
        let countries: Option<Vec<String>> =
            countries.map(|c| c.iter().map(|c| c.to_uppercase()).collect());

        let mut strata: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for station in self.stations.values() {
            if let Some(countries) = &countries {
                if !countries.contains(&station.country) {
                    continue;
                }
            }
            let stratum = match level {
                0 => Some(station.country.as_str()),
                1 => station.region_1.as_deref(),
                2 => station.region_2.as_deref(),
                _ => station.region_3.as_deref(),
            };
            let Some(stratum) = stratum else {
                continue;
            };
            strata.entry(stratum).or_default().push(station.id.as_str());
        }

        let mut rng = rand::thread_rng();
        let mut ids = Vec::new();
        for stratum in strata.values() {
            let take = match frac {
                None => n.min(stratum.len()),
                Some(frac) => {
                    let take = (frac * stratum.len() as f64).round() as usize;
                    if take == 0 {
                        stratum.len()
                    } else {
                        take.min(stratum.len())
                    }
                }
            };
            ids.extend(
                stratum
                    .choose_multiple(&mut rng, take)
                    .map(|id| id.to_string()),
            );
        }
        ids
    }
}

fn hierarchy_consistent(
    nuts_1: Option<&str>,
    nuts_2: Option<&str>,
    nuts_3: Option<&str>,
) -> bool {
    // NUTS ids nest by prefix: AT111 sits in AT11 sits in AT1.
    let nested = |child: Option<&str>, parent: Option<&str>| match (child, parent) {
        (Some(child), Some(parent)) => child.starts_with(parent),
        _ => true,
    };
    nested(nuts_3, nuts_2) && nested(nuts_2, nuts_1) && nested(nuts_3, nuts_1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::region::RegionRecord;

    fn region(key: &str, level: u8, nuts_id: &str, wkt: &str) -> RegionRecord {
        RegionRecord {
            key: key.to_string(),
            year: CURRENT_NUTS_YEAR,
            level,
            nuts_id: nuts_id.to_string(),
            country_code: "AT".to_string(),
            name: format!("Region {nuts_id}"),
            fid: nuts_id.to_string(),
            eu_member: true,
            geometry: wkt.to_string(),
        }
    }

    fn regions() -> RegionIndex {
        RegionIndex::from_records(vec![
            region("AT1-1", 1, "AT1", "POLYGON((0 0,10 0,10 10,0 10,0 0))"),
            region("AT11-2", 2, "AT11", "POLYGON((0 0,5 0,5 10,0 10,0 0))"),
            region("AT12-2", 2, "AT12", "POLYGON((5 0,10 0,10 10,5 10,5 0))"),
            region("AT111-3", 3, "AT111", "POLYGON((0 0,5 0,5 5,0 5,0 0))"),
        ])
        .unwrap()
    }

    fn station(id: &str, longitude: f64, latitude: f64) -> StationRecord {
        StationRecord {
            id: id.to_string(),
            country: "AT".to_string(),
            network: "NET.AT".to_string(),
            eoi_code: "AT0001A".to_string(),
            national_code: "0001".to_string(),
            projection: "EPSG:4326".to_string(),
            longitude,
            latitude,
            altitude: 200.0,
            area: "urban".to_string(),
        }
    }

    #[test]
    fn insert_resolves_region_references() {
        let regions = regions();
        let mut registry = StationRegistry::new();
        registry.insert(station("STA.AT.0001", 2.0, 2.0), &regions);
        let stored = registry.get("STA.AT.0001").unwrap();
        assert_eq!(stored.region_1.as_deref(), Some("AT1-1"));
        assert_eq!(stored.region_2.as_deref(), Some("AT11-2"));
        assert_eq!(stored.region_3.as_deref(), Some("AT111-3"));
    }

    #[test]
    fn insert_keeps_stations_outside_every_region() {
        let regions = regions();
        let mut registry = StationRegistry::new();
        registry.insert(station("STA.AT.0002", 20.0, 20.0), &regions);
        let stored = registry.get("STA.AT.0002").unwrap();
        assert_eq!(stored.region_1, None);
        assert_eq!(stored.region_2, None);
    }

    #[test]
    fn unsupported_projection_skips_resolution() {
        let regions = regions();
        let mut registry = StationRegistry::new();
        let mut record = station("STA.AT.0003", 2.0, 2.0);
        record.projection = "EPSG:3035".to_string();
        registry.insert(record, &regions);
        assert_eq!(registry.get("STA.AT.0003").unwrap().region_2, None);
    }

    #[test]
    fn hierarchy_consistency_checks_nuts_prefixes() {
        assert!(hierarchy_consistent(Some("AT1"), Some("AT11"), Some("AT111")));
        assert!(hierarchy_consistent(Some("AT1"), None, Some("AT111")));
        assert!(hierarchy_consistent(None, None, None));
        assert!(!hierarchy_consistent(Some("AT1"), Some("DE11"), Some("AT111")));
        assert!(!hierarchy_consistent(Some("AT2"), Some("AT11"), None));
    }

    #[test]
    fn stratified_takes_at_most_n_per_stratum() {
        let regions = regions();
        let mut registry = StationRegistry::new();
        registry.insert(station("STA.AT.0001", 1.0, 1.0), &regions);
        registry.insert(station("STA.AT.0002", 2.0, 2.0), &regions);
        registry.insert(station("STA.AT.0003", 3.0, 3.0), &regions);
        registry.insert(station("STA.AT.0004", 7.0, 7.0), &regions);
        registry.insert(station("STA.AT.0005", 20.0, 20.0), &regions);

        let ids = registry.stratified_stations().level(2).n(1).call();
        // One from AT11, one from AT12; the unresolvable station is in no
        // stratum.
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"STA.AT.0004".to_string()));

        let ids = registry.stratified_stations().level(2).n(10).call();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn stratified_single_candidate_strata_are_deterministic() {
        let regions = regions();
        let mut registry = StationRegistry::new();
        registry.insert(station("STA.AT.0001", 2.0, 2.0), &regions);
        registry.insert(station("STA.AT.0004", 7.0, 7.0), &regions);
        for _ in 0..5 {
            let mut ids = registry.stratified_stations().level(2).n(1).call();
            ids.sort();
            assert_eq!(ids, vec!["STA.AT.0001".to_string(), "STA.AT.0004".to_string()]);
        }
    }

    #[test]
    fn stratified_fraction_rounding_to_zero_takes_whole_stratum() {
        let regions = regions();
        let mut registry = StationRegistry::new();
        registry.insert(station("STA.AT.0001", 1.0, 1.0), &regions);
        registry.insert(station("STA.AT.0002", 2.0, 2.0), &regions);
        registry.insert(station("STA.AT.0003", 3.0, 3.0), &regions);

        let ids = registry.stratified_stations().level(2).frac(0.01).call();
        assert_eq!(ids.len(), 3);

        let ids = registry.stratified_stations().level(2).frac(0.67).call();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn stratified_filters_countries_and_level_zero_groups_by_country() {
        let regions = regions();
        let mut registry = StationRegistry::new();
        registry.insert(station("STA.AT.0001", 1.0, 1.0), &regions);
        let mut foreign = station("STA.DE.0001", 2.0, 2.0);
        foreign.country = "DE".to_string();
        registry.insert(foreign, &regions);

        let ids = registry
            .stratified_stations()
            .level(0)
            .n(5)
            .countries(vec!["at".to_string()])
            .call();
        assert_eq!(ids, vec!["STA.AT.0001".to_string()]);
    }
}
