//! Versioned index over NUTS administrative regions.
//!
//! Regions are loaded once from ingestion records and queried read-only
//! afterwards. Point resolution goes through an R-tree over polygon bounding
//! boxes first, then an exact point-in-polygon test on the candidates, so a
//! lookup never scans every polygon of a level.

use crate::regions::error::RegionError;
use crate::types::region::{
    Region, RegionBoundary, RegionInfo, RegionRecord, CURRENT_NUTS_YEAR, EU_ISOCODES,
};
use geo::{BoundingRect, Contains, Geometry, Point};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::{BTreeMap, HashMap};
use wkt::TryFromWkt;

/// R-tree entry: one region's bounding box plus its key for the follow-up
/// exact test.
struct PolygonEnvelope {
    region_key: String,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for PolygonEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Read-only lookup structure over all loaded NUTS regions.
///
/// Built once with [`RegionIndex::from_records`] and passed by reference to
/// whatever needs geography. The per-(level, year) spatial trees are built
/// lazily on the first point resolution and never invalidated; the region
/// set cannot change after load.
pub struct RegionIndex {
    regions: BTreeMap<String, Region>,
    spatial: OnceCell<HashMap<(u8, i32), RTree<PolygonEnvelope>>>,
}

impl RegionIndex {
    /// Builds the index from ingestion records.
    ///
    /// Geometry is parsed up front. A level-1..3 record with malformed WKT
    /// fails the whole load; a level-0 record without usable geometry is
    /// kept (metadata queries still work for it) and logged.
    pub fn from_records(records: Vec<RegionRecord>) -> Result<RegionIndex, RegionError> {
        let mut regions = BTreeMap::new();
        for record in records {
            let geometry = parse_geometry(&record)?;
            regions.insert(
                record.key.clone(),
                Region {
                    key: record.key,
                    year: record.year,
                    level: record.level,
                    nuts_id: record.nuts_id,
                    country_code: record.country_code.to_uppercase(),
                    name: record.name,
                    fid: record.fid,
                    eu_member: record.eu_member,
                    geometry_wkt: record.geometry,
                    geometry,
                },
            );
        }
        info!("Region index loaded with {} regions.", regions.len());
        Ok(RegionIndex {
            regions,
            spatial: OnceCell::new(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Region> {
        self.regions.get(key)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region boundaries grouped by level, keyed by NUTS id.
    ///
    /// `level` restricts the output to one level (default: all four),
    /// `countries` to a set of ISO codes (default: the EU list). Requested
    /// levels always appear in the output, empty when nothing matches.
    pub fn boundaries(
        &self,
        level: Option<u8>,
        countries: Option<&[String]>,
        year: Option<i32>,
    ) -> BTreeMap<u8, BTreeMap<String, RegionBoundary>> {
        let mut result = BTreeMap::new();
        for (level, regions) in self.select(level, countries, year) {
            let entry: &mut BTreeMap<String, RegionBoundary> =
                result.entry(level).or_default();
            for region in regions {
                entry.insert(
                    region.nuts_id.clone(),
                    RegionBoundary {
                        name: region.name.clone(),
                        country_code: region.country_code.clone(),
                        geometry: region.geometry_wkt.clone(),
                    },
                );
            }
        }
        result
    }

    /// Same selection as [`RegionIndex::boundaries`] without the geometry
    /// payload.
    pub fn metadata(
        &self,
        level: Option<u8>,
        countries: Option<&[String]>,
        year: Option<i32>,
    ) -> BTreeMap<u8, BTreeMap<String, RegionInfo>> {
        let mut result = BTreeMap::new();
        for (level, regions) in self.select(level, countries, year) {
            let entry: &mut BTreeMap<String, RegionInfo> = result.entry(level).or_default();
            for region in regions {
                entry.insert(
                    region.nuts_id.clone(),
                    RegionInfo {
                        name: region.name.clone(),
                        country_code: region.country_code.clone(),
                    },
                );
            }
        }
        result
    }

    /// Maps each EU country code to its level-0 region key. Codes without a
    /// loaded level-0 region are skipped and logged, not errors.
    pub fn country_lookup(&self) -> BTreeMap<String, String> {
        let mut lookup = BTreeMap::new();
        for code in EU_ISOCODES {
            let region = self
                .regions
                .values()
                .find(|r| r.level == 0 && r.country_code == code);
            match region {
                Some(region) => {
                    lookup.insert(code.to_string(), region.key.clone());
                }
                None => debug!("No level-0 region loaded for country code {code}."),
            }
        }
        lookup
    }

    /// Resolves a geographic point to the region containing it at the given
    /// level and classification year.
    ///
    /// `projection` names the CRS of the coordinates; only geographic
    /// WGS84-family systems are supported, anything else resolves to
    /// `None`. Zero matches and more than one match both resolve to `None`
    /// with an info log; overlap between sibling polygons is a data problem
    /// the caller cannot act on, so an ambiguous point is treated as
    /// unlocatable rather than assigned arbitrarily.
    pub fn resolve_point(
        &self,
        latitude: f64,
        longitude: f64,
        projection: &str,
        level: u8,
        year: i32,
    ) -> Option<&Region> {
        if !projection_supported(projection) {
            info!("Unsupported CRS '{projection}', cannot resolve point.");
            return None;
        }
        let Some(tree) = self.spatial().get(&(level, year)) else {
            info!("No level-{level} regions indexed for year {year}.");
            return None;
        };
        let point = Point::new(longitude, latitude);
        let query = AABB::from_point([longitude, latitude]);
        let matched: Vec<&Region> = tree
            .locate_in_envelope_intersecting(&query)
            .filter_map(|candidate| self.regions.get(&candidate.region_key))
            .filter(|region| {
                region
                    .geometry
                    .as_ref()
                    .is_some_and(|geometry| geometry.contains(&point))
            })
            .collect();
        match matched.len() {
            1 => Some(matched[0]),
            0 => {
                info!("No level-{level} region found for point ({latitude}, {longitude}).");
                None
            }
            n => {
                info!(
                    "Point ({latitude}, {longitude}) lies in {n} level-{level} regions, \
                     treating as unresolved."
                );
                None
            }
        }
    }

    fn select(
        &self,
        level: Option<u8>,
        countries: Option<&[String]>,
        year: Option<i32>,
    ) -> Vec<(u8, Vec<&Region>)> {
        let year = year.unwrap_or(CURRENT_NUTS_YEAR);
        let levels: Vec<u8> = match level {
            Some(level) => vec![level],
            None => (0..=3).collect(),
        };
        let countries: Vec<String> = match countries {
            Some(countries) => countries.iter().map(|c| c.to_uppercase()).collect(),
            None => EU_ISOCODES.iter().map(|c| c.to_string()).collect(),
        };
        levels
            .into_iter()
            .map(|level| {
                let regions = self
                    .regions
                    .values()
                    .filter(|r| {
                        r.year == year
                            && r.level == level
                            && countries.contains(&r.country_code)
                    })
                    .collect();
                (level, regions)
            })
            .collect()
    }

    fn spatial(&self) -> &HashMap<(u8, i32), RTree<PolygonEnvelope>> {
        self.spatial.get_or_init(|| {
            let mut envelopes: HashMap<(u8, i32), Vec<PolygonEnvelope>> = HashMap::new();
            for region in self.regions.values() {
                let Some(geometry) = &region.geometry else {
                    continue;
                };
                let Some(rect) = geometry.bounding_rect() else {
                    continue;
                };
                envelopes
                    .entry((region.level, region.year))
                    .or_default()
                    .push(PolygonEnvelope {
                        region_key: region.key.clone(),
                        aabb: AABB::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        ),
                    });
            }
            envelopes
                .into_iter()
                .map(|(key, entries)| (key, RTree::bulk_load(entries)))
                .collect()
        })
    }
}

fn projection_supported(projection: &str) -> bool {
    // EPSG:4979 is the 3-D companion of WGS84; lat/lon read the same.
    matches!(
        projection.trim().to_uppercase().as_str(),
        "EPSG:4326" | "EPSG:4979" | "WGS84"
    )
}

fn parse_geometry(record: &RegionRecord) -> Result<Option<Geometry<f64>>, RegionError> {
    match Geometry::try_from_wkt_str(record.geometry.trim()) {
        Ok(geometry) => Ok(Some(geometry)),
        Err(err) if record.level == 0 => {
            warn!(
                "Level-0 region '{}' has no usable geometry ({err:?}), keeping metadata only.",
                record.key
            );
            Ok(None)
        }
        Err(err) => Err(RegionError::InvalidGeometry {
            key: record.key.clone(),
            detail: format!("{err:?}"),
        }),
    }
}
