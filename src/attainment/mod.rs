//! Annual levels compared against regulatory calendar-year targets.

use crate::pollutants::catalog::PollutantCatalog;
use crate::population::PopulationIndex;
use crate::readings::aggregate::ReadingAggregator;
use crate::readings::error::ReadingError;
use crate::readings::store::ReadingStore;
use crate::regions::index::RegionIndex;
use crate::stations::StationRegistry;
use crate::types::pollutant::Measurement;
use bon::bon;
use log::info;
use serde::Serialize;
use std::collections::BTreeSet;

/// One (country, pollutant, year) attainment cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttainmentRow {
    pub country: String,
    pub pollutant: String,
    pub year: i32,
    /// Annual mean level, absent when the year has no data.
    pub actual: Option<f64>,
    /// Calendar-year limit value.
    pub target: f64,
    pub unit: String,
    /// actual / target.
    pub ratio: Option<f64>,
    /// Signed deviation from target, e.g. "+2.6%"; "-" when undefined.
    pub versus_target: String,
}

/// One station on the target bubble map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationBubble {
    pub station: String,
    pub pollutant: String,
    pub country: String,
    pub longitude: f64,
    pub latitude: f64,
    /// NUTS-2 id of the station's region.
    pub region_2: String,
    pub region_2_name: String,
    /// NUTS-2 population, the bubble size.
    pub population: u64,
    pub target_value: f64,
    pub day_avg: f64,
    /// day_avg / target.
    pub ratio: f64,
    pub versus_target: String,
}

/// Joins annual observation levels against calendar-year targets.
pub struct AttainmentEvaluator<'a> {
    store: &'a ReadingStore,
    catalog: &'a PollutantCatalog,
}

#[bon]
impl<'a> AttainmentEvaluator<'a> {
    pub fn new(store: &'a ReadingStore, catalog: &'a PollutantCatalog) -> AttainmentEvaluator<'a> {
        AttainmentEvaluator { store, catalog }
    }

    /// Attainment rows per (country, pollutant, year).
    ///
    /// Pollutants default to every pollutant with a calendar-year target;
    /// ones without such a target are dropped from an explicit list. A
    /// (country, pollutant) pair appears only when it has data in at least
    /// one requested year; within a pair, dataless years render as "-".
    #[builder]
    pub fn attainment(
        &self,
        years: Option<Vec<i32>>,
        countries: Option<Vec<String>>,
        pollutants: Option<Vec<String>>,
    ) -> Result<Vec<AttainmentRow>, ReadingError> {
        let pollutants: Vec<String> = match pollutants {
            Some(pollutants) => self
                .catalog
                .resolve_keys(&pollutants)
                .into_iter()
                .filter(|p| {
                    let has_target = self
                        .catalog
                        .target(p, Measurement::CalendarYear)
                        .is_some();
                    if !has_target {
                        info!("Pollutant {p} has no calendar-year target, dropping.");
                    }
                    has_target
                })
                .collect(),
            None => self.catalog.pollutants_with_target(Measurement::CalendarYear),
        };

        let annual = ReadingAggregator::new(self.store, self.catalog)
            .annual()
            .maybe_years(years.clone())
            .maybe_countries(countries)
            .pollutants(pollutants.clone())
            .call()?;

        let years: Vec<i32> = match years {
            Some(mut years) => {
                years.sort_unstable();
                years
            }
            None => annual
                .values()
                .flat_map(|by_year| by_year.keys().copied())
                .collect::<BTreeSet<i32>>()
                .into_iter()
                .collect(),
        };

        let mut rows = Vec::new();
        for (country, by_year) in &annual {
            for pollutant in &pollutants {
                let Some(target) = self.catalog.target(pollutant, Measurement::CalendarYear)
                else {
                    continue;
                };
                let has_data = by_year.values().any(|means| means.contains_key(pollutant));
                if !has_data {
                    continue;
                }
                for &year in &years {
                    let actual = by_year
                        .get(&year)
                        .and_then(|means| means.get(pollutant))
                        .copied();
                    let ratio = actual.map(|actual| actual / target.value);
                    rows.push(AttainmentRow {
                        country: country.clone(),
                        pollutant: pollutant.clone(),
                        year,
                        actual,
                        target: target.value,
                        unit: target.unit.clone(),
                        ratio,
                        versus_target: format_versus_target(ratio),
                    });
                }
            }
        }
        Ok(rows)
    }

    /// Per-station bubble-map rows over a date window.
    ///
    /// Station day averages are joined with the station's NUTS-2 region and
    /// its population; stations without a resolved region or a population
    /// figure drop out, as does any pollutant without a calendar-year
    /// target.
    #[builder]
    pub fn bubble_map(
        &self,
        start_date: &str,
        end_date: &str,
        pollutants: Option<Vec<String>>,
        stations: &StationRegistry,
        regions: &RegionIndex,
        population: &PopulationIndex,
    ) -> Result<Vec<StationBubble>, ReadingError> {
        let pollutants = pollutants.unwrap_or_else(|| {
            vec!["PM25".to_string(), "PM10".to_string(), "NO2".to_string()]
        });
        let averages = ReadingAggregator::new(self.store, self.catalog)
            .station_day_averages()
            .start_date(start_date)
            .end_date(end_date)
            .pollutants(pollutants)
            .call()?;

        let mut rows = Vec::new();
        for average in averages {
            let Some(target) = self
                .catalog
                .target(&average.pollutant, Measurement::CalendarYear)
            else {
                info!(
                    "Pollutant {} has no calendar-year target, dropping from bubble map.",
                    average.pollutant
                );
                continue;
            };
            let Some(station) = stations.get(&average.station) else {
                info!("Station {} is not registered, dropping.", average.station);
                continue;
            };
            let Some(region) = station
                .region_2
                .as_deref()
                .and_then(|key| regions.get(key))
            else {
                continue;
            };
            let Some(population) = population.population_latest(&region.nuts_id) else {
                continue;
            };
            let ratio = average.day_avg / target.value;
            rows.push(StationBubble {
                station: station.id.clone(),
                pollutant: average.pollutant.clone(),
                country: station.country.clone(),
                longitude: station.longitude,
                latitude: station.latitude,
                region_2: region.nuts_id.clone(),
                region_2_name: region.name.clone(),
                population,
                target_value: target.value,
                day_avg: average.day_avg,
                ratio,
                versus_target: format_versus_target(Some(ratio)),
            });
        }
        Ok(rows)
    }
}

/// Renders an attainment ratio as the signed percentage deviation from the
/// target: 1.026 is 2.6% over target, so "+2.6%". Undefined ratios render
/// as "-".
fn format_versus_target(ratio: Option<f64>) -> String {
    match ratio {
        Some(ratio) if ratio.is_finite() => format!("{:+.1}%", (ratio - 1.0) * 100.0),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::PopulationRecord;
    use crate::types::reading::ReadingRecord;
    use crate::types::region::{RegionRecord, CURRENT_NUTS_YEAR};
    use crate::types::station::StationRecord;
    use chrono::{FixedOffset, TimeZone};

    fn reading(key: &str, pollutant: &str, (y, m, d): (i32, u32, u32), value: f64) -> ReadingRecord {
        let cet = FixedOffset::east_opt(3600).unwrap();
        ReadingRecord {
            key: key.to_string(),
            timestamp: cet.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
            country: "AT".to_string(),
            station: "STA.AT.0001".to_string(),
            pollutant: pollutant.to_string(),
            value,
            unit: "ug/m3".to_string(),
            validity: 1,
            verification: 1,
        }
    }

    #[test]
    fn formats_ratio_as_signed_deviation() {
        assert_eq!(format_versus_target(Some(1.026)), "+2.6%");
        assert_eq!(format_versus_target(Some(0.5)), "-50.0%");
        assert_eq!(format_versus_target(Some(1.0)), "+0.0%");
        assert_eq!(format_versus_target(None), "-");
        assert_eq!(format_versus_target(Some(f64::NAN)), "-");
    }

    #[test]
    fn attainment_joins_actuals_with_targets() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let mut store = ReadingStore::new();
        store
            .insert(&[reading("r1", "NO2", (2020, 6, 1), 41.04)], &catalog)
            .unwrap();
        let evaluator = AttainmentEvaluator::new(&store, &catalog);
        let rows = evaluator
            .attainment()
            .years(vec![2020, 2021])
            .countries(vec!["AT".to_string()])
            .call()
            .unwrap();

        assert_eq!(rows.len(), 2);
        let row_2020 = &rows[0];
        assert_eq!(row_2020.country, "AT");
        assert_eq!(row_2020.pollutant, "NO2");
        assert_eq!(row_2020.target, 40.0);
        assert_eq!(row_2020.actual, Some(41.04));
        assert_eq!(row_2020.versus_target, "+2.6%");

        let row_2021 = &rows[1];
        assert_eq!(row_2021.year, 2021);
        assert_eq!(row_2021.actual, None);
        assert_eq!(row_2021.versus_target, "-");
    }

    #[test]
    fn attainment_skips_pollutants_without_calendar_year_target() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let mut store = ReadingStore::new();
        store
            .insert(&[reading("r1", "O3", (2020, 6, 1), 100.0)], &catalog)
            .unwrap();
        let evaluator = AttainmentEvaluator::new(&store, &catalog);
        assert!(evaluator.attainment().call().unwrap().is_empty());
        assert!(evaluator
            .attainment()
            .pollutants(vec!["O3".to_string()])
            .call()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn bubble_map_joins_stations_regions_and_population() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let regions = RegionIndex::from_records(vec![RegionRecord {
            key: "AT11-2".to_string(),
            year: CURRENT_NUTS_YEAR,
            level: 2,
            nuts_id: "AT11".to_string(),
            country_code: "AT".to_string(),
            name: "Burgenland".to_string(),
            fid: "AT11".to_string(),
            eu_member: true,
            geometry: "POLYGON((0 0,5 0,5 5,0 5,0 0))".to_string(),
        }])
        .unwrap();

        let mut stations = StationRegistry::new();
        stations.insert(
            StationRecord {
                id: "STA.AT.0001".to_string(),
                country: "AT".to_string(),
                network: "NET.AT".to_string(),
                eoi_code: "AT0001A".to_string(),
                national_code: "0001".to_string(),
                projection: "EPSG:4326".to_string(),
                longitude: 2.0,
                latitude: 2.0,
                altitude: 200.0,
                area: "urban".to_string(),
            },
            &regions,
        );

        let mut population = PopulationIndex::new();
        population.insert(PopulationRecord {
            region: "AT11".to_string(),
            year: 2019,
            population: 294_436,
        });

        let mut store = ReadingStore::new();
        store
            .insert(&[reading("r1", "NO2", (2020, 6, 1), 20.0)], &catalog)
            .unwrap();

        let evaluator = AttainmentEvaluator::new(&store, &catalog);
        let bubbles = evaluator
            .bubble_map()
            .start_date("2020-06-01")
            .end_date("2020-06-30")
            .stations(&stations)
            .regions(&regions)
            .population(&population)
            .call()
            .unwrap();

        assert_eq!(bubbles.len(), 1);
        let bubble = &bubbles[0];
        assert_eq!(bubble.region_2, "AT11");
        assert_eq!(bubble.region_2_name, "Burgenland");
        assert_eq!(bubble.population, 294_436);
        assert_eq!(bubble.day_avg, 20.0);
        assert_eq!(bubble.ratio, 0.5);
        assert_eq!(bubble.versus_target, "-50.0%");
    }

    #[test]
    fn bubble_map_drops_stations_without_population() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let regions = RegionIndex::from_records(vec![]).unwrap();
        let stations = StationRegistry::new();
        let population = PopulationIndex::new();
        let mut store = ReadingStore::new();
        store
            .insert(&[reading("r1", "NO2", (2020, 6, 1), 20.0)], &catalog)
            .unwrap();
        let evaluator = AttainmentEvaluator::new(&store, &catalog);
        let bubbles = evaluator
            .bubble_map()
            .start_date("2020-06-01")
            .end_date("2020-06-30")
            .stations(&stations)
            .regions(&regions)
            .population(&population)
            .call()
            .unwrap();
        assert!(bubbles.is_empty());
    }
}
