//! Emissions inventory store and sector-level aggregation.

use crate::types::emissions::{EmissionsInput, SectorGroup};
use bon::bon;
use log::info;
use polars::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmissionsError {
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

const COL_YEAR: &str = "year";
const COL_POLLUTANT: &str = "pollutant";
const COL_COUNTRY: &str = "country";
const COL_SECTOR: &str = "sector";
const COL_SECTOR_GROUP: &str = "sector_group";
const COL_UNIT: &str = "unit";
const COL_EMISSIONS: &str = "emissions";

/// country -> year -> pollutant -> sector group -> summed emissions.
pub type SectorTotals = BTreeMap<String, BTreeMap<i32, BTreeMap<String, BTreeMap<String, f64>>>>;

/// In-memory emissions store.
///
/// The sector group is derived from the raw sector code at insert time, so
/// aggregation never reclassifies. Reported "NATIONAL_TOTAL" rows keep that
/// group and stay queryable as the country-wide denominator.
pub struct EmissionsStore {
    frame: DataFrame,
}

impl EmissionsStore {
    pub fn new() -> EmissionsStore {
        EmissionsStore {
            frame: DataFrame::empty_with_schema(&schema()),
        }
    }

    pub fn insert(&mut self, records: &[EmissionsInput]) -> Result<usize, EmissionsError> {
        if records.is_empty() {
            return Ok(0);
        }
        let frame = df!(
            COL_YEAR => records.iter().map(|r| r.year).collect::<Vec<i32>>(),
            COL_POLLUTANT => records.iter().map(|r| r.pollutant.clone()).collect::<Vec<String>>(),
            COL_COUNTRY => records.iter().map(|r| r.country.clone()).collect::<Vec<String>>(),
            COL_SECTOR => records.iter().map(|r| r.sector_code.clone()).collect::<Vec<String>>(),
            COL_SECTOR_GROUP => records
                .iter()
                .map(|r| SectorGroup::from_sector_code(&r.sector_code).as_str().to_string())
                .collect::<Vec<String>>(),
            COL_UNIT => records.iter().map(|r| r.unit.clone()).collect::<Vec<String>>(),
            COL_EMISSIONS => records.iter().map(|r| r.emissions).collect::<Vec<f64>>(),
        )?;
        self.frame.vstack_mut(&frame)?;
        Ok(records.len())
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

impl Default for EmissionsStore {
    fn default() -> Self {
        EmissionsStore::new()
    }
}

#[bon]
impl EmissionsStore {
    /// Emissions summed per (country, year, pollutant, sector group), with
    /// optional filters on each dimension. An empty store (or filters that
    /// match nothing) yields an empty map, logged.
    #[builder]
    pub fn sectors_info(
        &self,
        year: Option<i32>,
        country: Option<String>,
        sector_group: Option<SectorGroup>,
        pollutant: Option<String>,
    ) -> Result<SectorTotals, EmissionsError> {
        if self.is_empty() {
            info!("Emissions store is empty.");
            return Ok(BTreeMap::new());
        }
        let mut lazy = self.frame.clone().lazy();
        if let Some(year) = year {
            lazy = lazy.filter(col(COL_YEAR).eq(lit(year)));
        }
        if let Some(country) = country {
            lazy = lazy.filter(col(COL_COUNTRY).eq(lit(country)));
        }
        if let Some(group) = sector_group {
            lazy = lazy.filter(col(COL_SECTOR_GROUP).eq(lit(group.as_str())));
        }
        if let Some(pollutant) = pollutant {
            lazy = lazy.filter(col(COL_POLLUTANT).eq(lit(pollutant)));
        }
        let frame = lazy
            .group_by([
                col(COL_COUNTRY),
                col(COL_YEAR),
                col(COL_POLLUTANT),
                col(COL_SECTOR_GROUP),
            ])
            .agg([col(COL_EMISSIONS).sum().alias("total_emissions")])
            .collect()?;

        let country = frame.column(COL_COUNTRY)?.str()?;
        let year = frame.column(COL_YEAR)?.i32()?;
        let pollutant = frame.column(COL_POLLUTANT)?.str()?;
        let group = frame.column(COL_SECTOR_GROUP)?.str()?;
        let total = frame.column("total_emissions")?.f64()?;

        let mut result: SectorTotals = BTreeMap::new();
        for i in 0..frame.height() {
            let (Some(c), Some(y), Some(p), Some(g), Some(t)) = (
                country.get(i),
                year.get(i),
                pollutant.get(i),
                group.get(i),
                total.get(i),
            ) else {
                continue;
            };
            result
                .entry(c.to_string())
                .or_default()
                .entry(y)
                .or_default()
                .entry(p.to_string())
                .or_default()
                .insert(g.to_string(), t);
        }
        Ok(result)
    }
}

fn schema() -> Schema {
    Schema::from_iter([
        Field::new(COL_YEAR.into(), DataType::Int32),
        Field::new(COL_POLLUTANT.into(), DataType::String),
        Field::new(COL_COUNTRY.into(), DataType::String),
        Field::new(COL_SECTOR.into(), DataType::String),
        Field::new(COL_SECTOR_GROUP.into(), DataType::String),
        Field::new(COL_UNIT.into(), DataType::String),
        Field::new(COL_EMISSIONS.into(), DataType::Float64),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, pollutant: &str, country: &str, sector: &str, emissions: f64) -> EmissionsInput {
        EmissionsInput {
            year,
            pollutant: pollutant.to_string(),
            country: country.to_string(),
            sector_code: sector.to_string(),
            unit: "Gg".to_string(),
            emissions,
        }
    }

    #[test]
    fn sums_by_sector_group() {
        let mut store = EmissionsStore::new();
        store
            .insert(&[
                record(2020, "NOx", "AT", "1A3bi", 10.0),
                record(2020, "NOx", "AT", "1A3bii", 5.0),
                record(2020, "NOx", "AT", "3Da1", 7.0),
                record(2019, "NOx", "AT", "1A3bi", 99.0),
            ])
            .unwrap();
        let info = store.sectors_info().year(2020).call().unwrap();
        let at_2020 = &info["AT"][&2020]["NOx"];
        assert_eq!(at_2020["Road transport"], 15.0);
        assert_eq!(at_2020["Agriculture"], 7.0);
        assert!(!info["AT"].contains_key(&2019));
    }

    #[test]
    fn national_total_rows_stay_their_own_group() {
        let mut store = EmissionsStore::new();
        store
            .insert(&[record(2020, "SOx", "EU28", "NATIONAL_TOTAL", 100.0)])
            .unwrap();
        let info = store.sectors_info().year(2020).call().unwrap();
        assert_eq!(info["EU28"][&2020]["SOx"]["NATIONAL_TOTAL"], 100.0);
    }

    #[test]
    fn filters_by_group_country_and_pollutant() {
        let mut store = EmissionsStore::new();
        store
            .insert(&[
                record(2020, "NOx", "AT", "1A3bi", 10.0),
                record(2020, "SOx", "AT", "1A3bi", 20.0),
                record(2020, "NOx", "DE", "5A", 30.0),
            ])
            .unwrap();
        let info = store
            .sectors_info()
            .sector_group(SectorGroup::RoadTransport)
            .pollutant("NOx".to_string())
            .country("AT".to_string())
            .call()
            .unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info["AT"][&2020]["NOx"]["Road transport"], 10.0);
    }

    #[test]
    fn empty_store_yields_empty_map() {
        let store = EmissionsStore::new();
        assert!(store.sectors_info().call().unwrap().is_empty());
    }
}
