//! Columnar store for observation readings.

use crate::pollutants::catalog::PollutantCatalog;
use crate::readings::error::ReadingError;
use crate::types::reading::ReadingRecord;
use chrono::Datelike;
use log::info;
use polars::prelude::*;
use std::collections::HashSet;

pub(crate) const COL_KEY: &str = "key";
pub(crate) const COL_STATION: &str = "station";
pub(crate) const COL_COUNTRY: &str = "country";
pub(crate) const COL_POLLUTANT: &str = "pollutant";
pub(crate) const COL_YEAR: &str = "year";
pub(crate) const COL_MONTH: &str = "month";
pub(crate) const COL_DAY: &str = "day";
pub(crate) const COL_VALUE: &str = "value";
pub(crate) const COL_UNIT: &str = "unit";
pub(crate) const COL_VALIDITY: &str = "validity";
pub(crate) const COL_VERIFICATION: &str = "verification";

/// In-memory reading store backing the aggregation queries.
///
/// Readings land in a single DataFrame with the pollutant already resolved
/// to its canonical key and the timestamp broken into (year, month, day) in
/// the source timezone, which is what every aggregation groups on. Inserts
/// are idempotent on the reading key, so re-ingesting a file is harmless.
pub struct ReadingStore {
    frame: DataFrame,
    keys: HashSet<String>,
}

impl ReadingStore {
    pub fn new() -> ReadingStore {
        ReadingStore {
            frame: DataFrame::empty_with_schema(&schema()),
            keys: HashSet::new(),
        }
    }

    /// Inserts a batch of readings, returning how many rows were added.
    ///
    /// Rows whose key is already present are skipped silently; rows whose
    /// pollutant name resolves to nothing in the catalog are skipped with a
    /// log line.
    pub fn insert(
        &mut self,
        records: &[ReadingRecord],
        catalog: &PollutantCatalog,
    ) -> Result<usize, ReadingError> {
        let mut keys: Vec<String> = Vec::new();
        let mut stations: Vec<String> = Vec::new();
        let mut countries: Vec<String> = Vec::new();
        let mut pollutants: Vec<String> = Vec::new();
        let mut years: Vec<i32> = Vec::new();
        let mut months: Vec<i32> = Vec::new();
        let mut days: Vec<i32> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        let mut units: Vec<String> = Vec::new();
        let mut validities: Vec<i32> = Vec::new();
        let mut verifications: Vec<i32> = Vec::new();

        let mut batch_keys: HashSet<&str> = HashSet::new();
        for record in records {
            if self.keys.contains(&record.key) || !batch_keys.insert(&record.key) {
                continue;
            }
            let Some(pollutant) = catalog.canonical_key(&record.pollutant) else {
                info!(
                    "Skipping reading '{}' with unknown pollutant '{}'.",
                    record.key, record.pollutant
                );
                continue;
            };
            keys.push(record.key.clone());
            stations.push(record.station.clone());
            countries.push(record.country.to_uppercase());
            pollutants.push(pollutant.to_string());
            years.push(record.timestamp.year());
            months.push(record.timestamp.month() as i32);
            days.push(record.timestamp.day() as i32);
            values.push(record.value);
            units.push(record.unit.clone());
            validities.push(record.validity);
            verifications.push(record.verification);
        }

        if keys.is_empty() {
            return Ok(0);
        }
        let inserted = keys.len();
        let frame = df!(
            COL_KEY => keys.clone(),
            COL_STATION => stations,
            COL_COUNTRY => countries,
            COL_POLLUTANT => pollutants,
            COL_YEAR => years,
            COL_MONTH => months,
            COL_DAY => days,
            COL_VALUE => values,
            COL_UNIT => units,
            COL_VALIDITY => validities,
            COL_VERIFICATION => verifications,
        )?;
        self.frame.vstack_mut(&frame)?;
        self.keys.extend(keys);
        Ok(inserted)
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub(crate) fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        ReadingStore::new()
    }
}

fn schema() -> Schema {
    Schema::from_iter([
        Field::new(COL_KEY.into(), DataType::String),
        Field::new(COL_STATION.into(), DataType::String),
        Field::new(COL_COUNTRY.into(), DataType::String),
        Field::new(COL_POLLUTANT.into(), DataType::String),
        Field::new(COL_YEAR.into(), DataType::Int32),
        Field::new(COL_MONTH.into(), DataType::Int32),
        Field::new(COL_DAY.into(), DataType::Int32),
        Field::new(COL_VALUE.into(), DataType::Float64),
        Field::new(COL_UNIT.into(), DataType::String),
        Field::new(COL_VALIDITY.into(), DataType::Int32),
        Field::new(COL_VERIFICATION.into(), DataType::Int32),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn reading(key: &str, pollutant: &str, value: f64) -> ReadingRecord {
        let cet = FixedOffset::east_opt(3600).unwrap();
        ReadingRecord {
            key: key.to_string(),
            timestamp: cet.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap(),
            country: "at".to_string(),
            station: "STA.AT.0001".to_string(),
            pollutant: pollutant.to_string(),
            value,
            unit: "ug/m3".to_string(),
            validity: 1,
            verification: 1,
        }
    }

    #[test]
    fn insert_is_idempotent_on_key() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let mut store = ReadingStore::new();
        let batch = vec![reading("r1", "O3", 10.0), reading("r2", "O3", 20.0)];
        assert_eq!(store.insert(&batch, &catalog).unwrap(), 2);
        assert_eq!(store.insert(&batch, &catalog).unwrap(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn insert_resolves_aliases_and_skips_unknown_pollutants() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let mut store = ReadingStore::new();
        let batch = vec![
            reading("r1", "PM2.5", 10.0),
            reading("r2", "mystery_gas", 20.0),
        ];
        assert_eq!(store.insert(&batch, &catalog).unwrap(), 1);
        let pollutant = store.frame().column(COL_POLLUTANT).unwrap();
        assert_eq!(pollutant.str().unwrap().get(0), Some("PM25"));
    }

    #[test]
    fn insert_normalizes_country_codes_and_dates() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let mut store = ReadingStore::new();
        store
            .insert(&[reading("r1", "O3", 10.0)], &catalog)
            .unwrap();
        let frame = store.frame();
        assert_eq!(
            frame.column(COL_COUNTRY).unwrap().str().unwrap().get(0),
            Some("AT")
        );
        assert_eq!(frame.column(COL_YEAR).unwrap().i32().unwrap().get(0), Some(2020));
        assert_eq!(frame.column(COL_MONTH).unwrap().i32().unwrap().get(0), Some(6));
        assert_eq!(frame.column(COL_DAY).unwrap().i32().unwrap().get(0), Some(1));
    }
}
