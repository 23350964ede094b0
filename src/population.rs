//! Eurostat population figures per NUTS-2 region.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Most recent Eurostat population dataset year loaded by default.
pub const RECENT_POPULATION_YEAR: i32 = 2019;

/// One population figure for a NUTS-2 region and reference year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationRecord {
    /// NUTS-2 region code, e.g. "AT11".
    pub region: String,
    pub year: i32,
    pub population: u64,
}

/// Lookup of population by (NUTS-2 region, year).
#[derive(Debug, Clone, Default)]
pub struct PopulationIndex {
    by_region_year: HashMap<(String, i32), u64>,
}

impl PopulationIndex {
    pub fn new() -> PopulationIndex {
        PopulationIndex::default()
    }

    /// Inserts a record; a later record for the same (region, year) wins.
    pub fn insert(&mut self, record: PopulationRecord) {
        self.by_region_year
            .insert((record.region, record.year), record.population);
    }

    pub fn population(&self, region: &str, year: i32) -> Option<u64> {
        let population = self
            .by_region_year
            .get(&(region.to_string(), year))
            .copied();
        if population.is_none() {
            info!("No population figure for region {region} in {year}.");
        }
        population
    }

    /// Population for the most recent loaded dataset year.
    pub fn population_latest(&self, region: &str) -> Option<u64> {
        self.population(region, RECENT_POPULATION_YEAR)
    }

    pub fn len(&self) -> usize {
        self.by_region_year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_region_year.is_empty()
    }
}
