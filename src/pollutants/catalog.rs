//! Pollutant catalog: canonical keys, per-source aliases, regulatory targets.
//!
//! Every data source names pollutants differently (the satellite feed says
//! "pm2p5_conc", the observation feed "PM2.5", the emissions inventory
//! "PM2.5"); the catalog is the single place that resolves those
//! vocabularies to the canonical keys the rest of the crate is keyed by.

use crate::types::pollutant::{AliasSource, Measurement, Pollutant, Target};
use bon::bon;
use itertools::Itertools;
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::types::region::EU_ISOCODES;

/// Target payload returned by [`PollutantCatalog::all_targets`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetValue {
    pub value: f64,
    pub unit: String,
    pub count_limit: Option<u32>,
}

/// country -> year -> pollutant -> measurement -> target.
pub type AllTargets =
    BTreeMap<String, BTreeMap<i32, BTreeMap<String, BTreeMap<String, TargetValue>>>>;

/// Registry of pollutants and their targets.
///
/// Targets are not tracked by country or year; the same limit values apply
/// to every EU country in every year.
#[derive(Debug, Clone, Default)]
pub struct PollutantCatalog {
    pollutants: Vec<Pollutant>,
    targets: HashMap<String, Vec<Target>>,
}

impl PollutantCatalog {
    pub fn new() -> PollutantCatalog {
        PollutantCatalog::default()
    }

    pub fn insert(&mut self, pollutant: Pollutant) {
        self.pollutants.push(pollutant);
    }

    pub fn add_target(&mut self, pollutant: &str, target: Target) {
        self.targets
            .entry(pollutant.to_string())
            .or_default()
            .push(target);
    }

    /// Resolves any name (canonical key or alias from any source
    /// vocabulary) to the canonical pollutant key, case-insensitively.
    /// A miss is logged and returns `None`.
    pub fn canonical_key(&self, name: &str) -> Option<&str> {
        let found = self.pollutants.iter().find(|p| {
            let matches = |candidate: &Option<String>| {
                candidate
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(name))
            };
            p.key.eq_ignore_ascii_case(name)
                || matches(&p.satellite_key)
                || matches(&p.observation_key)
                || matches(&p.emissions_key)
        });
        if found.is_none() {
            info!("No pollutant found for name '{name}'.");
        }
        found.map(|p| p.key.as_str())
    }

    /// Resolves a list of names, dropping unknowns (each logged by
    /// [`PollutantCatalog::canonical_key`]) and duplicates.
    pub fn resolve_keys(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter_map(|name| self.canonical_key(name))
            .map(str::to_string)
            .unique()
            .collect()
    }

    /// Canonical keys in catalog order.
    pub fn keys(&self) -> Vec<String> {
        self.pollutants.iter().map(|p| p.key.clone()).collect()
    }

    /// Canonical keys of pollutants the observation feed reports.
    pub fn observation_keys(&self) -> Vec<String> {
        self.pollutants
            .iter()
            .filter(|p| p.observation_key.is_some())
            .map(|p| p.key.clone())
            .collect()
    }

    /// Alias -> canonical key for one source vocabulary.
    pub fn aliases_for_source(&self, source: AliasSource) -> BTreeMap<String, String> {
        self.pollutants
            .iter()
            .filter_map(|p| {
                let alias = match source {
                    AliasSource::Satellite => p.satellite_key.as_ref(),
                    AliasSource::Observation => p.observation_key.as_ref(),
                    AliasSource::Emissions => p.emissions_key.as_ref(),
                };
                alias.map(|alias| (alias.clone(), p.key.clone()))
            })
            .collect()
    }

    /// All targets for a pollutant (named by key or alias); empty when the
    /// pollutant has none.
    pub fn targets_for(&self, pollutant: &str) -> &[Target] {
        self.canonical_key(pollutant)
            .and_then(|key| self.targets.get(key))
            .map_or(&[], Vec::as_slice)
    }

    /// The target for one measurement basis, if the directive defines one.
    pub fn target(&self, pollutant: &str, measurement: Measurement) -> Option<&Target> {
        self.targets_for(pollutant)
            .iter()
            .find(|t| t.measurement == measurement)
    }

    /// Canonical keys of pollutants that carry a target on the given basis.
    pub fn pollutants_with_target(&self, measurement: Measurement) -> Vec<String> {
        self.pollutants
            .iter()
            .filter(|p| {
                self.targets
                    .get(&p.key)
                    .is_some_and(|targets| targets.iter().any(|t| t.measurement == measurement))
            })
            .map(|p| p.key.clone())
            .collect()
    }
}

#[bon]
impl PollutantCatalog {
    /// Targets for all (or the requested) pollutants, replicated across the
    /// requested years and countries. Years default to 2016..=2024,
    /// countries to the EU list; pollutants without targets are absent.
    #[builder]
    pub fn all_targets(
        &self,
        years: Option<Vec<i32>>,
        countries: Option<Vec<String>>,
        pollutants: Option<Vec<String>>,
    ) -> AllTargets {
        let years = years.unwrap_or_else(|| (2016..=2024).collect());
        let countries: Vec<String> = match countries {
            Some(countries) => countries.iter().map(|c| c.to_uppercase()).collect(),
            None => EU_ISOCODES.iter().map(|c| c.to_string()).collect(),
        };
        let pollutants = match pollutants {
            Some(pollutants) => self.resolve_keys(&pollutants),
            None => self.keys(),
        };

        let mut targets: BTreeMap<String, BTreeMap<String, TargetValue>> = BTreeMap::new();
        for key in pollutants {
            let Some(pollutant_targets) = self.targets.get(&key) else {
                continue;
            };
            let by_measurement = pollutant_targets
                .iter()
                .map(|t| {
                    (
                        t.measurement.as_str().to_string(),
                        TargetValue {
                            value: t.value,
                            unit: t.unit.clone(),
                            count_limit: t.count_limit,
                        },
                    )
                })
                .collect();
            targets.insert(key, by_measurement);
        }

        countries
            .into_iter()
            .map(|country| {
                let per_year = years.iter().map(|&year| (year, targets.clone())).collect();
                (country, per_year)
            })
            .collect()
    }
}

impl PollutantCatalog {
    /// Catalog seeded with the pollutants and limit values the application
    /// tracks (EU Air Quality Directive limits where defined).
    pub fn with_default_pollutants() -> PollutantCatalog {
        fn pollutant(
            key: &str,
            satellite: Option<&str>,
            observation: Option<&str>,
            emissions: Option<&str>,
        ) -> Pollutant {
            Pollutant {
                key: key.to_string(),
                satellite_key: satellite.map(str::to_string),
                observation_key: observation.map(str::to_string),
                emissions_key: emissions.map(str::to_string),
            }
        }
        fn target(measurement: Measurement, value: f64, count_limit: Option<u32>) -> Target {
            Target {
                measurement,
                value,
                unit: "ug/m3".to_string(),
                count_limit,
            }
        }

        let mut catalog = PollutantCatalog::new();

        catalog.insert(pollutant("PM25", Some("pm2p5_conc"), Some("PM2.5"), Some("PM2.5")));
        catalog.add_target("PM25", target(Measurement::CalendarYear, 25.0, None));

        catalog.insert(pollutant("PM10", Some("pm10_conc"), Some("PM10"), Some("PM10")));
        catalog.add_target("PM10", target(Measurement::Day, 50.0, Some(35)));
        catalog.add_target("PM10", target(Measurement::CalendarYear, 40.0, None));

        catalog.insert(pollutant("O3", Some("o3_conc"), Some("O3"), None));
        catalog.add_target("O3", target(Measurement::Max8HourMean, 120.0, Some(25)));

        catalog.insert(pollutant("NO2", Some("no2_conc"), Some("NO2"), Some("NO2")));
        catalog.add_target("NO2", target(Measurement::Hour, 200.0, Some(18)));
        catalog.add_target("NO2", target(Measurement::CalendarYear, 40.0, None));

        catalog.insert(pollutant("NOx", None, None, Some("NOx")));
        catalog.insert(pollutant("CO", Some("co_conc"), Some("CO"), Some("CO")));
        catalog.insert(pollutant("SO2", Some("so2_conc"), Some("SO2"), None));
        catalog.insert(pollutant("SOx", None, None, Some("SOx")));
        catalog.insert(pollutant("PANS", Some("pans_conc"), None, None));
        catalog.insert(pollutant("NMVOC", Some("nmvoc_conc"), None, Some("NMVOC")));
        catalog.insert(pollutant("NO", Some("no_conc"), Some("NO"), None));
        catalog.insert(pollutant("NH3", Some("nh3_conc"), None, Some("NH3")));
        catalog.insert(pollutant("BIRCHPOLLEN", Some("bpg_conc"), None, None));
        catalog.insert(pollutant("OLIVEPOLLEN", Some("opg_conc"), None, None));
        catalog.insert(pollutant("GRASSPOLLEN", Some("gpg_conc"), None, None));
        catalog.insert(pollutant("RAGWEEDPOLLEN", Some("rwpg_conc"), None, None));

        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_from_every_vocabulary_case_insensitively() {
        let catalog = PollutantCatalog::with_default_pollutants();
        assert_eq!(catalog.canonical_key("PM25"), Some("PM25"));
        assert_eq!(catalog.canonical_key("pm2.5"), Some("PM25"));
        assert_eq!(catalog.canonical_key("PM2P5_CONC"), Some("PM25"));
        assert_eq!(catalog.canonical_key("nox"), Some("NOx"));
        assert_eq!(catalog.canonical_key("unobtainium"), None);
    }

    #[test]
    fn resolve_keys_drops_unknowns_and_duplicates() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let keys = catalog.resolve_keys(&[
            "pm2.5".to_string(),
            "PM25".to_string(),
            "bogus".to_string(),
            "o3".to_string(),
        ]);
        assert_eq!(keys, vec!["PM25".to_string(), "O3".to_string()]);
    }

    #[test]
    fn looks_up_targets_by_measurement() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let day = catalog.target("PM10", Measurement::Day).unwrap();
        assert_eq!(day.value, 50.0);
        assert_eq!(day.count_limit, Some(35));
        assert!(catalog.target("CO", Measurement::CalendarYear).is_none());
        assert_eq!(
            catalog.pollutants_with_target(Measurement::CalendarYear),
            vec!["PM25".to_string(), "PM10".to_string(), "NO2".to_string()]
        );
    }

    #[test]
    fn observation_alias_map() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let aliases = catalog.aliases_for_source(AliasSource::Observation);
        assert_eq!(aliases.get("PM2.5"), Some(&"PM25".to_string()));
        assert!(!aliases.contains_key("NMVOC"));
    }

    #[test]
    fn all_targets_replicates_across_years_and_countries() {
        let catalog = PollutantCatalog::with_default_pollutants();
        let targets = catalog
            .all_targets()
            .countries(vec!["at".to_string()])
            .pollutants(vec!["PM25".to_string(), "CO".to_string()])
            .call();
        let at = &targets["AT"];
        assert_eq!(at.len(), 9);
        let per_year = &at[&2016];
        assert_eq!(
            per_year["PM25"]["calendar_year"],
            TargetValue {
                value: 25.0,
                unit: "ug/m3".to_string(),
                count_limit: None,
            }
        );
        assert!(!per_year.contains_key("CO"));
        assert_eq!(at[&2024], at[&2016]);
    }
}
