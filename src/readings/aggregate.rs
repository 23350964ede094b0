//! Daily and annual aggregation over the reading store.

use crate::pollutants::catalog::PollutantCatalog;
use crate::readings::error::ReadingError;
use crate::readings::store::{
    ReadingStore, COL_COUNTRY, COL_DAY, COL_MONTH, COL_POLLUTANT, COL_STATION, COL_VALIDITY,
    COL_VALUE, COL_YEAR,
};
use crate::types::reading::VALIDITY_VALID;
use crate::types::region::EU_ISOCODES;
use bon::bon;
use chrono::{Datelike, NaiveDate};
use log::info;
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-day statistics for one (country, date, pollutant) cell.
///
/// All four fields are null for a pollutant without readings on that day;
/// the prior fields alone are null when the prior year has data overall but
/// none on the matching day-of-year.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DailyPollutantStats {
    #[serde(rename = "day-avg-level")]
    pub day_avg_level: Option<f64>,
    #[serde(rename = "ytd-avg-level")]
    pub ytd_avg_level: Option<f64>,
    #[serde(rename = "prior-day-avg-level")]
    pub prior_day_avg_level: Option<f64>,
    #[serde(rename = "prior-ytd-avg-level")]
    pub prior_ytd_avg_level: Option<f64>,
}

/// country -> ISO date -> pollutant -> stats.
pub type DailyLevels = BTreeMap<String, BTreeMap<String, BTreeMap<String, DailyPollutantStats>>>;

/// country -> year -> pollutant -> annual mean.
pub type AnnualLevels = BTreeMap<String, BTreeMap<i32, BTreeMap<String, f64>>>;

/// One station's mean level over a date window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationDayAverage {
    pub station: String,
    pub pollutant: String,
    pub day_avg: f64,
}

/// One day of one (country, pollutant) series.
struct DayPoint {
    date: NaiveDate,
    day_avg: f64,
    ytd_avg: f64,
}

/// (country, pollutant) -> day-of-year -> point.
type DaySeries = HashMap<(String, String), BTreeMap<u32, DayPoint>>;

/// Read-only aggregation queries over a [`ReadingStore`].
///
/// Only readings with a valid validity flag enter any statistic. Country
/// filters default to the EU list, pollutant filters to the catalog; names
/// are resolved through the catalog, so observation aliases work anywhere a
/// canonical key does.
pub struct ReadingAggregator<'a> {
    store: &'a ReadingStore,
    catalog: &'a PollutantCatalog,
}

#[bon]
impl<'a> ReadingAggregator<'a> {
    pub fn new(store: &'a ReadingStore, catalog: &'a PollutantCatalog) -> ReadingAggregator<'a> {
        ReadingAggregator { store, catalog }
    }

    /// Daily means with year-to-date running means and a prior-year
    /// comparison series, for a window within one calendar year.
    ///
    /// The whole year is aggregated so the running mean starts from
    /// January 1; the output is then cut down to the requested window. The
    /// prior-year series joins on day-of-year, so in a leap year Feb 29
    /// pairs with the prior year's Mar 1. When the prior year has no data
    /// at all, the prior fields are zero-filled instead of null.
    #[builder]
    pub fn daily(
        &self,
        start_date: &str,
        end_date: &str,
        countries: Option<Vec<String>>,
        pollutants: Option<Vec<String>>,
    ) -> Result<DailyLevels, ReadingError> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        if start.year() != end.year() {
            return Err(ReadingError::RangeSpansYears {
                start: start.year(),
                end: end.year(),
            });
        }
        let countries = countries_or_default(countries);
        let pollutants = self.pollutants_or_default(pollutants);
        let year = end.year();

        let current = self.day_series(year, &countries, &pollutants)?;
        let prior = self.day_series(year - 1, &countries, &pollutants)?;
        let prior_empty = prior.is_empty();

        let mut result: DailyLevels = BTreeMap::new();
        for country in &countries {
            let mut window_pollutants: BTreeSet<&String> = BTreeSet::new();
            let mut window_dates: BTreeSet<NaiveDate> = BTreeSet::new();
            for ((c, p), series) in &current {
                if c != country {
                    continue;
                }
                for point in series.values() {
                    if point.date >= start && point.date <= end {
                        window_pollutants.insert(p);
                        window_dates.insert(point.date);
                    }
                }
            }
            if window_dates.is_empty() {
                continue;
            }

            let mut days: BTreeMap<String, BTreeMap<String, DailyPollutantStats>> = BTreeMap::new();
            for date in window_dates {
                let ordinal = date.ordinal();
                let mut per_pollutant = BTreeMap::new();
                for &pollutant in &window_pollutants {
                    let point = current
                        .get(&(country.clone(), pollutant.clone()))
                        .and_then(|series| series.get(&ordinal));
                    let stats = match point {
                        None => DailyPollutantStats::default(),
                        Some(point) => {
                            let (prior_day, prior_ytd) = if prior_empty {
                                (Some(0.0), Some(0.0))
                            } else {
                                prior
                                    .get(&(country.clone(), pollutant.clone()))
                                    .and_then(|series| series.get(&ordinal))
                                    .map_or((None, None), |p| {
                                        (Some(p.day_avg), Some(p.ytd_avg))
                                    })
                            };
                            DailyPollutantStats {
                                day_avg_level: Some(point.day_avg),
                                ytd_avg_level: Some(point.ytd_avg),
                                prior_day_avg_level: prior_day,
                                prior_ytd_avg_level: prior_ytd,
                            }
                        }
                    };
                    per_pollutant.insert(pollutant.clone(), stats);
                }
                days.insert(date.format("%Y-%m-%d").to_string(), per_pollutant);
            }
            result.insert(country.clone(), days);
        }
        Ok(result)
    }

    /// Annual mean level per (country, year, pollutant).
    ///
    /// Years default to every year with valid data for the filters. A year
    /// that fails to aggregate or has no records is logged and skipped;
    /// partial results win over failing the whole query.
    #[builder]
    pub fn annual(
        &self,
        years: Option<Vec<i32>>,
        countries: Option<Vec<String>>,
        pollutants: Option<Vec<String>>,
    ) -> Result<AnnualLevels, ReadingError> {
        let countries = countries_or_default(countries);
        let pollutants = match pollutants {
            Some(pollutants) => self.catalog.resolve_keys(&pollutants),
            None => self.catalog.observation_keys(),
        };
        if self.store.is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut years = match years {
            Some(years) => years,
            None => self.distinct_years(&countries, &pollutants)?,
        };
        years.sort_unstable();

        let mut result: AnnualLevels = BTreeMap::new();
        for year in years {
            let frame = self
                .filtered(year, &countries, &pollutants)
                .group_by([col(COL_COUNTRY), col(COL_POLLUTANT)])
                .agg([col(COL_VALUE).mean().alias("year_avg")])
                .collect();
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    info!("Skipping year {year}: {err}");
                    continue;
                }
            };
            if frame.height() == 0 {
                info!("No records in {year}.");
                continue;
            }
            let country = frame.column(COL_COUNTRY)?.str()?;
            let pollutant = frame.column(COL_POLLUTANT)?.str()?;
            let year_avg = frame.column("year_avg")?.f64()?;
            for i in 0..frame.height() {
                let (Some(c), Some(p), Some(avg)) =
                    (country.get(i), pollutant.get(i), year_avg.get(i))
                else {
                    continue;
                };
                result
                    .entry(c.to_string())
                    .or_default()
                    .entry(year)
                    .or_default()
                    .insert(p.to_string(), avg);
            }
        }
        Ok(result)
    }

    /// Mean level per station over a date window, for the given pollutants.
    #[builder]
    pub fn station_day_averages(
        &self,
        start_date: &str,
        end_date: &str,
        pollutants: Vec<String>,
    ) -> Result<Vec<StationDayAverage>, ReadingError> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        let pollutants = self.catalog.resolve_keys(&pollutants);
        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        let date_key = |d: NaiveDate| d.year() * 10_000 + d.month() as i32 * 100 + d.day() as i32;
        let date_expr = col(COL_YEAR) * lit(10_000) + col(COL_MONTH) * lit(100) + col(COL_DAY);
        let frame = self
            .store
            .frame()
            .clone()
            .lazy()
            .filter(
                col(COL_VALIDITY)
                    .eq(lit(VALIDITY_VALID))
                    .and(col(COL_POLLUTANT).is_in(lit(Series::new(
                        "pollutants".into(),
                        pollutants,
                    ))))
                    .and(date_expr.clone().gt_eq(lit(date_key(start))))
                    .and(date_expr.lt_eq(lit(date_key(end)))),
            )
            .group_by([col(COL_STATION), col(COL_POLLUTANT)])
            .agg([col(COL_VALUE).mean().alias("day_avg")])
            .collect()?;

        let station = frame.column(COL_STATION)?.str()?;
        let pollutant = frame.column(COL_POLLUTANT)?.str()?;
        let day_avg = frame.column("day_avg")?.f64()?;
        let mut rows = Vec::with_capacity(frame.height());
        for i in 0..frame.height() {
            let (Some(s), Some(p), Some(avg)) = (station.get(i), pollutant.get(i), day_avg.get(i))
            else {
                continue;
            };
            rows.push(StationDayAverage {
                station: s.to_string(),
                pollutant: p.to_string(),
                day_avg: avg,
            });
        }
        rows.sort_by(|a, b| (&a.station, &a.pollutant).cmp(&(&b.station, &b.pollutant)));
        Ok(rows)
    }
}

impl ReadingAggregator<'_> {
    fn pollutants_or_default(&self, pollutants: Option<Vec<String>>) -> Vec<String> {
        match pollutants {
            Some(pollutants) => self.catalog.resolve_keys(&pollutants),
            None => self.catalog.keys(),
        }
    }

    fn filtered(&self, year: i32, countries: &[String], pollutants: &[String]) -> LazyFrame {
        self.store.frame().clone().lazy().filter(
            col(COL_VALIDITY)
                .eq(lit(VALIDITY_VALID))
                .and(col(COL_YEAR).eq(lit(year)))
                .and(col(COL_COUNTRY).is_in(lit(Series::new("countries".into(), countries))))
                .and(col(COL_POLLUTANT).is_in(lit(Series::new("pollutants".into(), pollutants)))),
        )
    }

    /// Per-day means for one year, with the expanding year-to-date mean
    /// computed per (country, pollutant) series in date order.
    fn day_series(
        &self,
        year: i32,
        countries: &[String],
        pollutants: &[String],
    ) -> Result<DaySeries, ReadingError> {
        if self.store.is_empty() {
            return Ok(HashMap::new());
        }
        let frame = self
            .filtered(year, countries, pollutants)
            .group_by([
                col(COL_COUNTRY),
                col(COL_POLLUTANT),
                col(COL_MONTH),
                col(COL_DAY),
            ])
            .agg([col(COL_VALUE).mean().alias("day_avg")])
            .collect()?;

        let country = frame.column(COL_COUNTRY)?.str()?;
        let pollutant = frame.column(COL_POLLUTANT)?.str()?;
        let month = frame.column(COL_MONTH)?.i32()?;
        let day = frame.column(COL_DAY)?.i32()?;
        let day_avg = frame.column("day_avg")?.f64()?;

        let mut grouped: HashMap<(String, String), Vec<(NaiveDate, f64)>> = HashMap::new();
        for i in 0..frame.height() {
            let (Some(c), Some(p), Some(m), Some(d), Some(avg)) = (
                country.get(i),
                pollutant.get(i),
                month.get(i),
                day.get(i),
                day_avg.get(i),
            ) else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(year, m as u32, d as u32) else {
                continue;
            };
            grouped
                .entry((c.to_string(), p.to_string()))
                .or_default()
                .push((date, avg));
        }

        let mut series: DaySeries = HashMap::new();
        for (key, mut points) in grouped {
            points.sort_by_key(|(date, _)| *date);
            let mut running_sum = 0.0;
            let mut by_ordinal = BTreeMap::new();
            for (i, (date, avg)) in points.iter().enumerate() {
                running_sum += avg;
                by_ordinal.insert(
                    date.ordinal(),
                    DayPoint {
                        date: *date,
                        day_avg: *avg,
                        ytd_avg: running_sum / (i + 1) as f64,
                    },
                );
            }
            series.insert(key, by_ordinal);
        }
        Ok(series)
    }

    fn distinct_years(
        &self,
        countries: &[String],
        pollutants: &[String],
    ) -> Result<Vec<i32>, ReadingError> {
        let frame = self
            .store
            .frame()
            .clone()
            .lazy()
            .filter(
                col(COL_VALIDITY)
                    .eq(lit(VALIDITY_VALID))
                    .and(col(COL_COUNTRY).is_in(lit(Series::new("countries".into(), countries))))
                    .and(
                        col(COL_POLLUTANT)
                            .is_in(lit(Series::new("pollutants".into(), pollutants))),
                    ),
            )
            .select([col(COL_YEAR).unique()])
            .collect()?;
        let years = frame.column(COL_YEAR)?.i32()?;
        Ok(years.into_iter().flatten().collect())
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ReadingError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ReadingError::InvalidDate(s.to_string()))
}

fn countries_or_default(countries: Option<Vec<String>>) -> Vec<String> {
    match countries {
        Some(countries) => countries.iter().map(|c| c.to_uppercase()).collect(),
        None => EU_ISOCODES.iter().map(|c| c.to_string()).collect(),
    }
}
