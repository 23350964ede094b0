mod attainment;
mod emissions;
mod error;
mod pollutants;
mod population;
mod readings;
mod regions;
mod satellite;
mod stations;
mod types;

pub use error::EuroAqError;

pub use attainment::{AttainmentEvaluator, AttainmentRow, StationBubble};
pub use emissions::{EmissionsError, EmissionsStore, SectorTotals};
pub use pollutants::catalog::{AllTargets, PollutantCatalog, TargetValue};
pub use population::{PopulationIndex, PopulationRecord, RECENT_POPULATION_YEAR};
pub use readings::aggregate::{
    AnnualLevels, DailyLevels, DailyPollutantStats, ReadingAggregator, StationDayAverage,
};
pub use readings::error::ReadingError;
pub use readings::store::ReadingStore;
pub use regions::error::RegionError;
pub use regions::index::RegionIndex;
pub use satellite::SatelliteCatalog;
pub use stations::StationRegistry;

pub use types::emissions::{EmissionsInput, SectorGroup};
pub use types::pollutant::{AliasSource, Measurement, Pollutant, Target};
pub use types::reading::{ReadingRecord, VALIDITY_VALID};
pub use types::region::{
    Region, RegionBoundary, RegionInfo, RegionRecord, CURRENT_NUTS_YEAR, EU_ISOCODES,
};
pub use types::satellite::{
    shape_from_str, BoundingBox, ImageCategory, SatelliteError, SatelliteImage,
};
pub use types::station::{Station, StationRecord};
