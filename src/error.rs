use crate::emissions::EmissionsError;
use crate::readings::error::ReadingError;
use crate::regions::error::RegionError;
use crate::types::satellite::SatelliteError;
use thiserror::Error;

/// Top-level error type wrapping every module's error.
#[derive(Debug, Error)]
pub enum EuroAqError {
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Reading(#[from] ReadingError),
    #[error(transparent)]
    Emissions(#[from] EmissionsError),
    #[error(transparent)]
    Satellite(#[from] SatelliteError),
}
