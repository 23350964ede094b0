//! Gridded satellite pollution surfaces stored as flattened arrays.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SatelliteError {
    /// The flattened value buffer does not match the declared shape.
    #[error("image '{key}' has {actual} values but shape implies {expected}")]
    ShapeMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
    /// Row extraction was requested on a grid that is not two-dimensional.
    #[error("image '{key}' is {dims}-dimensional, expected 2")]
    NotTwoDimensional { key: String, dims: usize },
    /// A shape string could not be parsed into dimension sizes.
    #[error("malformed shape string '{0}'")]
    InvalidShape(String),
}

/// Product category of a satellite surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageCategory {
    Analysis,
    Forecast,
}

impl ImageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageCategory::Analysis => "ANALYSIS",
            ImageCategory::Forecast => "FORECAST",
        }
    }
}

/// Geographic extent of a gridded surface, degrees in EPSG:4326.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// One day-averaged pollution surface.
///
/// `values` is the grid flattened in row-major order; `shape` holds the
/// dimension sizes. The two must agree (`values.len() == shape product`),
/// which [`crate::SatelliteCatalog::insert`] enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteImage {
    /// Stable primary key.
    pub key: String,
    /// Canonical pollutant key.
    pub pollutant: String,
    pub date: NaiveDate,
    pub category: ImageCategory,
    pub bbox: BoundingBox,
    /// Dimension sizes, outermost first.
    pub shape: Vec<usize>,
    /// Grid values, flattened row-major.
    pub values: Vec<f64>,
}

impl SatelliteImage {
    /// Checks the shape/value-count invariant.
    pub fn validate(&self) -> Result<(), SatelliteError> {
        let expected: usize = self.shape.iter().product();
        if expected != self.values.len() {
            return Err(SatelliteError::ShapeMismatch {
                key: self.key.clone(),
                expected,
                actual: self.values.len(),
            });
        }
        Ok(())
    }

    /// Reshapes a two-dimensional grid into its rows, row-major.
    ///
    /// Grids with any other number of dimensions are refused; the stored
    /// flat buffer would reshape ambiguously.
    pub fn rows(&self) -> Result<Vec<Vec<f64>>, SatelliteError> {
        if self.shape.len() != 2 {
            return Err(SatelliteError::NotTwoDimensional {
                key: self.key.clone(),
                dims: self.shape.len(),
            });
        }
        self.validate()?;
        let width = self.shape[1];
        if width == 0 {
            return Ok(vec![Vec::new(); self.shape[0]]);
        }
        Ok(self.values.chunks(width).map(<[f64]>::to_vec).collect())
    }
}

/// Parses a space-separated shape string ("2 4") into dimension sizes,
/// the format the upstream files carry the shape in.
pub fn shape_from_str(s: &str) -> Result<Vec<usize>, SatelliteError> {
    let dims: Vec<usize> = s
        .split_whitespace()
        .map(|part| part.parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| SatelliteError::InvalidShape(s.to_string()))?;
    if dims.is_empty() {
        return Err(SatelliteError::InvalidShape(s.to_string()));
    }
    Ok(dims)
}
