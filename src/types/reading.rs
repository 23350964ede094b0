//! Raw observation reading records.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Validity flag value marking a reading as usable for aggregation.
pub const VALIDITY_VALID: i32 = 1;

/// One hourly (or otherwise sub-daily) pollutant observation.
///
/// `pollutant` carries the source vocabulary name (an observation alias such
/// as "PM2.5"); it is resolved to the canonical key when the record enters a
/// [`crate::ReadingStore`]. Timestamps are timezone-aware and interpreted in
/// their own offset (source data is CET) when deriving aggregation dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRecord {
    /// Stable primary key; inserting the same key twice is a no-op.
    pub key: String,
    pub timestamp: DateTime<FixedOffset>,
    /// ISO country code.
    pub country: String,
    /// Station identifier.
    pub station: String,
    /// Pollutant name in the source vocabulary.
    pub pollutant: String,
    pub value: f64,
    pub unit: String,
    /// 1 marks a valid reading; anything else is excluded from aggregation.
    pub validity: i32,
    /// Verification stage flag, stored but not filtered on.
    pub verification: i32,
}
