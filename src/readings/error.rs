use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadingError {
    /// A date argument did not parse as an ISO calendar date.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    /// Daily statistics are only defined within one calendar year; the
    /// prior-year comparison joins on day-of-year.
    #[error("can only produce results for a range of dates within a single year: {start}-{end}")]
    RangeSpansYears { start: i32, end: i32 },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}
