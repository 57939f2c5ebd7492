//! Structural errors that abort a pipeline run.
//!
//! Missing readings are not errors: they travel as `None` through every stage.

use crate::pollutant::Pollutant;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AqiError {
    /// A breakpoint table failed validation at load time.
    #[error("invalid breakpoint table for {pollutant}: {reason}")]
    InvalidBreakpoints { pollutant: Pollutant, reason: String },

    /// A supported pollutant has no breakpoint table.
    #[error("no breakpoint table configured for {0}")]
    MissingTable(Pollutant),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// The upstream source returned no hourly readings for the requested span.
    #[error("no hourly readings for {city} between {start} and {end}")]
    EmptyInput {
        city: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

pub type Result<T> = std::result::Result<T, AqiError>;
