//! AQI computation and temporal aggregation.
//!
//! Hourly readings are resampled to daily means with gap filling, each
//! pollutant is mapped onto its breakpoint table, the day's AQI is the
//! highest sub-index, and the daily table is rolled up by month and season.

pub mod aggregate;
pub mod analyzer;
pub mod breakpoints;
pub mod category;
pub mod compose;
pub mod subindex;
pub mod summarize;
pub mod types;
pub mod utility;
