//! Data types flowing through the AQI pipeline.

use crate::analyzers::category::AqiCategory;
use crate::pollutant::{Pollutant, PollutantValues};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::fmt;

/// One hourly observation as delivered by the upstream source.
///
/// The timestamp carries the city's UTC offset, so `local_date` is the
/// calendar day the reading belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyReading {
    pub timestamp: DateTime<FixedOffset>,
    pub concentrations: PollutantValues,
    /// Provider-computed AQI for comparison, if the source supplies one.
    pub aqi_reference: Option<f64>,
}

impl HourlyReading {
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The span from the earliest to the latest reading, or `None` for no readings.
    pub fn covering(readings: &[HourlyReading]) -> Option<Self> {
        let start = readings.iter().map(HourlyReading::local_date).min()?;
        let end = readings.iter().map(HourlyReading::local_date).max()?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day in the span, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-day mean concentrations, before AQI is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyConcentrations {
    pub date: NaiveDate,
    pub concentrations: PollutantValues,
    pub aqi_reference: Option<f64>,
}

/// A day with its AQI, dominant pollutant and category derived.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub concentrations: PollutantValues,
    pub sub_indices: PollutantValues,
    pub aqi: Option<f64>,
    pub dominant_pollutant: Option<Pollutant>,
    pub category: Option<AqiCategory>,
    pub aqi_reference: Option<f64>,
}

/// Seasonal buckets, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Season {
    Winter,
    Summer,
    Monsoon,
    PostMonsoon,
    LateAutumn,
}

impl Season {
    /// Maps a calendar month (1-12) to its season.
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Winter,
            3 | 4 => Season::Summer,
            5..=7 => Season::Monsoon,
            8..=10 => Season::PostMonsoon,
            _ => Season::LateAutumn,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Summer => "Summer",
            Season::Monsoon => "Monsoon",
            Season::PostMonsoon => "Post-Monsoon",
            Season::LateAutumn => "Late Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Averages over a period (a month or a season).
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub period: String,
    pub days: usize,
    pub concentrations: PollutantValues,
    pub aqi: Option<f64>,
    pub aqi_reference: Option<f64>,
}
