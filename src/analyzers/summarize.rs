use crate::analyzers::types::{DailyRecord, Season, Summary};
use crate::analyzers::utility::nan_mean;
use crate::pollutant::{Pollutant, PollutantValues};
use chrono::Datelike;
use std::collections::BTreeMap;

/// Monthly and seasonal roll-ups of a daily AQI table.
#[derive(Debug, Clone, PartialEq)]
pub struct Summaries {
    pub monthly: Vec<Summary>,
    pub seasonal: Vec<Summary>,
}

pub fn summarize(daily: &[DailyRecord]) -> Summaries {
    Summaries {
        monthly: monthly(daily),
        seasonal: seasonal(daily),
    }
}

/// One row per calendar month present, in chronological order, labelled `YYYY-MM`.
pub fn monthly(daily: &[DailyRecord]) -> Vec<Summary> {
    let mut months: BTreeMap<(i32, u32), Vec<&DailyRecord>> = BTreeMap::new();
    for day in daily {
        months
            .entry((day.date.year(), day.date.month()))
            .or_default()
            .push(day);
    }

    months
        .into_iter()
        .map(|((year, month), days)| average(format!("{year:04}-{month:02}"), &days))
        .collect()
}

/// One row per season that has at least one day, in fixed season order.
///
/// Seasons are pooled across years: December and the following January both land in Winter.
pub fn seasonal(daily: &[DailyRecord]) -> Vec<Summary> {
    let mut seasons: BTreeMap<Season, Vec<&DailyRecord>> = BTreeMap::new();
    for day in daily {
        seasons
            .entry(Season::from_month(day.date.month()))
            .or_default()
            .push(day);
    }

    seasons
        .into_iter()
        .map(|(season, days)| average(season.name().to_string(), &days))
        .collect()
}

/// Missing-safe averages of every column over `days`.
fn average(period: String, days: &[&DailyRecord]) -> Summary {
    let mut concentrations = PollutantValues::default();
    for pollutant in Pollutant::ALL {
        concentrations.set(
            pollutant,
            nan_mean(days.iter().map(|d| d.concentrations.get(pollutant))),
        );
    }

    Summary {
        period,
        days: days.len(),
        concentrations,
        aqi: nan_mean(days.iter().map(|d| d.aqi)),
        aqi_reference: nan_mean(days.iter().map(|d| d.aqi_reference)),
    }
}
