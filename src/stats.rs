use chrono::NaiveDate;
use serde::Serialize;

use crate::analyzers::types::DailyRecord;
use crate::analyzers::utility::{mean, nan_mean, pearson, stddev};
use crate::pollutant::Pollutant;

/// Headline numbers for a run, written as `metrics.json`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MetricsDigest {
    pub city: Option<String>,
    pub breakpoints_version: Option<String>,
    pub days: usize,

    pub aqi_min: Option<f64>,
    pub aqi_max: Option<f64>,
    pub aqi_mean: Option<f64>,
    pub aqi_std: Option<f64>,

    pub pm25_mean: Option<f64>,
    pub pm10_mean: Option<f64>,
    pub pm25_pm10_correlation: Option<f64>,

    // earliest date wins ties
    pub worst_day: Option<NaiveDate>,
    pub best_day: Option<NaiveDate>,
}

impl MetricsDigest {
    /// Builds the digest from a date-ordered daily table. Days without an AQI are skipped.
    pub fn from_daily(daily: &[DailyRecord]) -> Self {
        let mut s = MetricsDigest {
            days: daily.len(),
            ..Default::default()
        };

        let rated: Vec<(NaiveDate, f64)> = daily
            .iter()
            .filter_map(|d| d.aqi.map(|aqi| (d.date, aqi)))
            .collect();

        let mut worst: Option<(NaiveDate, f64)> = None;
        let mut best: Option<(NaiveDate, f64)> = None;
        for &(date, aqi) in &rated {
            if worst.is_none_or(|(_, top)| aqi > top) {
                worst = Some((date, aqi));
            }
            if best.is_none_or(|(_, low)| aqi < low) {
                best = Some((date, aqi));
            }
        }

        s.aqi_max = worst.map(|(_, v)| v);
        s.worst_day = worst.map(|(d, _)| d);
        s.aqi_min = best.map(|(_, v)| v);
        s.best_day = best.map(|(d, _)| d);

        if !rated.is_empty() {
            let values: Vec<f64> = rated.iter().map(|(_, v)| *v).collect();
            let m = mean(&values);
            s.aqi_mean = Some(m);
            s.aqi_std = Some(stddev(&values, m));
        }

        s.pm25_mean = nan_mean(daily.iter().map(|d| d.concentrations.get(Pollutant::Pm25)));
        s.pm10_mean = nan_mean(daily.iter().map(|d| d.concentrations.get(Pollutant::Pm10)));

        let pairs: Vec<(f64, f64)> = daily
            .iter()
            .filter_map(|d| {
                Some((
                    d.concentrations.get(Pollutant::Pm25)?,
                    d.concentrations.get(Pollutant::Pm10)?,
                ))
            })
            .collect();
        s.pm25_pm10_correlation = pearson(&pairs);

        s
    }

    /// Set run metadata (city and breakpoint table version)
    pub fn with_run_info(mut self, city: &str, breakpoints_version: &str) -> Self {
        self.city = Some(city.to_string());
        self.breakpoints_version = Some(breakpoints_version.to_string());
        self
    }
}
