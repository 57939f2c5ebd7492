use crate::analyzers::aggregate::aggregate_daily;
use crate::analyzers::breakpoints::BreakpointTables;
use crate::analyzers::compose::compose;
use crate::analyzers::summarize::{Summaries, summarize};
use crate::analyzers::types::{DailyRecord, DateSpan, HourlyReading};
use crate::config::PipelineConfig;
use crate::error::AqiError;
use crate::output::write_report;
use crate::parser::{HourlyFile, read_hourly_csv};
use crate::stats::MetricsDigest;
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

/// Everything one pipeline run produces for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub config: PipelineConfig,
    pub breakpoints_version: String,
    pub daily: Vec<DailyRecord>,
    pub summaries: Summaries,
    pub metrics: MetricsDigest,
}

/// Runs the core: hourly readings -> daily means -> AQI -> summaries and digest.
///
/// Fails only on structural problems: a reversed date range, or no readings
/// inside the configured span. Missing cells are absorbed along the way.
#[tracing::instrument(skip_all, fields(city = %config.city, start = %config.start_date, end = %config.end_date))]
pub fn run_pipeline(
    config: &PipelineConfig,
    tables: &BreakpointTables,
    readings: &[HourlyReading],
) -> std::result::Result<Report, AqiError> {
    config.validate()?;
    let span = config.span();

    let in_span = readings
        .iter()
        .filter(|r| span.contains(r.local_date()))
        .count();
    if in_span == 0 {
        return Err(AqiError::EmptyInput {
            city: config.city.clone(),
            start: config.start_date,
            end: config.end_date,
        });
    }

    let days = aggregate_daily(readings, span);
    let daily = compose(&days, tables);

    let unrated = daily.iter().filter(|d| d.aqi.is_none()).count();
    if unrated > 0 {
        warn!(unrated, "Days without any pollutant data have no AQI");
    }

    let summaries = summarize(&daily);
    let metrics = MetricsDigest::from_daily(&daily).with_run_info(&config.city, tables.version());

    info!(
        readings = in_span,
        days = daily.len(),
        months = summaries.monthly.len(),
        seasons = summaries.seasonal.len(),
        aqi_mean = metrics.aqi_mean,
        "Pipeline complete"
    );

    Ok(Report {
        config: config.clone(),
        breakpoints_version: tables.version().to_string(),
        daily,
        summaries,
        metrics,
    })
}

/// Runs the pipeline over a saved raw hourly CSV and writes all tables to `out_dir`.
///
/// Without a `config`, the city and coordinates come from the file and the
/// span runs from its first to its last reading.
pub fn analyze_file(
    config: Option<&PipelineConfig>,
    tables: &BreakpointTables,
    raw_csv: &Path,
    out_dir: &Path,
) -> Result<Report> {
    let HourlyFile { site, readings } = read_hourly_csv(raw_csv)?;
    info!(path = %raw_csv.display(), rows = readings.len(), "Loaded raw hourly readings");

    let config = match config {
        Some(config) => config.clone(),
        None => {
            let mut inferred = PipelineConfig::default();
            if let Some(site) = site {
                inferred.city = site.city;
                inferred.latitude = site.latitude;
                inferred.longitude = site.longitude;
            }
            if let Some(span) = DateSpan::covering(&readings) {
                inferred.start_date = span.start;
                inferred.end_date = span.end;
            }
            inferred
        }
    };

    let report = run_pipeline(&config, tables, &readings)?;
    write_report(&report, out_dir)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pollutant::{Pollutant, PollutantValues};
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    fn config(first: u32, last: u32) -> PipelineConfig {
        PipelineConfig {
            city: "Testville".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, first).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, last).unwrap(),
            ..PipelineConfig::default()
        }
    }

    fn reading(day: u32, hour: u32, pm25: f64) -> HourlyReading {
        HourlyReading {
            timestamp: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, day, hour, 0, 0)
                .unwrap(),
            concentrations: PollutantValues::from_values([Some(pm25), None, None, None, None]),
            aqi_reference: None,
        }
    }

    #[test]
    fn test_empty_input_fails_loudly() {
        let tables = BreakpointTables::national().unwrap();
        let err = run_pipeline(&config(1, 3), &tables, &[]).unwrap_err();
        assert!(matches!(err, AqiError::EmptyInput { .. }));
        assert!(err.to_string().contains("Testville"));
    }

    #[test]
    fn test_readings_only_outside_span_count_as_empty() {
        let tables = BreakpointTables::national().unwrap();
        let err = run_pipeline(&config(1, 3), &tables, &[reading(10, 0, 5.0)]).unwrap_err();
        assert!(matches!(err, AqiError::EmptyInput { .. }));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let tables = BreakpointTables::national().unwrap();
        let err = run_pipeline(&config(3, 1), &tables, &[reading(1, 0, 5.0)]).unwrap_err();
        assert!(matches!(err, AqiError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_run_pipeline_literal_day() {
        let tables = BreakpointTables::national().unwrap();
        let readings = vec![reading(1, 0, 10.0), reading(1, 1, 20.0), reading(1, 2, 30.0)];
        let report = run_pipeline(&config(1, 1), &tables, &readings).unwrap();

        assert_eq!(report.daily.len(), 1);
        let day = &report.daily[0];
        assert_eq!(day.concentrations.get(Pollutant::Pm25), Some(20.0));
        assert!((day.aqi.unwrap() - 33.33).abs() < 0.01);
        assert_eq!(day.dominant_pollutant, Some(Pollutant::Pm25));
        assert_eq!(report.summaries.monthly.len(), 1);
        assert_eq!(report.summaries.seasonal[0].period, "Winter");
        assert_eq!(report.metrics.city.as_deref(), Some("Testville"));
        assert_eq!(report.breakpoints_version, "CPCB-2014");
    }

    #[test]
    fn test_run_pipeline_is_deterministic() {
        let tables = BreakpointTables::national().unwrap();
        let readings: Vec<_> = (1..=3)
            .flat_map(|day| (0..24).map(move |h| reading(day, h, (day * 10 + h) as f64)))
            .collect();
        let a = run_pipeline(&config(1, 3), &tables, &readings).unwrap();
        let b = run_pipeline(&config(1, 3), &tables, &readings).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_analyze_file_infers_site_and_span_from_data() {
        let dir = std::env::temp_dir().join("aqi_pipeline_test_analyze_file");
        let _ = std::fs::remove_dir_all(&dir);
        let raw = dir.join("raw.csv");
        let readings: Vec<_> = (5..=7).map(|day| reading(day, 12, 45.0)).collect();
        let recorded = PipelineConfig {
            city: "Kolkata".to_string(),
            latitude: 22.5726,
            longitude: 88.3639,
            ..PipelineConfig::default()
        };
        crate::output::write_hourly_csv(&raw, &recorded, &readings).unwrap();

        let tables = BreakpointTables::national().unwrap();
        let report = analyze_file(None, &tables, &raw, &dir.join("out")).unwrap();

        assert_eq!(report.config.city, "Kolkata");
        assert_eq!(report.config.latitude, 22.5726);
        assert_eq!(report.config.longitude, 88.3639);
        assert_eq!(report.metrics.city.as_deref(), Some("Kolkata"));
        assert_eq!(report.config.start_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(report.config.end_date, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(report.daily.len(), 3);
        assert!(dir.join("out").join(crate::output::METRICS_FILE).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
