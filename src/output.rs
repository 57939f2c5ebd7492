//! Output formatting and persistence for pipeline results.
//!
//! Every table is written as CSV with Missing cells left empty; the metrics
//! digest is written as pretty JSON.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::analyzer::Report;
use crate::analyzers::types::{DailyRecord, HourlyReading, Summary};
use crate::config::PipelineConfig;
use crate::parser::HourlyRow;
use crate::pollutant::Pollutant;

pub const CLEANED_FILE: &str = "cleaned_air_quality.csv";
pub const DAILY_FILE: &str = "daily_summary.csv";
pub const MONTHLY_FILE: &str = "monthly_summary.csv";
pub const SEASONAL_FILE: &str = "seasonal_summary.csv";
pub const METRICS_FILE: &str = "metrics.json";

/// Full daily row including per-pollutant sub-indices.
#[derive(Debug, Serialize)]
struct CleanedRow<'a> {
    city: &'a str,
    date: NaiveDate,
    pm25: Option<f64>,
    pm10: Option<f64>,
    no2: Option<f64>,
    so2: Option<f64>,
    co: Option<f64>,
    pm25_sub_index: Option<f64>,
    pm10_sub_index: Option<f64>,
    no2_sub_index: Option<f64>,
    so2_sub_index: Option<f64>,
    co_sub_index: Option<f64>,
    aqi_reference: Option<f64>,
    aqi: Option<f64>,
    dominant_pollutant: Option<Pollutant>,
    category: Option<&'static str>,
}

impl<'a> CleanedRow<'a> {
    fn new(city: &'a str, d: &DailyRecord) -> Self {
        let c = &d.concentrations;
        let s = &d.sub_indices;
        CleanedRow {
            city,
            date: d.date,
            pm25: c.get(Pollutant::Pm25),
            pm10: c.get(Pollutant::Pm10),
            no2: c.get(Pollutant::No2),
            so2: c.get(Pollutant::So2),
            co: c.get(Pollutant::Co),
            pm25_sub_index: s.get(Pollutant::Pm25),
            pm10_sub_index: s.get(Pollutant::Pm10),
            no2_sub_index: s.get(Pollutant::No2),
            so2_sub_index: s.get(Pollutant::So2),
            co_sub_index: s.get(Pollutant::Co),
            aqi_reference: d.aqi_reference,
            aqi: d.aqi,
            dominant_pollutant: d.dominant_pollutant,
            category: d.category.map(|c| c.label()),
        }
    }
}

#[derive(Debug, Serialize)]
struct DailyRow {
    date: NaiveDate,
    pm25: Option<f64>,
    pm10: Option<f64>,
    no2: Option<f64>,
    so2: Option<f64>,
    co: Option<f64>,
    aqi: Option<f64>,
    dominant_pollutant: Option<Pollutant>,
    category: Option<&'static str>,
}

impl From<&DailyRecord> for DailyRow {
    fn from(d: &DailyRecord) -> Self {
        let c = &d.concentrations;
        DailyRow {
            date: d.date,
            pm25: c.get(Pollutant::Pm25),
            pm10: c.get(Pollutant::Pm10),
            no2: c.get(Pollutant::No2),
            so2: c.get(Pollutant::So2),
            co: c.get(Pollutant::Co),
            aqi: d.aqi,
            dominant_pollutant: d.dominant_pollutant,
            category: d.category.map(|c| c.label()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    period: &'a str,
    days: usize,
    pm25: Option<f64>,
    pm10: Option<f64>,
    no2: Option<f64>,
    so2: Option<f64>,
    co: Option<f64>,
    aqi: Option<f64>,
    aqi_reference: Option<f64>,
}

impl<'a> From<&'a Summary> for SummaryRow<'a> {
    fn from(s: &'a Summary) -> Self {
        let c = &s.concentrations;
        SummaryRow {
            period: &s.period,
            days: s.days,
            pm25: c.get(Pollutant::Pm25),
            pm10: c.get(Pollutant::Pm10),
            no2: c.get(Pollutant::No2),
            so2: c.get(Pollutant::So2),
            co: c.get(Pollutant::Co),
            aqi: s.aqi,
            aqi_reference: s.aqi_reference,
        }
    }
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `value` as pretty JSON followed by a newline, e.g. to stdout.
pub fn write_json_to<W: Write>(mut writer: W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes `rows` to a new CSV file at `path`, replacing any existing file.
pub fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    let mut count = 0usize;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = count, "Wrote CSV");
    Ok(())
}

/// Writes `value` as pretty JSON to `path`.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Location of the raw hourly CSV for a run: `<data_dir>/raw/<city>_<start>_<end>_hourly.csv`.
pub fn raw_csv_path(data_dir: &Path, config: &PipelineConfig) -> PathBuf {
    data_dir.join("raw").join(format!(
        "{}_{}_{}_hourly.csv",
        config.city_slug(),
        config.start_date.format("%Y%m%d"),
        config.end_date.format("%Y%m%d")
    ))
}

/// Saves raw hourly readings, tagged with the config's site, so a run can be
/// reprocessed without refetching.
pub fn write_hourly_csv(
    path: &Path,
    config: &PipelineConfig,
    readings: &[HourlyReading],
) -> Result<()> {
    write_csv(path, readings.iter().map(|r| HourlyRow::new(config, r)))
}

/// Writes the cleaned table, the three summaries and the metrics digest into `out_dir`.
pub fn write_report(report: &Report, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let city = report.config.city.as_str();

    let cleaned = out_dir.join(CLEANED_FILE);
    write_csv(&cleaned, report.daily.iter().map(|d| CleanedRow::new(city, d)))?;

    let daily = out_dir.join(DAILY_FILE);
    write_csv(&daily, report.daily.iter().map(DailyRow::from))?;

    let monthly = out_dir.join(MONTHLY_FILE);
    write_csv(&monthly, report.summaries.monthly.iter().map(SummaryRow::from))?;

    let seasonal = out_dir.join(SEASONAL_FILE);
    write_csv(&seasonal, report.summaries.seasonal.iter().map(SummaryRow::from))?;

    let metrics = out_dir.join(METRICS_FILE);
    write_json(&metrics, &report.metrics)?;

    info!(out_dir = %out_dir.display(), city, "Report written");
    Ok(vec![cleaned, daily, monthly, seasonal, metrics])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::analyzer::run_pipeline;
    use crate::analyzers::breakpoints::BreakpointTables;
    use crate::parser::read_hourly_csv;
    use crate::pollutant::PollutantValues;
    use chrono::{FixedOffset, TimeZone};
    use std::env;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir); // clean up any prior run
        dir
    }

    fn readings() -> Vec<HourlyReading> {
        let offset = FixedOffset::east_opt(19800).unwrap();
        (0..48)
            .map(|h| HourlyReading {
                timestamp: offset
                    .with_ymd_and_hms(2024, 1, 1 + h / 24, h % 24, 0, 0)
                    .unwrap(),
                concentrations: PollutantValues::from_values([
                    Some(100.0 + h as f64),
                    if h % 5 == 0 { None } else { Some(180.0) },
                    Some(30.0),
                    Some(12.0),
                    Some(1.2),
                ]),
                aqi_reference: Some(150.0),
            })
            .collect()
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&BreakpointTables::national().unwrap()).unwrap();
    }

    #[test]
    fn test_write_json_to_buffer() {
        let mut buf = Vec::new();
        write_json_to(&mut buf, &BreakpointTables::national().unwrap()).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], "CPCB-2014");
        assert_eq!(value["tables"]["pm25"][0]["index_high"], 50.0);
    }

    #[test]
    fn test_raw_csv_path() {
        let path = raw_csv_path(Path::new("data"), &PipelineConfig::default());
        assert_eq!(path, Path::new("data/raw/delhi_20240101_20240331_hourly.csv"));
    }

    #[test]
    fn test_hourly_csv_reload() {
        let dir = temp_dir("aqi_pipeline_test_hourly");
        let path = dir.join("raw.csv");
        let original = readings();
        let config = PipelineConfig {
            city: "Mumbai".to_string(),
            latitude: 19.076,
            longitude: 72.8777,
            ..PipelineConfig::default()
        };

        write_hourly_csv(&path, &config, &original).unwrap();
        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("city,latitude,longitude,datetime,pm25"));

        let file = read_hourly_csv(&path).unwrap();
        let site = file.site.unwrap();
        assert_eq!(site.city, "Mumbai");
        assert_eq!(site.latitude, 19.076);
        assert_eq!(site.longitude, 72.8777);

        let loaded = file.readings;

        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded[0].timestamp, original[0].timestamp);
        assert_eq!(loaded[5].concentrations.get(Pollutant::Pm10), None);
        assert_eq!(loaded[6].concentrations.get(Pollutant::Pm10), Some(180.0));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_report_files() {
        let dir = temp_dir("aqi_pipeline_test_report");
        let config = PipelineConfig {
            end_date: PipelineConfig::default().start_date + chrono::Days::new(1),
            ..PipelineConfig::default()
        };
        let tables = BreakpointTables::national().unwrap();
        let report = run_pipeline(&config, &tables, &readings()).unwrap();

        let written = write_report(&report, &dir).unwrap();
        assert_eq!(written.len(), 5);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }

        let daily = fs::read_to_string(dir.join(DAILY_FILE)).unwrap();
        let lines: Vec<_> = daily.lines().collect();
        // header + 2 days
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,pm25,pm10"));
        assert!(lines[1].starts_with("2024-01-01,"));

        let cleaned = fs::read_to_string(dir.join(CLEANED_FILE)).unwrap();
        assert!(cleaned.lines().nth(1).unwrap().starts_with("Delhi,2024-01-01,"));

        let metrics: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join(METRICS_FILE)).unwrap()).unwrap();
        assert_eq!(metrics["city"], "Delhi");
        assert_eq!(metrics["days"], 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}
