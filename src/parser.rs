//! Decoders for hourly air-quality data: the Open-Meteo JSON payload and the
//! raw hourly CSV this crate writes.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::warn;

use crate::analyzers::types::HourlyReading;
use crate::config::PipelineConfig;
use crate::pollutant::{Pollutant, PollutantValues};

/// Open-Meteo reports CO in µg/m³; the CO breakpoint table is in mg/m³.
const CO_UG_PER_MG: f64 = 1000.0;

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    #[serde(default)]
    pm2_5: Vec<Option<f64>>,
    #[serde(default)]
    pm10: Vec<Option<f64>>,
    #[serde(default)]
    nitrogen_dioxide: Vec<Option<f64>>,
    #[serde(default)]
    sulphur_dioxide: Vec<Option<f64>>,
    #[serde(default)]
    carbon_monoxide: Vec<Option<f64>>,
    #[serde(default)]
    us_aqi: Vec<Option<f64>>,
}

fn cell(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

/// Decodes an Open-Meteo air-quality response into hourly readings.
///
/// Local timestamps are combined with `utc_offset_seconds`. Null values and
/// short columns become Missing.
///
/// # Errors
///
/// Returns an error if the body is not JSON, has no `hourly` block, or
/// contains an unparseable timestamp.
pub fn parse_open_meteo(bytes: &[u8]) -> Result<Vec<HourlyReading>> {
    let response: OpenMeteoResponse =
        serde_json::from_slice(bytes).context("failed to decode Open-Meteo response")?;
    let hourly = response
        .hourly
        .ok_or_else(|| anyhow!("Open-Meteo response did not include hourly data"))?;
    let offset = FixedOffset::east_opt(response.utc_offset_seconds)
        .ok_or_else(|| anyhow!("invalid utc_offset_seconds {}", response.utc_offset_seconds))?;

    hourly
        .time
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
                .with_context(|| format!("invalid timestamp '{raw}' at row {i}"))?;
            let timestamp = naive
                .and_local_timezone(offset)
                .single()
                .ok_or_else(|| anyhow!("ambiguous timestamp '{raw}'"))?;

            Ok(HourlyReading {
                timestamp,
                concentrations: PollutantValues::from_values([
                    cell(&hourly.pm2_5, i),
                    cell(&hourly.pm10, i),
                    cell(&hourly.nitrogen_dioxide, i),
                    cell(&hourly.sulphur_dioxide, i),
                    cell(&hourly.carbon_monoxide, i).map(|ug| ug / CO_UG_PER_MG),
                ]),
                aqi_reference: cell(&hourly.us_aqi, i),
            })
        })
        .collect()
}

/// One row of the raw hourly CSV. Empty fields are Missing.
///
/// Every row repeats the site it was recorded at, so a saved file can be
/// reprocessed without its original config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRow {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub datetime: DateTime<FixedOffset>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,
    pub aqi_reference: Option<f64>,
}

impl HourlyRow {
    pub fn new(config: &PipelineConfig, r: &HourlyReading) -> Self {
        let c = &r.concentrations;
        HourlyRow {
            city: config.city.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            datetime: r.timestamp,
            pm25: c.get(Pollutant::Pm25),
            pm10: c.get(Pollutant::Pm10),
            no2: c.get(Pollutant::No2),
            so2: c.get(Pollutant::So2),
            co: c.get(Pollutant::Co),
            aqi_reference: r.aqi_reference,
        }
    }

    fn site(&self) -> Site {
        Site {
            city: self.city.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl From<HourlyRow> for HourlyReading {
    fn from(row: HourlyRow) -> Self {
        HourlyReading {
            timestamp: row.datetime,
            concentrations: PollutantValues::from_values([
                row.pm25, row.pm10, row.no2, row.so2, row.co,
            ]),
            aqi_reference: row.aqi_reference.filter(|v| v.is_finite()),
        }
    }
}

/// The location a raw hourly file was recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Contents of a raw hourly CSV. `site` is `None` for a file with no rows.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyFile {
    pub site: Option<Site>,
    pub readings: Vec<HourlyReading>,
}

/// Reads a raw hourly CSV written by [`crate::output::write_hourly_csv`].
///
/// The site is taken from the first row; rows naming another city are
/// kept but logged.
pub fn read_hourly_csv(path: &Path) -> Result<HourlyFile> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut site: Option<Site> = None;
    let mut foreign = 0usize;
    let mut readings = Vec::new();
    for result in rdr.deserialize() {
        let row: HourlyRow = result?;
        match &site {
            None => site = Some(row.site()),
            Some(s) if s.city != row.city => foreign += 1,
            Some(_) => {}
        }
        readings.push(row.into());
    }

    if foreign > 0 {
        warn!(path = %path.display(), foreign, "Raw file mixes rows from several cities");
    }
    Ok(HourlyFile { site, readings })
}
