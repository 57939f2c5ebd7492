//! Trait for the upstream provider of hourly pollutant readings.

use anyhow::Result;
use aqi_pipeline::analyzers::types::HourlyReading;
use aqi_pipeline::config::PipelineConfig;

/// Abstraction over a remote air-quality data provider (e.g., Open-Meteo).
#[async_trait::async_trait]
pub trait AirQualitySource: Send + Sync {
    /// Returns hourly readings for the config's city and date range,
    /// timestamped in the city's local offset.
    async fn hourly_readings(&self, config: &PipelineConfig) -> Result<Vec<HourlyReading>>;
}
