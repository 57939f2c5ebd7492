use anyhow::{Context, Result};
use aqi_pipeline::analyzers::types::HourlyReading;
use aqi_pipeline::config::PipelineConfig;
use aqi_pipeline::fetch::{BasicClient, HttpClient, fetch_bytes};
use aqi_pipeline::parser::parse_open_meteo;
use async_trait::async_trait;
use reqwest::Url;
use tracing::info;

use crate::services::air_quality_source::AirQualitySource;

pub const DEFAULT_BASE_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";

/// Hourly variables requested from the API, in its own naming.
const HOURLY_VARIABLES: &str =
    "pm2_5,pm10,carbon_monoxide,nitrogen_dioxide,sulphur_dioxide,us_aqi";

pub struct OpenMeteoClient<C: HttpClient = BasicClient> {
    base_url: String,
    http: C,
}

impl OpenMeteoClient<BasicClient> {
    /// Uses `OPEN_METEO_URL` when set, otherwise the public endpoint.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("OPEN_METEO_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::with_client(base_url, BasicClient::new()?))
    }
}

impl<C: HttpClient> OpenMeteoClient<C> {
    pub fn with_client(base_url: impl Into<String>, http: C) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub fn request_url(&self, config: &PipelineConfig) -> Result<Url> {
        let params = [
            ("latitude", config.latitude.to_string()),
            ("longitude", config.longitude.to_string()),
            ("start_date", config.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", config.end_date.format("%Y-%m-%d").to_string()),
            ("hourly", HOURLY_VARIABLES.to_string()),
            ("timeformat", "iso8601".to_string()),
            ("timezone", "auto".to_string()),
        ];
        Url::parse_with_params(&self.base_url, &params)
            .with_context(|| format!("invalid Open-Meteo base URL '{}'", self.base_url))
    }
}

#[async_trait]
impl<C: HttpClient> AirQualitySource for OpenMeteoClient<C> {
    #[tracing::instrument(skip_all, fields(city = %config.city))]
    async fn hourly_readings(&self, config: &PipelineConfig) -> Result<Vec<HourlyReading>> {
        let url = self.request_url(config)?;
        info!(url = %url, "Downloading hourly observations from Open-Meteo");

        let bytes = fetch_bytes(&self.http, url.as_str())
            .await
            .with_context(|| format!("Open-Meteo request failed for {}", config.city))?;
        let readings = parse_open_meteo(&bytes)?;

        info!(rows = readings.len(), "Hourly observations received");
        Ok(readings)
    }
}
