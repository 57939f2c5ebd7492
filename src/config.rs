//! Per-run pipeline configuration.
//!
//! A [`PipelineConfig`] is an immutable value handed to every entry point, so
//! several cities or date ranges can run side by side without sharing state.
//! Stored on disk as a plain JSON object:
//! ```json
//! {
//!   "city": "Delhi",
//!   "latitude": 28.6139,
//!   "longitude": 77.209,
//!   "start_date": "2024-01-01",
//!   "end_date": "2024-03-31"
//! }
//! ```

use crate::analyzers::types::DateSpan;
use crate::error::AqiError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for PipelineConfig {
    /// Delhi, first quarter of 2024.
    fn default() -> Self {
        Self {
            city: "Delhi".to_string(),
            latitude: 28.6139,
            longitude: 77.209,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap_or_default(),
        }
    }
}

impl PipelineConfig {
    /// Loads and validates a config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{path}'"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), AqiError> {
        if self.start_date > self.end_date {
            return Err(AqiError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// The inclusive day span this run covers.
    pub fn span(&self) -> DateSpan {
        DateSpan::new(self.start_date, self.end_date)
    }

    /// Filesystem-safe lowercase city name, e.g. `"New Delhi"` -> `"new_delhi"`.
    pub fn city_slug(&self) -> String {
        self.city
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_default_is_delhi_first_quarter() {
        let config = PipelineConfig::default();
        assert_eq!(config.city, "Delhi");
        assert_eq!(config.span().days().count(), 91);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_json() {
        let path = temp_path("aqi_pipeline_test_config.json");
        fs::write(
            &path,
            r#"{"city":"Mumbai","latitude":19.07,"longitude":72.87,
                "start_date":"2024-05-01","end_date":"2024-05-31"}"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.city, "Mumbai");
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let config = PipelineConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AqiError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_city_slug() {
        let config = PipelineConfig {
            city: "New Delhi".to_string(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.city_slug(), "new_delhi");
    }
}
