//! National AQI breakpoint tables.
//!
//! Tables are configuration data: they are validated once when loaded and
//! never re-checked on lookup. A validated [`BreakpointTables`] always holds
//! a table for every [`Pollutant`].
//!
//! Override files use the same shape as the built-in set:
//! ```json
//! {
//!   "version": "CPCB-2014",
//!   "tables": {
//!     "pm25": [[0, 30, 0, 50], [31, 60, 51, 100], ...],
//!     ...
//!   }
//! }
//! ```

use crate::error::AqiError;
use crate::pollutant::Pollutant;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top of the national index scale. The last band of every table must end here.
pub const INDEX_SCALE_MAX: f64 = 500.0;

/// Largest concentration gap allowed between consecutive bands.
pub const MAX_BAND_GAP: f64 = 1.0;

const TOLERANCE: f64 = 1e-9;

/// Version tag of the built-in tables.
pub const NATIONAL_VERSION: &str = "CPCB-2014";

/// A concentration range mapped linearly onto an index range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakpointBand {
    pub concentration_low: f64,
    pub concentration_high: f64,
    pub index_low: f64,
    pub index_high: f64,
}

impl BreakpointBand {
    pub const fn new(
        concentration_low: f64,
        concentration_high: f64,
        index_low: f64,
        index_high: f64,
    ) -> Self {
        Self {
            concentration_low,
            concentration_high,
            index_low,
            index_high,
        }
    }

    /// Linear position of `value` on this band's line. Also used past
    /// `concentration_high` to extrapolate the last band.
    pub fn interpolate(&self, value: f64) -> f64 {
        (self.index_high - self.index_low) / (self.concentration_high - self.concentration_low)
            * (value - self.concentration_low)
            + self.index_low
    }
}

/// Ordered, contiguous bands for one pollutant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BreakpointTable {
    bands: Vec<BreakpointBand>,
}

impl BreakpointTable {
    /// Validates `bands` for `pollutant` and wraps them.
    pub fn new(pollutant: Pollutant, bands: Vec<BreakpointBand>) -> Result<Self, AqiError> {
        let invalid = |reason: String| AqiError::InvalidBreakpoints { pollutant, reason };

        let (first, last) = match (bands.first(), bands.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(invalid("table has no bands".to_string())),
        };

        for (i, band) in bands.iter().enumerate() {
            let values = [
                band.concentration_low,
                band.concentration_high,
                band.index_low,
                band.index_high,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(invalid(format!("band {i} has a non-finite bound")));
            }
            if band.concentration_low >= band.concentration_high {
                return Err(invalid(format!(
                    "band {i} concentration range {}..{} is empty",
                    band.concentration_low, band.concentration_high
                )));
            }
            if band.index_low >= band.index_high {
                return Err(invalid(format!(
                    "band {i} index range {}..{} is empty",
                    band.index_low, band.index_high
                )));
            }
        }

        if first.concentration_low.abs() > TOLERANCE {
            return Err(invalid(format!(
                "first band starts at {} instead of 0",
                first.concentration_low
            )));
        }

        for (i, pair) in bands.windows(2).enumerate() {
            let (current, next) = (&pair[0], &pair[1]);
            let gap = next.concentration_low - current.concentration_high;
            if gap < -TOLERANCE {
                return Err(invalid(format!(
                    "bands {i} and {} overlap ({} > {})",
                    i + 1,
                    current.concentration_high,
                    next.concentration_low
                )));
            }
            if gap > MAX_BAND_GAP + TOLERANCE {
                return Err(invalid(format!(
                    "gap of {gap} {} between bands {i} and {} exceeds {MAX_BAND_GAP}",
                    pollutant.unit(),
                    i + 1
                )));
            }
            if next.index_low < current.index_high {
                return Err(invalid(format!(
                    "index decreases between bands {i} and {}",
                    i + 1
                )));
            }
        }

        if (last.index_high - INDEX_SCALE_MAX).abs() > TOLERANCE {
            return Err(invalid(format!(
                "last band ends at index {} instead of {INDEX_SCALE_MAX}",
                last.index_high
            )));
        }

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[BreakpointBand] {
        &self.bands
    }
}

/// The full, versioned set of tables, one per pollutant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakpointTables {
    version: String,
    tables: BTreeMap<Pollutant, BreakpointTable>,
}

/// Unvalidated on-disk form.
#[derive(Debug, Deserialize)]
struct RawTables {
    version: String,
    tables: BTreeMap<Pollutant, Vec<BreakpointBand>>,
}

impl BreakpointTables {
    /// Validates a raw mapping. Every pollutant must have a valid table.
    pub fn new(
        version: impl Into<String>,
        mut raw: BTreeMap<Pollutant, Vec<BreakpointBand>>,
    ) -> Result<Self, AqiError> {
        let mut tables = BTreeMap::new();
        for pollutant in Pollutant::ALL {
            let bands = raw
                .remove(&pollutant)
                .ok_or(AqiError::MissingTable(pollutant))?;
            tables.insert(pollutant, BreakpointTable::new(pollutant, bands)?);
        }
        Ok(Self {
            version: version.into(),
            tables,
        })
    }

    /// The built-in national tables. CO is in mg/m³, everything else in µg/m³.
    pub fn national() -> Result<Self, AqiError> {
        let b = BreakpointBand::new;
        let raw = BTreeMap::from([
            (
                Pollutant::Pm25,
                vec![
                    b(0.0, 30.0, 0.0, 50.0),
                    b(31.0, 60.0, 51.0, 100.0),
                    b(61.0, 90.0, 101.0, 200.0),
                    b(91.0, 120.0, 201.0, 300.0),
                    b(121.0, 250.0, 301.0, 400.0),
                    b(251.0, 500.0, 401.0, 500.0),
                ],
            ),
            (
                Pollutant::Pm10,
                vec![
                    b(0.0, 50.0, 0.0, 50.0),
                    b(51.0, 100.0, 51.0, 100.0),
                    b(101.0, 250.0, 101.0, 200.0),
                    b(251.0, 350.0, 201.0, 300.0),
                    b(351.0, 430.0, 301.0, 400.0),
                    b(431.0, 600.0, 401.0, 500.0),
                ],
            ),
            (
                Pollutant::No2,
                vec![
                    b(0.0, 40.0, 0.0, 50.0),
                    b(41.0, 80.0, 51.0, 100.0),
                    b(81.0, 180.0, 101.0, 200.0),
                    b(181.0, 280.0, 201.0, 300.0),
                    b(281.0, 400.0, 301.0, 400.0),
                    b(401.0, 600.0, 401.0, 500.0),
                ],
            ),
            (
                Pollutant::So2,
                vec![
                    b(0.0, 40.0, 0.0, 50.0),
                    b(41.0, 80.0, 51.0, 100.0),
                    b(81.0, 380.0, 101.0, 200.0),
                    b(381.0, 800.0, 201.0, 300.0),
                    b(801.0, 1600.0, 301.0, 400.0),
                    b(1601.0, 2000.0, 401.0, 500.0),
                ],
            ),
            (
                Pollutant::Co,
                vec![
                    b(0.0, 1.0, 0.0, 50.0),
                    b(1.1, 2.0, 51.0, 100.0),
                    b(2.1, 10.0, 101.0, 200.0),
                    b(10.1, 17.0, 201.0, 300.0),
                    b(17.1, 34.0, 301.0, 400.0),
                    b(34.1, 50.0, 401.0, 500.0),
                ],
            ),
        ]);
        Self::new(NATIONAL_VERSION, raw)
    }

    /// Loads and validates tables from a JSON file at `path`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read breakpoint file '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("invalid breakpoint file '{path}'"))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let raw: RawTables = serde_json::from_str(content)?;
        Ok(Self::new(raw.version, raw.tables)?)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Table for `pollutant`; always present once validated.
    pub fn table(&self, pollutant: Pollutant) -> Option<&BreakpointTable> {
        self.tables.get(&pollutant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_national_tables_validate() {
        let tables = BreakpointTables::national().unwrap();
        assert_eq!(tables.version(), NATIONAL_VERSION);
        for pollutant in Pollutant::ALL {
            let table = tables.table(pollutant).unwrap();
            assert_eq!(table.bands().len(), 6);
            assert_eq!(table.bands().last().unwrap().index_high, INDEX_SCALE_MAX);
        }
    }

    #[test]
    fn test_interpolate_literal_band() {
        let band = BreakpointBand::new(0.0, 30.0, 0.0, 50.0);
        assert!((band.interpolate(20.0) - 33.333_333).abs() < 1e-4);
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = BreakpointTable::new(Pollutant::Pm25, vec![]).unwrap_err();
        assert!(matches!(
            err,
            AqiError::InvalidBreakpoints { pollutant: Pollutant::Pm25, .. }
        ));
    }

    #[test]
    fn test_wide_gap_rejected() {
        let bands = vec![
            BreakpointBand::new(0.0, 30.0, 0.0, 50.0),
            BreakpointBand::new(40.0, 500.0, 51.0, 500.0),
        ];
        let err = BreakpointTable::new(Pollutant::No2, bands).unwrap_err();
        assert!(err.to_string().contains("NO2"));
        assert!(err.to_string().contains("gap"));
    }

    #[test]
    fn test_overlap_rejected() {
        let bands = vec![
            BreakpointBand::new(0.0, 30.0, 0.0, 50.0),
            BreakpointBand::new(25.0, 500.0, 51.0, 500.0),
        ];
        assert!(BreakpointTable::new(Pollutant::So2, bands).is_err());
    }

    #[test]
    fn test_scale_must_end_at_500() {
        let bands = vec![
            BreakpointBand::new(0.0, 30.0, 0.0, 50.0),
            BreakpointBand::new(31.0, 60.0, 51.0, 100.0),
        ];
        let err = BreakpointTable::new(Pollutant::Co, bands).unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_first_band_must_start_at_zero() {
        let bands = vec![BreakpointBand::new(5.0, 500.0, 0.0, 500.0)];
        assert!(BreakpointTable::new(Pollutant::Pm10, bands).is_err());
    }

    #[test]
    fn test_missing_pollutant_table() {
        let raw = BTreeMap::from([(
            Pollutant::Pm25,
            vec![BreakpointBand::new(0.0, 500.0, 0.0, 500.0)],
        )]);
        let err = BreakpointTables::new("custom", raw).unwrap_err();
        assert_eq!(err, AqiError::MissingTable(Pollutant::Pm10));
    }

    #[test]
    fn test_from_json_accepts_band_tuples() {
        let json = r#"{
            "version": "flat-test",
            "tables": {
                "pm25": [[0, 100, 0, 100], [100, 200, 100, 500]],
                "pm10": [[0, 500, 0, 500]],
                "no2":  [[0, 500, 0, 500]],
                "so2":  [[0, 500, 0, 500]],
                "co":   [[0, 50, 0, 500]]
            }
        }"#;
        let tables = BreakpointTables::from_json(json).unwrap();
        assert_eq!(tables.version(), "flat-test");
        assert_eq!(tables.table(Pollutant::Pm25).unwrap().bands().len(), 2);
    }

    #[test]
    fn test_from_json_rejects_invalid_table() {
        let json = r#"{
            "version": "broken",
            "tables": {
                "pm25": [[0, 100, 0, 100]],
                "pm10": [[0, 500, 0, 500]],
                "no2":  [[0, 500, 0, 500]],
                "so2":  [[0, 500, 0, 500]],
                "co":   [[0, 50, 0, 500]]
            }
        }"#;
        let err = BreakpointTables::from_json(json).unwrap_err();
        let typed = err.downcast_ref::<AqiError>().unwrap();
        assert!(matches!(
            typed,
            AqiError::InvalidBreakpoints { pollutant: Pollutant::Pm25, .. }
        ));
    }
}
