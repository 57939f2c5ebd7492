//! Pollutant identifiers and the fixed-key concentration map used by every stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pollutant with a national AQI breakpoint table.
///
/// Declaration order is the canonical order used to break ties when two
/// pollutants share the highest sub-index: PM2.5 > PM10 > NO2 > SO2 > CO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    So2,
    Co,
}

impl Pollutant {
    /// All pollutants in canonical order.
    pub const ALL: [Pollutant; 5] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::Co,
    ];

    /// Concentration unit the breakpoint table is expressed in.
    pub fn unit(self) -> &'static str {
        match self {
            Pollutant::Co => "mg/m³",
            _ => "µg/m³",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::No2 => "NO2",
            Pollutant::So2 => "SO2",
            Pollutant::Co => "CO",
        };
        f.write_str(label)
    }
}

/// One value per pollutant, `None` meaning Missing. Holds either
/// concentrations or sub-indices.
///
/// Keys are fixed, so an absent reading is always an explicit `None`
/// rather than a missing entry. Negative and non-finite values are stored
/// as Missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollutantValues([Option<f64>; 5]);

impl PollutantValues {
    /// Builds a map from values in canonical order.
    pub fn from_values(values: [Option<f64>; 5]) -> Self {
        let mut c = PollutantValues::default();
        for (pollutant, value) in Pollutant::ALL.into_iter().zip(values) {
            c.set(pollutant, value);
        }
        c
    }

    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        self.0[pollutant.slot()]
    }

    pub fn set(&mut self, pollutant: Pollutant, value: Option<f64>) {
        self.0[pollutant.slot()] = value.filter(|v| v.is_finite() && *v >= 0.0);
    }

    /// Iterates `(pollutant, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, Option<f64>)> + '_ {
        Pollutant::ALL.into_iter().map(|p| (p, self.get(p)))
    }
}
