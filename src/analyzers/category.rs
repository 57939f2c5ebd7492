use serde::Serialize;
use std::fmt;

/// National health category for an AQI value.
///
/// | AQI       | Category     |
/// |-----------|--------------|
/// | <= 50     | Good         |
/// | <= 100    | Satisfactory |
/// | <= 200    | Moderate     |
/// | <= 300    | Poor         |
/// | <= 400    | Very Poor    |
/// | > 400     | Severe       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl AqiCategory {
    pub fn label(self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Satisfactory => "Satisfactory",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Poor => "Poor",
            AqiCategory::VeryPoor => "Very Poor",
            AqiCategory::Severe => "Severe",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Converts an AQI value into its category. Extrapolated values above 500 stay `Severe`.
pub fn categorize(aqi: f64) -> AqiCategory {
    match aqi {
        a if a <= 50.0 => AqiCategory::Good,
        a if a <= 100.0 => AqiCategory::Satisfactory,
        a if a <= 200.0 => AqiCategory::Moderate,
        a if a <= 300.0 => AqiCategory::Poor,
        a if a <= 400.0 => AqiCategory::VeryPoor,
        _ => AqiCategory::Severe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_boundaries() {
        assert_eq!(categorize(0.0), AqiCategory::Good);
        assert_eq!(categorize(50.0), AqiCategory::Good);
        assert_eq!(categorize(50.5), AqiCategory::Satisfactory);
        assert_eq!(categorize(100.0), AqiCategory::Satisfactory);
        assert_eq!(categorize(101.0), AqiCategory::Moderate);
        assert_eq!(categorize(200.0), AqiCategory::Moderate);
        assert_eq!(categorize(250.0), AqiCategory::Poor);
        assert_eq!(categorize(400.0), AqiCategory::VeryPoor);
        assert_eq!(categorize(401.0), AqiCategory::Severe);
        assert_eq!(categorize(539.0), AqiCategory::Severe);
    }

    #[test]
    fn test_label() {
        assert_eq!(AqiCategory::VeryPoor.to_string(), "Very Poor");
    }
}
