use crate::analyzers::breakpoints::{BreakpointBand, BreakpointTable};

/// Maps one concentration onto its AQI sub-index.
///
/// Returns `None` for a missing, non-finite or negative concentration.
/// Bands are scanned in ascending order and the first band whose upper bound
/// covers `value` is interpolated. A value falling in the rounding gap just
/// below that band is bridged from the previous band's top, which keeps the
/// result continuous and monotonic. Values above the last band follow the
/// last band's slope and may exceed 500; nothing is clipped.
pub fn sub_index(value: Option<f64>, table: &BreakpointTable) -> Option<f64> {
    let value = value.filter(|v| v.is_finite() && *v >= 0.0)?;
    let bands = table.bands();

    let mut previous: Option<&BreakpointBand> = None;
    for band in bands {
        if value <= band.concentration_high {
            return Some(match previous {
                Some(prev) if value < band.concentration_low => bridge(prev, band, value),
                _ => band.interpolate(value),
            });
        }
        previous = Some(band);
    }

    bands.last().map(|band| band.interpolate(value))
}

/// Interpolates across the gap between `lower`'s top and `upper`'s bottom.
fn bridge(lower: &BreakpointBand, upper: &BreakpointBand, value: f64) -> f64 {
    let span = upper.concentration_low - lower.concentration_high;
    let fraction = (value - lower.concentration_high) / span;
    lower.index_high + fraction * (upper.index_low - lower.index_high)
}
