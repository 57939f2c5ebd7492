use crate::analyzers::breakpoints::BreakpointTables;
use crate::analyzers::category::categorize;
use crate::analyzers::subindex::sub_index;
use crate::analyzers::types::{DailyConcentrations, DailyRecord};
use crate::pollutant::{Pollutant, PollutantValues};

/// Computes the sub-index of every pollutant for one day.
pub fn sub_indices(concentrations: &PollutantValues, tables: &BreakpointTables) -> PollutantValues {
    let mut out = PollutantValues::default();
    for (pollutant, value) in concentrations.iter() {
        let si = tables
            .table(pollutant)
            .and_then(|table| sub_index(value, table));
        out.set(pollutant, si);
    }
    out
}

/// Picks the highest sub-index and the pollutant that produced it.
///
/// Ties go to the pollutant earliest in canonical order. Missing sub-indices
/// are skipped; all Missing yields `None`.
pub fn dominant(sub_indices: &PollutantValues) -> Option<(Pollutant, f64)> {
    sub_indices
        .iter()
        .filter_map(|(pollutant, si)| si.map(|v| (pollutant, v)))
        .fold(None, |best, (pollutant, v)| match best {
            Some((_, top)) if v <= top => best,
            _ => Some((pollutant, v)),
        })
}

/// Derives AQI, dominant pollutant and category for one day.
pub fn compose_day(day: &DailyConcentrations, tables: &BreakpointTables) -> DailyRecord {
    let sub_indices = sub_indices(&day.concentrations, tables);
    let top = dominant(&sub_indices);
    let aqi = top.map(|(_, v)| v);

    DailyRecord {
        date: day.date,
        concentrations: day.concentrations,
        sub_indices,
        aqi,
        dominant_pollutant: top.map(|(p, _)| p),
        category: aqi.map(categorize),
        aqi_reference: day.aqi_reference,
    }
}

/// Composes every day. Days with no usable pollutant are kept with a Missing AQI.
pub fn compose(days: &[DailyConcentrations], tables: &BreakpointTables) -> Vec<DailyRecord> {
    days.iter().map(|day| compose_day(day, tables)).collect()
}
