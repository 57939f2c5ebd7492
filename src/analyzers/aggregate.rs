use crate::analyzers::types::{DailyConcentrations, DateSpan, HourlyReading};
use crate::pollutant::{Pollutant, PollutantValues};
use tracing::debug;

/// Running sum and count for one cell.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite() && *v >= 0.0) {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DayBucket {
    pollutants: [Accumulator; 5],
    reference: Accumulator,
}

/// Resamples hourly readings into one record per calendar day of `span`.
///
/// Each cell is the mean of the hours present that day. Missing daily cells
/// are then filled per pollutant: linearly between the nearest known days,
/// or with the nearest known value at either end of the span. A pollutant
/// with no data on any day stays Missing. Readings outside `span` are ignored.
/// The reference AQI is averaged but never interpolated.
#[tracing::instrument(skip(readings), fields(readings = readings.len(), start = %span.start, end = %span.end))]
pub fn aggregate_daily(readings: &[HourlyReading], span: DateSpan) -> Vec<DailyConcentrations> {
    let mut buckets = vec![DayBucket::default(); span.len()];
    let mut outside = 0usize;

    for reading in readings {
        let date = reading.local_date();
        if !span.contains(date) {
            outside += 1;
            continue;
        }
        let bucket = &mut buckets[(date - span.start).num_days() as usize];
        for (pollutant, value) in reading.concentrations.iter() {
            bucket.pollutants[pollutant as usize].push(value);
        }
        bucket.reference.push(reading.aqi_reference);
    }

    if outside > 0 {
        debug!(outside, "Ignored readings outside the requested span");
    }

    let mut days: Vec<DailyConcentrations> = span
        .days()
        .zip(&buckets)
        .map(|(date, bucket)| {
            let mut concentrations = PollutantValues::default();
            for pollutant in Pollutant::ALL {
                concentrations.set(pollutant, bucket.pollutants[pollutant as usize].mean());
            }
            DailyConcentrations {
                date,
                concentrations,
                aqi_reference: bucket.reference.mean(),
            }
        })
        .collect();

    for pollutant in Pollutant::ALL {
        let mut column: Vec<Option<f64>> = days
            .iter()
            .map(|d| d.concentrations.get(pollutant))
            .collect();
        let filled = fill_gaps(&mut column);
        if filled > 0 {
            debug!(pollutant = %pollutant, filled, "Interpolated missing daily values");
        }
        for (day, value) in days.iter_mut().zip(column) {
            day.concentrations.set(pollutant, value);
        }
    }

    days
}

/// Fills `None` cells from their known neighbours and returns how many were filled.
///
/// Interior gaps are interpolated linearly by position; leading and trailing
/// gaps take the nearest known value. A column with no known values is left alone.
pub fn fill_gaps(column: &mut [Option<f64>]) -> usize {
    let known: Vec<usize> = column
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return 0;
    };

    let mut filled = 0;

    let head = column[first];
    for cell in &mut column[..first] {
        *cell = head;
        filled += 1;
    }

    let tail = column[last];
    for cell in &mut column[last + 1..] {
        *cell = tail;
        filled += 1;
    }

    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        if let (Some(va), Some(vb)) = (column[a], column[b]) {
            let width = (b - a) as f64;
            for i in a + 1..b {
                column[i] = Some(va + (vb - va) * (i - a) as f64 / width);
                filled += 1;
            }
        }
    }

    filled
}
