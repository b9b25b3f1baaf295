//! Landmark scheduling over the projected future cycle.
//!
//! Turns the forecast into concrete timestamps at which to act: evenly
//! spaced samples, cycle peaks and troughs, or the four-way split that adds
//! rising and falling edges at the midpoints between adjacent extrema.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::Parameters;
use crate::error::RhythmoError;
use crate::series::Cycle;

/// One named column of scheduled timestamps.
#[derive(Debug, Clone)]
pub struct ScheduleColumn {
    pub name: String,
    pub times: Vec<DateTime<Utc>>,
}

/// Scheduled landmark times grouped by landmark kind.
#[derive(Debug, Clone)]
pub struct FutureSchedule {
    pub columns: Vec<ScheduleColumn>,
}

impl FutureSchedule {
    /// Total number of scheduled timestamps across all columns.
    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.times.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, name: &str) -> Option<&ScheduleColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Strict local maxima indices of `values`.
fn local_maxima(values: &[f64]) -> Vec<usize> {
    (1..values.len().saturating_sub(1))
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .collect()
}

/// Strict local minima indices of `values`.
fn local_minima(values: &[f64]) -> Vec<usize> {
    (1..values.len().saturating_sub(1))
        .filter(|&i| values[i] < values[i - 1] && values[i] < values[i + 1])
        .collect()
}

/// `count` indices evenly spaced over `0..len`, by linear interpolation
/// rounded to the nearest integer.
fn linspace_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![0];
    }
    let last = (len - 1) as f64;
    (0..count)
        .map(|i| (i as f64 * last / (count - 1) as f64).round() as usize)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Peak,
    Trough,
}

/// Midpoint timestamps between consecutive extrema, labeled by direction.
///
/// Walking the merged extrema chronologically, the midpoint of a
/// trough-to-peak pair is a rising edge and the midpoint of a peak-to-trough
/// pair a falling edge.
fn edge_midpoints(cycle: &Cycle, peaks: &[usize], troughs: &[usize]) -> (Vec<DateTime<Utc>>, Vec<DateTime<Utc>>) {
    let mut extrema: Vec<(usize, Extremum)> = peaks
        .iter()
        .map(|&i| (i, Extremum::Peak))
        .chain(troughs.iter().map(|&i| (i, Extremum::Trough)))
        .collect();
    extrema.sort_by_key(|&(i, _)| i);

    let mut rising = Vec::new();
    let mut falling = Vec::new();
    for pair in extrema.windows(2) {
        let (a_idx, a_kind) = pair[0];
        let (b_idx, b_kind) = pair[1];
        if a_kind == b_kind {
            continue;
        }
        let a_ms = cycle.timestamps[a_idx].timestamp_millis();
        let b_ms = cycle.timestamps[b_idx].timestamp_millis();
        let mid = crate::series::ms_to_datetime((a_ms + b_ms) / 2);
        match a_kind {
            Extremum::Trough => rising.push(mid),
            Extremum::Peak => falling.push(mid),
        }
    }
    (rising, falling)
}

fn times_at(cycle: &Cycle, indices: &[usize], count: usize) -> Vec<DateTime<Utc>> {
    indices
        .iter()
        .take(count)
        .map(|&i| cycle.timestamps[i])
        .collect()
}

/// Builds the landmark schedule for the future cycle.
///
/// Policies:
/// * `regular_sampling`: `count >= 1` evenly spaced samples.
/// * `peak_trough`: `count <= 8`, split `ceil/floor` between peaks and
///   troughs, taken chronologically.
/// * `peak_trough_rising_falling`: `4 <= count <= 16`, split into quarters
///   with the remainder going to peaks, then falling, then troughs.
pub fn schedule(future: &Cycle, params: &Parameters) -> Result<FutureSchedule, RhythmoError> {
    let count = params.number_of_future_phases;
    let policy = params.timing_of_future_phases.as_str();

    if count == 0 {
        return Err(RhythmoError::InvalidCount {
            policy: "any",
            requested: 0,
            min: 1,
            max: usize::MAX,
        });
    }

    let columns = match policy {
        "regular_sampling" => {
            let indices = linspace_indices(future.len(), count);
            vec![ScheduleColumn {
                name: "regular".to_string(),
                times: times_at(future, &indices, count),
            }]
        }
        "peak_trough" => {
            if count > 8 {
                return Err(RhythmoError::TooManyLandmarks {
                    requested: count,
                    max: 8,
                });
            }
            let num_peaks = count.div_ceil(2);
            let num_troughs = count / 2;
            let peaks = local_maxima(&future.values);
            let troughs = local_minima(&future.values);
            vec![
                ScheduleColumn {
                    name: "peaks".to_string(),
                    times: times_at(future, &peaks, num_peaks),
                },
                ScheduleColumn {
                    name: "troughs".to_string(),
                    times: times_at(future, &troughs, num_troughs),
                },
            ]
        }
        "peak_trough_rising_falling" => {
            if !(4..=16).contains(&count) {
                return Err(RhythmoError::InvalidCount {
                    policy: "peak_trough_rising_falling",
                    requested: count,
                    min: 4,
                    max: 16,
                });
            }
            let base = count / 4;
            let remainder = count % 4;
            let num_peaks = base + usize::from(remainder >= 1);
            let num_falling = base + usize::from(remainder >= 2);
            let num_troughs = base + usize::from(remainder >= 3);
            let num_rising = base;

            let peaks = local_maxima(&future.values);
            let troughs = local_minima(&future.values);
            let (rising, falling) = edge_midpoints(future, &peaks, &troughs);
            vec![
                ScheduleColumn {
                    name: "peaks".to_string(),
                    times: times_at(future, &peaks, num_peaks),
                },
                ScheduleColumn {
                    name: "troughs".to_string(),
                    times: times_at(future, &troughs, num_troughs),
                },
                ScheduleColumn {
                    name: "rising".to_string(),
                    times: rising.into_iter().take(num_rising).collect(),
                },
                ScheduleColumn {
                    name: "falling".to_string(),
                    times: falling.into_iter().take(num_falling).collect(),
                },
            ]
        }
        other => return Err(RhythmoError::UnsupportedSchedule(other.to_string())),
    };

    let out = FutureSchedule { columns };
    debug!(policy, requested = count, scheduled = out.len(), "schedule built");
    Ok(out)
}
