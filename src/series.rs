//! Time-series containers and resampling.
//!
//! Raw input arrives as integer millisecond timestamps with possibly-missing
//! values; the resampler bins it onto a fixed calendar grid using the
//! lower-decile mean as a "resting" statistic, leaving NaN where a bin holds
//! no samples.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::RhythmoError;

/// Raw caller-owned input: parallel arrays of millisecond-since-epoch
/// timestamps and values. Values may be NaN. Read-only to the pipeline.
#[derive(Debug, Clone)]
pub struct RawSeries {
    /// Identifier used in logs, typically the source file stem.
    pub id: String,
    /// Milliseconds since the Unix epoch, ascending.
    pub timestamps_ms: Vec<i64>,
    /// Observed values, NaN where missing.
    pub values: Vec<f64>,
}

impl RawSeries {
    pub fn new(id: impl Into<String>, timestamps_ms: Vec<i64>, values: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            timestamps_ms,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps_ms.is_empty()
    }
}

/// A regularly sampled series on a calendar grid.
///
/// Invariant: timestamps strictly increase at a fixed interval; `values`
/// has the same length as `timestamps`.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total span between first and last timestamp, in days.
    pub fn duration_days(&self) -> f64 {
        if self.timestamps.len() < 2 {
            return 0.0;
        }
        let span = *self.timestamps.last().unwrap_or(&self.timestamps[0]) - self.timestamps[0];
        span.num_milliseconds() as f64 / MILLISECONDS_IN_A_DAY
    }

    /// Fraction of NaN values.
    pub fn nan_fraction(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let nans = self.values.iter().filter(|v| v.is_nan()).count();
        nans as f64 / self.values.len() as f64
    }

    /// Timestamps as milliseconds since the epoch, as floats.
    pub fn timestamps_ms(&self) -> Vec<f64> {
        self.timestamps
            .iter()
            .map(|t| t.timestamp_millis() as f64)
            .collect()
    }
}

/// A single cycle trace: the band-passed signal over time, with phases once
/// the forecaster has run. Used for both the historic and the projected
/// portion of the cycle.
#[derive(Debug, Clone)]
pub struct Cycle {
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
    /// Instantaneous phase in (-pi, pi], populated by the forecaster.
    pub phases: Option<Vec<f64>>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub const MILLISECONDS_IN_A_DAY: f64 = 86_400_000.0;

/// Converts milliseconds since the epoch to a UTC instant.
pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Interpolated percentile, `q` in [0, 100].
///
/// Matches the linear-interpolation convention: rank `q/100 * (n-1)` between
/// order statistics. NaN values must be filtered by the caller.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Mean of the values at or below the 10th percentile of a bin.
///
/// This is the "resting" aggregate: within each resampling bin, only the
/// lowest tenth of the samples contribute. An empty bin yields NaN.
pub fn lower_decile_mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    let cutoff = percentile(&finite, 10.0);
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in &finite {
        if v <= cutoff {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Bins a raw series into fixed-width intervals and aggregates each bin with
/// the lower-decile mean.
///
/// Bin edges are aligned to multiples of the bin width since the epoch, so a
/// daily rate produces calendar-day bins. Bins with no samples are kept as
/// NaN so the gap structure survives into the sufficiency check.
pub fn resample(raw: &RawSeries, bin_width_ms: i64) -> Result<TimeSeries, RhythmoError> {
    if raw.is_empty() {
        return Err(RhythmoError::InsufficientData("input series is empty".into()));
    }

    let first_bin = raw.timestamps_ms[0].div_euclid(bin_width_ms);
    let last_bin = raw
        .timestamps_ms
        .last()
        .copied()
        .unwrap_or(raw.timestamps_ms[0])
        .div_euclid(bin_width_ms);
    let n_bins = (last_bin - first_bin + 1) as usize;

    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
    for (&ts, &v) in raw.timestamps_ms.iter().zip(raw.values.iter()) {
        let bin = ts.div_euclid(bin_width_ms) - first_bin;
        if bin >= 0 && (bin as usize) < n_bins {
            buckets[bin as usize].push(v);
        }
    }

    let timestamps: Vec<DateTime<Utc>> = (0..n_bins)
        .map(|i| ms_to_datetime((first_bin + i as i64) * bin_width_ms))
        .collect();
    let values: Vec<f64> = buckets.iter().map(|b| lower_decile_mean(b)).collect();

    Ok(TimeSeries { timestamps, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-12);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-12);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_lower_decile_mean_takes_lowest_tenth() {
        // 10th percentile of 0..=10 is 1.0; values <= 1.0 are {0, 1}
        let values: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        assert!((lower_decile_mean(&values) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_lower_decile_mean_empty_bin_is_nan() {
        assert!(lower_decile_mean(&[]).is_nan());
        assert!(lower_decile_mean(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_resample_daily_bins_with_gap() {
        let day = 86_400_000i64;
        // Samples on day 0 and day 2; day 1 has no data.
        let raw = RawSeries::new(
            "t",
            vec![0, 1000, day * 2, day * 2 + 1000],
            vec![10.0, 20.0, 30.0, 40.0],
        );
        let out = resample(&raw, day).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.values[0].is_finite());
        assert!(out.values[1].is_nan());
        assert!(out.values[2].is_finite());
        // fixed interval invariant
        let dt = out.timestamps[1] - out.timestamps[0];
        assert_eq!(dt.num_milliseconds(), day);
    }

    #[test]
    fn test_resample_empty_fails() {
        let raw = RawSeries::new("t", vec![], vec![]);
        assert!(matches!(
            resample(&raw, 86_400_000),
            Err(RhythmoError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_duration_days() {
        let day = 86_400_000i64;
        let raw = RawSeries::new("t", vec![0, day * 10], vec![1.0, 2.0]);
        let out = resample(&raw, day).unwrap();
        assert!((out.duration_days() - 10.0).abs() < 1e-9);
    }
}
