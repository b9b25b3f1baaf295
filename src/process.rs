//! Preprocessor stage: resampling, sufficiency checking, interpolation and
//! standardization.
//!
//! A series is sufficient when at most 30% of its resampled bins are missing.
//! Beyond that, the longest contiguous sub-segment spanning more than 90 days
//! with at most 30% missing bins is used instead; if none exists the input is
//! rejected and the run aborts for that input only.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::Parameters;
use crate::error::RhythmoError;
use crate::series::{resample, RawSeries, TimeSeries};

const MAX_NAN_FRACTION: f64 = 0.3;
const MIN_SEGMENT_DAYS: i64 = 90;
const SLIDING_WINDOW_DAYS: i64 = 30;

/// Output of the preprocessor: the accepted (interpolated) resampled series
/// and its standardized companion.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Resampled series over the accepted segment, NaNs replaced by the
    /// segment mean.
    pub resampled: TimeSeries,
    /// Zero-mean, unit-variance copy of `resampled`.
    pub standardized: TimeSeries,
    /// Index range of the accepted segment within the full resampled series.
    pub segment: (usize, usize),
}

/// Index of the timestamp nearest to `pivot`.
fn nearest_index(timestamps: &[DateTime<Utc>], pivot: DateTime<Utc>) -> usize {
    let mut best = 0usize;
    let mut best_dist = i64::MAX;
    for (i, &t) in timestamps.iter().enumerate() {
        let dist = (t - pivot).num_milliseconds().abs();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

fn nan_fraction(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| v.is_nan()).count() as f64 / values.len() as f64
}

/// Finds the accepted segment of the resampled series.
///
/// Returns the inclusive index range `(start, end)` of the chosen segment,
/// or an error when the series is empty or no qualifying segment exists.
pub fn check_sufficient_data(series: &TimeSeries) -> Result<(usize, usize), RhythmoError> {
    if series.is_empty() {
        return Err(RhythmoError::InsufficientData("resampled series is empty".into()));
    }

    if nan_fraction(&series.values) <= MAX_NAN_FRACTION {
        return Ok((0, series.len() - 1));
    }

    // Candidate segment boundaries roughly one per month from the start.
    let window = Duration::days(SLIDING_WINDOW_DAYS);
    let min_span = Duration::days(MIN_SEGMENT_DAYS);
    let last_ts = *series.timestamps.last().unwrap_or(&series.timestamps[0]);

    let mut boundary_inds: Vec<usize> = Vec::new();
    let mut k = 1i32;
    loop {
        let next_date = series.timestamps[0] + window * k;
        if next_date >= last_ts {
            break;
        }
        boundary_inds.push(nearest_index(&series.timestamps, next_date));
        k += 1;
    }

    let mut max_duration = Duration::zero();
    let mut longest: (usize, usize) = (0, 0);

    for (i, &start) in boundary_inds.iter().enumerate() {
        for &end in &boundary_inds[i + 1..] {
            if series.timestamps[end] - series.timestamps[start] <= min_span {
                continue;
            }
            let segment = &series.values[start..=end];
            let span = series.timestamps[end] - series.timestamps[start];
            if nan_fraction(segment) <= MAX_NAN_FRACTION && span > max_duration {
                max_duration = span;
                longest = (start, end);
            }
        }
    }

    if longest.1 <= longest.0 {
        return Err(RhythmoError::InsufficientData(
            "no segment over 90 days with at most 30% missing values".into(),
        ));
    }
    Ok(longest)
}

/// Replaces NaN values with the mean of the finite values, in place.
pub fn interpolate(values: &mut [f64]) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = mean;
        }
    }
}

/// Rescales to zero mean and unit sample variance (N-1 denominator).
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n as f64 - 1.0);
    let std = var.sqrt();
    if std <= f64::EPSILON {
        return values.iter().map(|v| v - mean).collect();
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

/// Runs the preprocessor: resample, sufficiency check, interpolate,
/// standardize.
pub fn process(raw: &RawSeries, params: &Parameters) -> Result<Preprocessed, RhythmoError> {
    let bin_width = params.bin_width_ms()?;
    let full = resample(raw, bin_width)?;
    debug!(
        bins = full.len(),
        nan_fraction = full.nan_fraction(),
        "resampled input"
    );

    let (start, end) = check_sufficient_data(&full)?;
    if (start, end) != (0, full.len() - 1) {
        warn!(
            start,
            end,
            "high missing-value fraction, using longest sufficient segment"
        );
    }

    let mut resampled = TimeSeries {
        timestamps: full.timestamps[start..=end].to_vec(),
        values: full.values[start..=end].to_vec(),
    };
    interpolate(&mut resampled.values);

    let standardized = TimeSeries {
        timestamps: resampled.timestamps.clone(),
        values: standardize(&resampled.values),
    };

    Ok(Preprocessed {
        resampled,
        standardized,
        segment: (start, end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ms_to_datetime;

    fn daily_series(values: Vec<f64>) -> TimeSeries {
        let day = 86_400_000i64;
        let timestamps = (0..values.len())
            .map(|i| ms_to_datetime(i as i64 * day))
            .collect();
        TimeSeries { timestamps, values }
    }

    #[test]
    fn test_sufficiency_accepts_exactly_30_percent_nan() {
        // 100 daily bins, exactly 30 NaN
        let mut values = vec![1.0; 100];
        for v in values.iter_mut().take(30) {
            *v = f64::NAN;
        }
        let series = daily_series(values);
        assert_eq!(check_sufficient_data(&series).unwrap(), (0, 99));
    }

    #[test]
    fn test_sufficiency_searches_segment_above_30_percent() {
        // 400 daily bins: first 200 all NaN, last 200 clean. Overall 50% NaN
        // forces the segment search, which should land inside the clean half.
        let mut values = vec![f64::NAN; 200];
        values.extend(vec![1.0; 200]);
        let series = daily_series(values);
        let (start, end) = check_sufficient_data(&series).unwrap();
        let span_days = (end - start) as i64;
        assert!(span_days > 90);
        // the winning segment may carry NaN up to the 30% budget, but no more
        let frac = series.values[start..=end]
            .iter()
            .filter(|v| v.is_nan())
            .count() as f64
            / (end - start + 1) as f64;
        assert!(frac <= 0.3, "chosen segment has {frac} missing");
        assert!(end >= 350, "segment end {end} should reach the clean half");
    }

    #[test]
    fn test_sufficiency_rejects_when_no_segment_qualifies() {
        // Alternating NaN blocks keep every long window above 30% missing.
        let mut values = Vec::new();
        for i in 0..300 {
            values.push(if i % 2 == 0 { f64::NAN } else { 1.0 });
            values.push(f64::NAN);
        }
        let series = daily_series(values);
        assert!(matches!(
            check_sufficient_data(&series),
            Err(RhythmoError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_empty_series_rejected() {
        let series = daily_series(vec![]);
        assert!(matches!(
            check_sufficient_data(&series),
            Err(RhythmoError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let values: Vec<f64> = (0..100).map(|i| 50.0 + (i as f64) * 0.3).collect();
        let z = standardize(&values);
        let mean = z.iter().sum::<f64>() / z.len() as f64;
        let var = z.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (z.len() as f64 - 1.0);
        assert!(mean.abs() < 1e-10);
        assert!((var - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_standardize_idempotent() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.17).sin() * 3.0 + 60.0).collect();
        let once = standardize(&values);
        let twice = standardize(&once);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_interpolate_replaces_nan_with_mean() {
        let mut values = vec![1.0, f64::NAN, 3.0];
        interpolate(&mut values);
        assert!((values[1] - 2.0).abs() < 1e-12);
    }
}
