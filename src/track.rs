//! Cycle tracking: isolate the selected cycle from the standardized series.
//!
//! A narrow band-pass centered on the selected period strips everything but
//! the cycle of interest, producing the historic cycle trace the forecaster
//! extracts phases from. The filter runs forward-backward so the trace stays
//! phase-aligned with the data.

use tracing::debug;

use crate::config::Parameters;
use crate::error::RhythmoError;
use crate::filters::BandpassFilter;
use crate::series::{Cycle, TimeSeries};

/// Corner frequencies in cycles per day for a band centered on `period`
/// days, offset by `cutoff_percentage` either side.
pub fn band_corners(period: f64, cutoff_percentage: f64) -> (f64, f64) {
    let c = cutoff_percentage / 100.0;
    let low = 1.0 / ((1.0 + c) * period);
    let high = 1.0 / ((1.0 - c) * period);
    (low, high)
}

/// Band-passes the standardized series around the selected cycle period.
///
/// # Arguments
/// * `standardized` - z-scored series from the preprocessor
/// * `cycle_period` - selected period in days
/// * `params` - pipeline parameters (cutoff percentage, sampling rate)
///
/// # Returns
/// The historic [`Cycle`] on the same timestamps, phases unset.
pub fn track(
    standardized: &TimeSeries,
    cycle_period: f64,
    params: &Parameters,
) -> Result<Cycle, RhythmoError> {
    let fs = params.samples_per_day()?;
    let (low, high) = band_corners(cycle_period, params.bandpass_cutoff_percentage);
    debug!(
        period = cycle_period,
        low_cpd = low,
        high_cpd = high,
        "band-passing around the selected cycle"
    );

    let mut filter = BandpassFilter::butterworth(2, low, high, fs)?;
    let values = filter.filtfilt(&standardized.values);

    Ok(Cycle {
        timestamps: standardized.timestamps.clone(),
        values,
        phases: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ms_to_datetime;
    use std::f64::consts::PI;

    fn daily_series(values: Vec<f64>) -> TimeSeries {
        let day = 86_400_000i64;
        let timestamps = (0..values.len() as i64)
            .map(|i| ms_to_datetime(i * day))
            .collect();
        TimeSeries { timestamps, values }
    }

    #[test]
    fn test_band_corners_straddle_the_period() {
        let (low, high) = band_corners(30.0, 33.0);
        let center = 1.0 / 30.0;
        assert!(low < center && center < high);
        assert!((low - 1.0 / (1.33 * 30.0)).abs() < 1e-12);
        assert!((high - 1.0 / (0.67 * 30.0)).abs() < 1e-12);
    }

    #[test]
    fn test_track_keeps_timestamps_and_length() {
        let n = 400;
        let values: Vec<f64> = (0..n).map(|i| (2.0 * PI * i as f64 / 30.0).sin()).collect();
        let series = daily_series(values);
        let params = Parameters {
            data_resampling_rate: "1D".to_string(),
            ..Parameters::default()
        };

        let cycle = track(&series, 30.0, &params).unwrap();
        assert_eq!(cycle.len(), n);
        assert_eq!(cycle.timestamps, series.timestamps);
        assert!(cycle.phases.is_none());
    }

    #[test]
    fn test_track_suppresses_out_of_band_interference() {
        let n = 600;
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                (2.0 * PI * t / 30.0).sin() + 1.5 * (2.0 * PI * t / 3.0).sin()
            })
            .collect();
        let series = daily_series(values);
        let params = Parameters {
            data_resampling_rate: "1D".to_string(),
            ..Parameters::default()
        };

        let cycle = track(&series, 30.0, &params).unwrap();
        // interior of the trace should correlate strongly with the
        // 30-day component alone
        let clean: Vec<f64> = (0..n).map(|i| (2.0 * PI * i as f64 / 30.0).sin()).collect();
        let lo = 60;
        let hi = n - 60;
        let dot: f64 = cycle.values[lo..hi]
            .iter()
            .zip(&clean[lo..hi])
            .map(|(a, b)| a * b)
            .sum();
        let na: f64 = cycle.values[lo..hi].iter().map(|a| a * a).sum::<f64>().sqrt();
        let nb: f64 = clean[lo..hi].iter().map(|b| b * b).sum::<f64>().sqrt();
        let corr = dot / (na * nb);
        assert!(corr > 0.95, "correlation with clean cycle was {corr}");
    }

    #[test]
    fn test_track_rejects_band_beyond_nyquist() {
        // Daily sampling, 1.5-day period: the upper corner exceeds Nyquist.
        let series = daily_series((0..100).map(|i| i as f64).collect());
        let params = Parameters {
            data_resampling_rate: "1D".to_string(),
            ..Parameters::default()
        };
        assert!(matches!(
            track(&series, 1.5, &params),
            Err(RhythmoError::FilterDesign(_))
        ));
    }
}
