//! Cycle selector: picks the single operative cycle period.
//!
//! A user-forced period wins outright (after a bounds check); otherwise the
//! flagged spectral peaks are ranked by the configured method. Tie-breaks are
//! stable: the first occurrence wins.

use tracing::{debug, info};

use crate::config::Parameters;
use crate::decomp::WaveletSpectrum;
use crate::error::RhythmoError;
use crate::series::TimeSeries;
use crate::wavelet::icwt_single_scale;

/// Scale spacing used when inverting a single scale for the minimum-error
/// ranking.
const RECONSTRUCTION_DJ: f64 = 1.0 / 12.0;

/// Topographic prominence of the peak at `peak_idx`: height above the higher
/// of the two minima separating it from equal-or-higher terrain.
pub fn peak_prominence(signal: &[f64], peak_idx: usize) -> f64 {
    let peak_val = signal[peak_idx];

    let mut left_min = peak_val;
    for i in (0..peak_idx).rev() {
        if signal[i] >= peak_val {
            break;
        }
        left_min = left_min.min(signal[i]);
    }

    let mut right_min = peak_val;
    for v in &signal[peak_idx + 1..] {
        if *v >= peak_val {
            break;
        }
        right_min = right_min.min(*v);
    }

    peak_val - left_min.max(right_min)
}

/// Peak width at half prominence, in index units, with linear interpolation
/// at the crossings.
pub fn peak_width(signal: &[f64], peak_idx: usize, prominence: f64) -> f64 {
    let height = signal[peak_idx] - 0.5 * prominence;

    // walk left to the crossing
    let mut left = peak_idx as f64;
    for i in (0..peak_idx).rev() {
        if signal[i] < height {
            let frac = (signal[i + 1] - height) / (signal[i + 1] - signal[i]);
            left = (i + 1) as f64 - frac;
            break;
        }
        left = i as f64;
    }

    // walk right to the crossing
    let mut right = peak_idx as f64;
    for i in peak_idx + 1..signal.len() {
        if signal[i] < height {
            let frac = (signal[i - 1] - height) / (signal[i - 1] - signal[i]);
            right = (i - 1) as f64 + frac;
            break;
        }
        right = i as f64;
    }

    right - left
}

/// Stable argmax over finite values: first occurrence wins.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        if best.map_or(true, |(_, bv)| v > bv) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Stable argmin: first occurrence wins.
fn argmin(values: &[f64]) -> Option<usize> {
    argmax(&values.iter().map(|v| -v).collect::<Vec<f64>>())
}

/// Mean squared error between the single-scale reconstruction of a candidate
/// peak and the standardized signal.
fn reconstruction_error(spectrum: &WaveletSpectrum, peak_idx: usize, signal: &[f64]) -> f64 {
    let rec = icwt_single_scale(
        &spectrum.transform[peak_idx],
        spectrum.scales[peak_idx],
        spectrum.dt_days,
        RECONSTRUCTION_DJ,
        &spectrum.kernel,
    );
    signal
        .iter()
        .zip(rec.iter())
        .map(|(s, r)| (s - r) * (s - r))
        .sum::<f64>()
        / signal.len() as f64
}

/// Ranks the flagged peaks by the configured method and returns the winning
/// period, in days.
pub fn strongest_peak(
    method: &str,
    spectrum: &WaveletSpectrum,
    standardized: &TimeSeries,
) -> Result<f64, RhythmoError> {
    let peak_inds = spectrum.peak_indices();
    if peak_inds.is_empty() {
        return Err(RhythmoError::NoPeaks);
    }

    let winner_pos = match method {
        "prominence" => {
            let scores: Vec<f64> = peak_inds
                .iter()
                .map(|&i| peak_prominence(&spectrum.power, i))
                .collect();
            argmax(&scores)
        }
        "prominence_width" => {
            let scores: Vec<f64> = peak_inds
                .iter()
                .map(|&i| {
                    let prom = peak_prominence(&spectrum.power, i);
                    let width = peak_width(&spectrum.power, i, prom);
                    if width > 0.0 {
                        prom / width
                    } else {
                        f64::NAN
                    }
                })
                .collect();
            argmax(&scores)
        }
        "relative_power" => {
            let scores: Vec<f64> = peak_inds
                .iter()
                .map(|&i| spectrum.power[i] - spectrum.significance[i])
                .collect();
            argmax(&scores)
        }
        "power" => {
            let scores: Vec<f64> = peak_inds.iter().map(|&i| spectrum.power[i]).collect();
            argmax(&scores)
        }
        "minimum_error" => {
            let scores: Vec<f64> = peak_inds
                .iter()
                .map(|&i| reconstruction_error(spectrum, i, &standardized.values))
                .collect();
            argmin(&scores)
        }
        other => return Err(RhythmoError::UnsupportedMethod(other.to_string())),
    };

    let pos = winner_pos.ok_or(RhythmoError::NoPeaks)?;
    let index = peak_inds[pos];
    debug!(method, period = spectrum.periods[index], "ranked spectral peaks");
    Ok(spectrum.periods[index])
}

/// Determines the operative cycle period.
///
/// A configured `cycle_period` is accepted only inside
/// `[min_cycle_period, max_cycle_period]`; without an upper bound only the
/// lower bound applies. Otherwise ranking falls to [`strongest_peak`].
pub fn select(
    spectrum: &WaveletSpectrum,
    standardized: &TimeSeries,
    params: &Parameters,
) -> Result<f64, RhythmoError> {
    if let Some(forced) = params.cycle_period {
        let max = params.max_cycle_period.unwrap_or(f64::INFINITY);
        if forced >= params.min_cycle_period && forced <= max {
            info!(period = forced, "using configured cycle period");
            return Ok(forced);
        }
        return Err(RhythmoError::PeriodOutOfRange {
            period: forced,
            min: params.min_cycle_period,
            max,
        });
    }

    let period = strongest_peak(&params.cycle_selection_method, spectrum, standardized)?;
    info!(period, method = %params.cycle_selection_method, "selected cycle period");
    Ok(period)
}
