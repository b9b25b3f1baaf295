//! Spectral decomposer stage.
//!
//! Runs the CWT over the candidate period grid and reduces it to a global
//! power spectrum with per-period significance thresholds and peak flags.
//! The raw transform, scales and kernel are retained because the
//! minimum-error selector inverts single scales later.

use num_complex::Complex;
use tracing::debug;

use crate::config::Parameters;
use crate::error::RhythmoError;
use crate::series::TimeSeries;
use crate::wavelet::{ar1_alpha, cwt, global_significance, WaveletKernel};

/// Output of spectral decomposition: parallel arrays over the candidate
/// periods plus the retained wavelet artifacts.
#[derive(Debug, Clone)]
pub struct WaveletSpectrum {
    /// Candidate periods in days, ascending.
    pub periods: Vec<f64>,
    /// Variance-scaled global wavelet power per period.
    pub power: Vec<f64>,
    /// 95% significance threshold per period.
    pub significance: Vec<f64>,
    /// True at local maxima of the power curve.
    pub peak_flags: Vec<bool>,
    /// Wavelet scale per period.
    pub scales: Vec<f64>,
    /// Complex transform, `transform[period][time]`.
    pub transform: Vec<Vec<Complex<f64>>>,
    /// Kernel the transform was computed with.
    pub kernel: WaveletKernel,
    /// Time step in days used for the transform.
    pub dt_days: f64,
    /// Population variance of the analyzed signal.
    pub variance: f64,
}

impl WaveletSpectrum {
    /// Indices of the flagged peaks, in period order.
    pub fn peak_indices(&self) -> Vec<usize> {
        self.peak_flags
            .iter()
            .enumerate()
            .filter_map(|(i, &flag)| flag.then_some(i))
            .collect()
    }
}

/// Candidate frequency grid (cycles per day) for the CWT.
///
/// Periods run from `min_cycle_period` up to `duration / min_cycles`
/// (clipped by `max_cycle_period` if configured) in `cycle_step_size` steps,
/// end-exclusive.
pub fn candidate_frequencies(
    duration_days: f64,
    params: &Parameters,
) -> Result<Vec<f64>, RhythmoError> {
    let mut max_period = (duration_days / params.min_cycles.max(1) as f64).floor();
    if let Some(cap) = params.max_cycle_period {
        max_period = max_period.min(cap);
    }

    let mut periods = Vec::new();
    let mut p = params.min_cycle_period;
    while p < max_period {
        periods.push(p);
        p += params.cycle_step_size;
    }
    if periods.is_empty() {
        return Err(RhythmoError::InsufficientSpectrum(format!(
            "no candidate periods between {} and {} days",
            params.min_cycle_period, max_period
        )));
    }
    Ok(periods.iter().map(|p| 1.0 / p).collect())
}

/// Flags strict local maxima: a sample is a peak when it exceeds both
/// neighbours. Endpoints are never peaks.
pub fn flag_peaks(values: &[f64]) -> Vec<bool> {
    let n = values.len();
    let mut flags = vec![false; n];
    for i in 1..n.saturating_sub(1) {
        if values[i] > values[i - 1] && values[i] > values[i + 1] {
            flags[i] = true;
        }
    }
    flags
}

/// Runs the spectral decomposition over the standardized series.
pub fn decompose(
    standardized: &TimeSeries,
    params: &Parameters,
) -> Result<WaveletSpectrum, RhythmoError> {
    let kernel = WaveletKernel::from_name(&params.wavelet_waveform);
    let samples_per_day = params.samples_per_day()?;
    let dt_days = 1.0 / samples_per_day;

    let freqs = candidate_frequencies(standardized.duration_days(), params)?;

    let values = &standardized.values;
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

    let alpha = ar1_alpha(values);
    debug!(alpha, n_periods = freqs.len(), "running wavelet decomposition");

    let out = cwt(values, dt_days, &freqs, &kernel);

    let global_power: Vec<f64> = out
        .transform
        .iter()
        .map(|row| row.iter().map(|c| c.norm_sqr()).sum::<f64>() / n)
        .collect();
    let power: Vec<f64> = global_power.iter().map(|&p| p * variance).collect();

    let dof: Vec<f64> = out.scales.iter().map(|&s| n - s).collect();
    let significance =
        global_significance(variance, dt_days, &out.scales, alpha, &dof, &kernel, 0.95);

    let peak_flags = flag_peaks(&power);
    let periods: Vec<f64> = freqs.iter().map(|f| 1.0 / f).collect();

    Ok(WaveletSpectrum {
        periods,
        power,
        significance,
        peak_flags,
        scales: out.scales,
        transform: out.transform,
        kernel,
        dt_days,
        variance,
    })
}
