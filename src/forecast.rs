//! Phase extraction and forward projection.
//!
//! The historic cycle's instantaneous phase comes from the Hilbert analytic
//! signal. Wrapped phase is converted to a cumulative measure by counting
//! completed revolutions, a projection model extrapolates the cumulative
//! phase over future timestamps, and the projection is re-wrapped and turned
//! back into an amplitude-scaled cycle trace.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use rustfft::FftPlanner;
use tracing::debug;

use crate::config::Parameters;
use crate::error::RhythmoError;
use crate::series::{ms_to_datetime, percentile, Cycle, MILLISECONDS_IN_A_DAY};

/// Number of Fourier harmonics in the additive-regression projection model.
const SEASONALITY_HARMONICS: usize = 3;

/// Analytic signal via the frequency-domain Hilbert transform.
///
/// Doubles positive frequencies, zeroes negative ones, and inverts; the
/// result's angle is the instantaneous phase and its magnitude the envelope.
pub fn hilbert_transform(signal: &[f64]) -> Vec<Complex<f64>> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    forward.process(&mut buffer);

    // even n: H[0] = 1, H[1..n/2] = 2, H[n/2] = 1, rest 0
    // odd n:  H[0] = 1, H[1..=(n-1)/2] = 2, rest 0
    let half = n / 2;
    let doubled_end = if n % 2 == 0 { half } else { half + 1 };
    for c in buffer.iter_mut().take(doubled_end).skip(1) {
        *c *= 2.0;
    }
    for c in buffer.iter_mut().skip(half + 1) {
        *c = Complex::new(0.0, 0.0);
    }

    inverse.process(&mut buffer);
    for c in buffer.iter_mut() {
        *c /= n as f64;
    }
    buffer
}

/// Instantaneous phase of the analytic signal, in (-pi, pi].
pub fn instantaneous_phase(analytic: &[Complex<f64>]) -> Vec<f64> {
    analytic.iter().map(|c| c.im.atan2(c.re)).collect()
}

/// Converts wrapped phase to cumulative phase.
///
/// A revolution counter increments each time the phase crosses from positive
/// to non-positive (one full rotation); sample `i` becomes
/// `phase[i] + 2 pi * revolutions_so_far`, which rises monotonically on
/// average and is suitable for regression.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut revolutions = 0usize;
    let mut cumulative = Vec::with_capacity(phase.len());
    for (i, &p) in phase.iter().enumerate() {
        cumulative.push(p + 2.0 * PI * revolutions as f64);
        if p > 0.0 && phase.get(i + 1).map_or(true, |&next| next <= 0.0) {
            revolutions += 1;
        }
    }
    cumulative
}

/// Re-wraps a cumulative phase into (-pi, pi].
pub fn rewrap_phase(phase: f64) -> f64 {
    let wrapped = phase - (phase / (2.0 * PI)).floor() * 2.0 * PI;
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

/// Future timestamps: one historic sample interval after the last historic
/// sample, same spacing, spanning the projection horizon in days.
pub fn projection_times(historic_ms: &[f64], horizon_days: f64) -> Vec<f64> {
    if historic_ms.len() < 2 {
        return Vec::new();
    }
    let last = historic_ms[historic_ms.len() - 1];
    let step = last - historic_ms[historic_ms.len() - 2];
    let start = last + step;
    let end = start + horizon_days * MILLISECONDS_IN_A_DAY;

    let mut times = Vec::new();
    let mut t = start;
    while t < end {
        times.push(t);
        t += step;
    }
    times
}

fn fit_linear(times: &[f64], phases: &[f64], future: &[f64]) -> Vec<f64> {
    let n = times.len() as f64;
    let t_mean = times.iter().sum::<f64>() / n;
    let p_mean = phases.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (&t, &p) in times.iter().zip(phases.iter()) {
        num += (t - t_mean) * (p - p_mean);
        den += (t - t_mean) * (t - t_mean);
    }
    let slope = if den > 0.0 { num / den } else { 0.0 };
    future.iter().map(|&t| p_mean + slope * (t - t_mean)).collect()
}

/// Additive trend-plus-seasonality regression, fit by least squares.
///
/// Stands in for an external forecaster: a linear trend plus Fourier
/// harmonics of the cycle period, solved via SVD on the design matrix.
fn fit_additive(
    times: &[f64],
    phases: &[f64],
    future: &[f64],
    period_days: f64,
) -> Result<Vec<f64>, RhythmoError> {
    let n = times.len();
    let t_mean = times.iter().sum::<f64>() / n as f64;
    let period_ms = period_days * MILLISECONDS_IN_A_DAY;
    let n_cols = 2 + 2 * SEASONALITY_HARMONICS;

    let design_row = |t: f64| -> Vec<f64> {
        let mut row = Vec::with_capacity(n_cols);
        row.push(1.0);
        row.push((t - t_mean) / MILLISECONDS_IN_A_DAY);
        for k in 1..=SEASONALITY_HARMONICS {
            let arg = 2.0 * PI * k as f64 * t / period_ms;
            row.push(arg.cos());
            row.push(arg.sin());
        }
        row
    };

    let design = DMatrix::from_fn(n, n_cols, |i, j| design_row(times[i])[j]);
    let target = DVector::from_column_slice(phases);
    let coeffs = design
        .svd(true, true)
        .solve(&target, 1e-12)
        .map_err(|e| RhythmoError::ProjectionFit(e.to_string()))?;

    Ok(future
        .iter()
        .map(|&t| {
            design_row(t)
                .iter()
                .zip(coeffs.iter())
                .map(|(x, c)| x * c)
                .sum()
        })
        .collect())
}

/// Extracts historic phases and projects the cycle forward.
///
/// Populates `historic.phases` and returns the future [`Cycle`]: timestamps
/// one sample apart past the historic end, values `A cos(phi) + mean`, with
/// `A = P70 - P30` of the historic values.
///
/// # Errors
/// `UnsupportedProjection` for an unknown `projection_method`.
pub fn forecast(
    historic: &mut Cycle,
    cycle_period: f64,
    params: &Parameters,
) -> Result<Cycle, RhythmoError> {
    let analytic = hilbert_transform(&historic.values);
    let phase = instantaneous_phase(&analytic);
    let cumulative = unwrap_phase(&phase);
    historic.phases = Some(phase);

    let time_in_past: Vec<f64> = historic
        .timestamps
        .iter()
        .map(|t| t.timestamp_millis() as f64)
        .collect();

    let max_horizon = 4.0 * cycle_period;
    let horizon_days = params
        .projection_duration
        .map_or(max_horizon, |d| (d as f64).min(max_horizon));
    let time_in_future = projection_times(&time_in_past, horizon_days);
    debug!(
        horizon_days,
        samples = time_in_future.len(),
        "projecting cumulative phase"
    );

    let projected = match params.projection_method.as_str() {
        "linear" => fit_linear(&time_in_past, &cumulative, &time_in_future),
        "prophet" => fit_additive(&time_in_past, &cumulative, &time_in_future, cycle_period)?,
        other => return Err(RhythmoError::UnsupportedProjection(other.to_string())),
    };

    let circular: Vec<f64> = projected.iter().map(|&p| rewrap_phase(p)).collect();

    let amplitude = percentile(&historic.values, 70.0) - percentile(&historic.values, 30.0);
    let mean = historic.values.iter().sum::<f64>() / historic.values.len().max(1) as f64;
    let values: Vec<f64> = circular.iter().map(|&p| amplitude * p.cos() + mean).collect();

    Ok(Cycle {
        timestamps: time_in_future
            .iter()
            .map(|&t| ms_to_datetime(t as i64))
            .collect(),
        values,
        phases: Some(circular),
    })
}
