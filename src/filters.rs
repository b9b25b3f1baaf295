//! Butterworth band-pass filtering as a cascade of biquad sections.
//!
//! The band-pass is built by cascading a lowpass at the upper corner with a
//! highpass at the lower corner, each designed from the analog Butterworth
//! prototype via the bilinear transform. Zero-phase response comes from
//! running the cascade forward and then backward over the data, which is a
//! prerequisite for the phase extraction downstream.

use num_complex::Complex;
use std::f64::consts::PI;

use crate::error::RhythmoError;

/// A single second-order section in Direct Form II Transposed.
///
/// Transfer function: H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
#[derive(Debug, Clone)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
    state: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a, state: [0.0; 2] }
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    /// Poles inside the unit circle: |a2| < 1 and |a1| < 1 + a2.
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }
}

/// Cascaded-biquad band-pass filter.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    sections: Vec<Biquad>,
}

#[derive(Clone, Copy)]
enum Response {
    Lowpass,
    Highpass,
}

impl BandpassFilter {
    /// Designs a Butterworth band-pass of the given order per edge.
    ///
    /// `low` and `high` are corner frequencies in cycles per unit time, `fs`
    /// the sampling rate in samples per unit time. Fails when the corners are
    /// not inside (0, Nyquist) or a designed section is unstable.
    pub fn butterworth(
        order: usize,
        low: f64,
        high: f64,
        fs: f64,
    ) -> Result<Self, RhythmoError> {
        let nyquist = 0.5 * fs;
        if !(low > 0.0 && low < high && high < nyquist) {
            return Err(RhythmoError::FilterDesign(format!(
                "corner frequencies ({low}, {high}) must satisfy 0 < low < high < Nyquist ({nyquist})"
            )));
        }
        if order == 0 {
            return Err(RhythmoError::FilterDesign("filter order must be positive".into()));
        }

        let mut sections = design_butterworth(order, high, fs, Response::Lowpass);
        sections.extend(design_butterworth(order, low, fs, Response::Highpass));

        if let Some(bad) = sections.iter().position(|s| !s.is_stable()) {
            return Err(RhythmoError::FilterDesign(format!(
                "section {bad} has poles outside the unit circle"
            )));
        }
        Ok(Self { sections })
    }

    fn run(&mut self, data: &[f64]) -> Vec<f64> {
        for s in self.sections.iter_mut() {
            s.reset();
        }
        data.iter()
            .map(|&x| {
                let mut y = x;
                for s in self.sections.iter_mut() {
                    y = s.process(y);
                }
                y
            })
            .collect()
    }

    /// Forward-backward (zero-phase) filtering.
    ///
    /// The cascade is applied to the data, then to the time-reversed result,
    /// cancelling the filter's phase response.
    pub fn filtfilt(&mut self, data: &[f64]) -> Vec<f64> {
        let forward = self.run(data);
        let reversed: Vec<f64> = forward.into_iter().rev().collect();
        let backward = self.run(&reversed);
        backward.into_iter().rev().collect()
    }
}

/// Butterworth analog prototype poles on the left half of the s-plane unit
/// circle.
fn butterworth_poles(order: usize) -> Vec<Complex<f64>> {
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Complex::new(theta.cos(), theta.sin())
        })
        .collect()
}

/// Pre-warps a corner frequency for the bilinear transform.
fn prewarp(freq: f64, fs: f64) -> f64 {
    2.0 * fs * (PI * freq / fs).tan()
}

fn design_butterworth(order: usize, corner: f64, fs: f64, response: Response) -> Vec<Biquad> {
    let wc = prewarp(corner, fs);
    let k = 2.0 * fs;
    let poles = butterworth_poles(order);

    let mut sections = Vec::new();
    let mut i = 0;
    while i < poles.len() {
        if poles[i].im.abs() < 1e-10 {
            sections.push(bilinear_one_pole(poles[i].re * wc, k, response));
            i += 1;
        } else {
            sections.push(bilinear_pole_pair(poles[i] * wc, k, response));
            i += 2; // conjugate handled implicitly
        }
    }
    sections
}

fn bilinear_one_pole(p: f64, k: f64, response: Response) -> Biquad {
    let alpha = k - p;
    let beta = k + p;
    match response {
        Response::Lowpass => Biquad::new([-p / alpha, -p / alpha, 0.0], [-beta / alpha, 0.0]),
        Response::Highpass => Biquad::new([k / alpha, -k / alpha, 0.0], [-beta / alpha, 0.0]),
    }
}

fn bilinear_pole_pair(p: Complex<f64>, k: f64, response: Response) -> Biquad {
    let mag_sq = p.norm_sqr();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + mag_sq;
    let a = [2.0 * (mag_sq - k2) / d, (k2 + 2.0 * k * p.re + mag_sq) / d];
    match response {
        Response::Lowpass => Biquad::new([mag_sq / d, 2.0 * mag_sq / d, mag_sq / d], a),
        Response::Highpass => Biquad::new([k2 / d, -2.0 * k2 / d, k2 / d], a),
    }
}
