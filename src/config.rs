//! Pipeline configuration.
//!
//! [`Parameters`] is built once per run from defaults, optionally overlaid
//! with a partial JSON document, and is read-only afterwards. Method and
//! policy fields are kept as strings and parsed at the stage boundary so that
//! an invalid value fails the stage that consumes it, not construction; the
//! wavelet waveform is the one field that falls back instead of failing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RhythmoError;

/// Tunable parameters for a pipeline run.
///
/// Defaults target hourly wearable data with an unknown cycle length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Resampling interval: one of `1H`, `1D`, `1Min`, `5Min`.
    pub data_resampling_rate: String,
    /// Mother wavelet: `morlet`, `gaussian`, or `mexican_hat`.
    /// Unknown names fall back to `morlet`.
    pub wavelet_waveform: String,
    /// Minimum number of cycles the data must span; bounds the longest
    /// candidate period at `duration / min_cycles`.
    pub min_cycles: u32,
    /// Shortest candidate cycle period, in days.
    pub min_cycle_period: f64,
    /// Longest candidate cycle period, in days. `None` leaves the bound at
    /// `duration / min_cycles`.
    pub max_cycle_period: Option<f64>,
    /// Step between candidate periods, in days.
    pub cycle_step_size: f64,
    /// Peak ranking policy: `prominence`, `prominence_width`,
    /// `relative_power`, `power`, or `minimum_error`.
    pub cycle_selection_method: String,
    /// Forced cycle period in days; `None` selects automatically.
    pub cycle_period: Option<f64>,
    /// Band-pass corner offset either side of the selected period, as a
    /// percentage.
    pub bandpass_cutoff_percentage: f64,
    /// Phase projection model: `linear` or `prophet`.
    pub projection_method: String,
    /// Projection horizon in days; capped at four cycle periods, which is
    /// also the default.
    pub projection_duration: Option<u32>,
    /// Landmark policy: `regular_sampling`, `peak_trough`, or
    /// `peak_trough_rising_falling`.
    pub timing_of_future_phases: String,
    /// Number of future landmark times to schedule. Must be at least 1.
    pub number_of_future_phases: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            data_resampling_rate: "1H".to_string(),
            wavelet_waveform: "morlet".to_string(),
            min_cycles: 3,
            min_cycle_period: 2.0,
            max_cycle_period: None,
            cycle_step_size: 0.5,
            cycle_selection_method: "prominence".to_string(),
            cycle_period: None,
            bandpass_cutoff_percentage: 33.0,
            projection_method: "linear".to_string(),
            projection_duration: None,
            timing_of_future_phases: "regular_sampling".to_string(),
            number_of_future_phases: 8,
        }
    }
}

impl Parameters {
    /// Overlays a partial JSON document over the defaults. Fields missing
    /// from the document keep their default value.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads a partial JSON parameter file and overlays it over the defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(std::io::Error::other)
    }

    /// Flags numeric fields outside their expected bounds.
    ///
    /// Logs a warning and returns `false` when any field is out of bounds;
    /// this is advisory only and never aborts a run.
    pub fn sanity_check(&self) -> bool {
        let mut suspect: Vec<&str> = Vec::new();
        if matches!(self.cycle_period, Some(p) if p <= 0.0) {
            suspect.push("cycle_period");
        }
        if self.bandpass_cutoff_percentage <= 0.0 {
            suspect.push("bandpass_cutoff_percentage");
        }
        if matches!(self.projection_duration, Some(0)) {
            suspect.push("projection_duration");
        }
        if self.number_of_future_phases == 0 {
            suspect.push("number_of_future_phases");
        }
        if self.min_cycles == 0 {
            suspect.push("min_cycles");
        }
        if self.cycle_step_size <= 0.0 {
            suspect.push("cycle_step_size");
        }
        if !suspect.is_empty() {
            warn!(
                "{} hyperparameter(s) outside the expected bounds",
                suspect.join(", ")
            );
            return false;
        }
        true
    }

    /// Resolves the resampling rate to samples per day.
    pub fn samples_per_day(&self) -> Result<f64, RhythmoError> {
        match self.data_resampling_rate.as_str() {
            "1H" => Ok(24.0),
            "1D" => Ok(1.0),
            "1Min" => Ok(24.0 * 60.0),
            "5Min" => Ok(24.0 * 12.0),
            other => Err(RhythmoError::UnsupportedRate(other.to_string())),
        }
    }

    /// Resolves the resampling rate to a bin width in milliseconds.
    pub fn bin_width_ms(&self) -> Result<i64, RhythmoError> {
        match self.data_resampling_rate.as_str() {
            "1H" => Ok(3_600_000),
            "1D" => Ok(86_400_000),
            "1Min" => Ok(60_000),
            "5Min" => Ok(300_000),
            other => Err(RhythmoError::UnsupportedRate(other.to_string())),
        }
    }
}
