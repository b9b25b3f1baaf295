//! Error taxonomy for the pipeline.
//!
//! Every failure is deterministic for a given input and configuration; there
//! are no retries anywhere in the core. Per-input failures are caught at the
//! batch boundary and the remaining inputs continue.

use thiserror::Error;

/// Errors produced by the cycle-detection and forecasting pipeline.
#[derive(Debug, Error)]
pub enum RhythmoError {
    /// The raw or resampled series fails the sufficiency test: empty input,
    /// or no contiguous segment spanning more than 90 days with at most 30%
    /// missing values.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The resampling rate is not one of the recognized values.
    #[error("sampling rate {0:?} unknown, select one of: 1H, 1D, 1Min, 5Min")]
    UnsupportedRate(String),

    /// The cycle selection method is not one of the recognized values.
    #[error(
        "cycle selection method {0:?} is not valid, select one of: \
         prominence, prominence_width, relative_power, power, minimum_error"
    )]
    UnsupportedMethod(String),

    /// The projection method is not one of the recognized values.
    #[error("projection method {0:?} is not valid, select one of: linear, prophet")]
    UnsupportedProjection(String),

    /// The future-phase timing policy is not one of the recognized values.
    #[error(
        "timing of future phases {0:?} is not valid, select one of: \
         regular_sampling, peak_trough, peak_trough_rising_falling"
    )]
    UnsupportedSchedule(String),

    /// A user-forced cycle period lies outside the configured search bounds.
    #[error("cycle period {period} days outside expected bounds [{min}, {max}]")]
    PeriodOutOfRange { period: f64, min: f64, max: f64 },

    /// More landmarks requested than the peak/trough policy can place.
    #[error("number of future phases {requested} exceeds the peak_trough limit of {max}")]
    TooManyLandmarks { requested: usize, max: usize },

    /// The requested landmark count violates the policy-specific bounds.
    #[error("number of future phases {requested} outside [{min}, {max}] for {policy}")]
    InvalidCount {
        policy: &'static str,
        requested: usize,
        min: usize,
        max: usize,
    },

    /// The projection model could not be fit to the cumulative phase.
    #[error("projection model fit failed: {0}")]
    ProjectionFit(String),

    /// Band-pass filter parameters are numerically invalid, e.g. a corner
    /// frequency at or above Nyquist, or a design with unstable sections.
    #[error("filter design failed: {0}")]
    FilterDesign(String),

    /// The candidate period grid is empty or degenerate.
    #[error("candidate period grid is empty: {0}")]
    InsufficientSpectrum(String),

    /// No spectral peaks were flagged, so nothing can be selected.
    #[error("no spectral peaks found in the global wavelet power spectrum")]
    NoPeaks,

    /// A stage was asked for an output an earlier stage never produced.
    /// Indicates a stop-stage misconfiguration rather than a data problem.
    #[error("missing upstream output: {0}")]
    MissingStage(&'static str),
}
