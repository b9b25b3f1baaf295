//! # rhythmo
//!
//! Cycle detection and phase forecasting for noisy physiological time
//! series.
//!
//! The pipeline takes a raw timestamped series (e.g. resting heart rate from
//! a wearable) and runs, in order:
//! - Preprocessing: resampling onto a calendar grid with a lower-decile
//!   "resting" aggregate, sufficiency checking, gap filling, z-scoring
//! - Spectral decomposition: continuous wavelet transform with AR(1)
//!   red-noise significance testing (Torrence & Compo)
//! - Cycle selection: ranking flagged spectral peaks by prominence, power,
//!   or reconstruction error
//! - Tracking: zero-phase Butterworth band-pass around the selected period
//! - Forecasting: Hilbert phase extraction, cumulative unwrapping, and
//!   forward projection of phase (linear or additive-regression model)
//! - Scheduling: concrete future timestamps at requested cycle landmarks
//!   (peaks, troughs, rising/falling edges, or regular phase samples)
//!
//! [`Pipeline`] wires the stages together; each stage is also exposed as a
//! free function over the shared series types for callers that need only a
//! part.

#![allow(clippy::too_many_arguments)]

pub mod parallel;

pub mod config;
pub mod decomp;
pub mod error;
pub mod filters;
pub mod forecast;
pub mod pipeline;
pub mod process;
pub mod schedule;
pub mod selection;
pub mod series;
pub mod track;
pub mod wavelet;

// Re-export the pipeline surface
pub use config::Parameters;
pub use error::RhythmoError;
pub use pipeline::{Pipeline, RunOutput, StopStage};
pub use series::{Cycle, RawSeries, TimeSeries};

// Re-export stage types
pub use decomp::WaveletSpectrum;
pub use schedule::{FutureSchedule, ScheduleColumn};
pub use wavelet::WaveletKernel;
