//! Stage orchestration and batch running.
//!
//! Stages run strictly in sequence per input and mutate a progressively
//! populated [`RunOutput`]; a run may stop early at a configured stage.
//! Batch runs process inputs independently, skipping inputs that fail.

use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use tracing::{error, info};

use crate::config::Parameters;
use crate::decomp::{decompose, WaveletSpectrum};
use crate::error::RhythmoError;
use crate::forecast::forecast;
use crate::process::process;
use crate::schedule::{schedule, FutureSchedule};
use crate::selection::select;
use crate::series::{Cycle, RawSeries, TimeSeries};
use crate::slice_maybe_parallel;
use crate::track::track;

/// Last stage to execute; later fields of [`RunOutput`] stay `None`.
///
/// Selection runs with tracking: stopping at [`StopStage::Decompose`]
/// yields the spectrum but no selected period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStage {
    Decompose,
    Track,
    Forecast,
    Schedule,
}

impl StopStage {
    fn rank(self) -> u8 {
        match self {
            StopStage::Decompose => 1,
            StopStage::Track => 2,
            StopStage::Forecast => 3,
            StopStage::Schedule => 4,
        }
    }
}

/// Accumulated outputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Identifier of the source input.
    pub id: String,
    /// Resampled series over the accepted segment, gaps interpolated.
    pub resampled: TimeSeries,
    /// Z-scored copy of `resampled`.
    pub standardized: TimeSeries,
    /// Index range of the accepted segment within the full resampled series.
    pub segment: (usize, usize),
    pub spectrum: Option<WaveletSpectrum>,
    /// Selected cycle period in days.
    pub cycle_period: Option<f64>,
    pub historic_cycle: Option<Cycle>,
    pub future_cycle: Option<Cycle>,
    pub schedule: Option<FutureSchedule>,
}

/// The cycle-detection and forecasting pipeline.
///
/// Configuration is fixed at construction and shared read-only across runs,
/// so one pipeline can process a whole batch, in parallel when the
/// `parallel` feature is on.
#[derive(Debug, Clone)]
pub struct Pipeline {
    params: Parameters,
}

impl Pipeline {
    pub fn new(params: Parameters) -> Self {
        params.sanity_check();
        Self { params }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Runs the stages in order for one input, stopping after `stop`.
    pub fn run(&self, raw: &RawSeries, stop: StopStage) -> Result<RunOutput, RhythmoError> {
        let started = Instant::now();
        info!(id = %raw.id, "starting run");

        let pre = process(raw, &self.params)?;
        let mut out = RunOutput {
            id: raw.id.clone(),
            resampled: pre.resampled,
            standardized: pre.standardized,
            segment: pre.segment,
            spectrum: None,
            cycle_period: None,
            historic_cycle: None,
            future_cycle: None,
            schedule: None,
        };

        out.spectrum = Some(decompose(&out.standardized, &self.params)?);
        if stop.rank() <= StopStage::Decompose.rank() {
            info!(id = %out.id, elapsed = ?started.elapsed(), "finished run");
            return Ok(out);
        }

        let spectrum = out
            .spectrum
            .as_ref()
            .ok_or(RhythmoError::MissingStage("spectrum"))?;
        let period = select(spectrum, &out.standardized, &self.params)?;
        out.cycle_period = Some(period);
        out.historic_cycle = Some(track(&out.standardized, period, &self.params)?);
        if stop.rank() <= StopStage::Track.rank() {
            info!(id = %out.id, elapsed = ?started.elapsed(), "finished run");
            return Ok(out);
        }

        let historic = out
            .historic_cycle
            .as_mut()
            .ok_or(RhythmoError::MissingStage("historic cycle"))?;
        out.future_cycle = Some(forecast(historic, period, &self.params)?);
        if stop.rank() <= StopStage::Forecast.rank() {
            info!(id = %out.id, elapsed = ?started.elapsed(), "finished run");
            return Ok(out);
        }

        let future = out
            .future_cycle
            .as_ref()
            .ok_or(RhythmoError::MissingStage("future cycle"))?;
        out.schedule = Some(schedule(future, &self.params)?);

        info!(id = %out.id, elapsed = ?started.elapsed(), "finished run");
        Ok(out)
    }

    /// Runs every input independently, logging and skipping failures.
    ///
    /// A failed input produces no output record and does not abort the
    /// batch.
    pub fn run_batch(&self, inputs: &[RawSeries], stop: StopStage) -> Vec<RunOutput> {
        let started = Instant::now();
        let outputs: Vec<RunOutput> = slice_maybe_parallel!(inputs)
            .filter_map(|raw| match self.run(raw, stop) {
                Ok(out) => Some(out),
                Err(e) => {
                    error!(id = %raw.id, error = %e, "skipping input");
                    None
                }
            })
            .collect();
        info!(
            total = inputs.len(),
            succeeded = outputs.len(),
            elapsed = ?started.elapsed(),
            "batch finished"
        );
        outputs
    }
}
