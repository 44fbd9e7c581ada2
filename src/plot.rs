//! The plot job record and its state machine.  A `Plot` is created
//! when a request is accepted and carries everything the worker needs:
//! the tagged parameters, the timestamps that *are* the state, and,
//! once complete, the raw image bytes.  State is derived from the
//! timestamps rather than stored, so it cannot be set inconsistently,
//! and transitions only ever move forward.

use std::time::{Instant, SystemTime};

use crate::buddhabrot;
use crate::buffer::PixelBuffer;
use crate::error::PlotError;
use crate::mandelbrot;
use crate::params::PlotParameters;

/// The lifecycle of a plot job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlotState {
    /// Queued; no worker owns it.
    Pending,
    /// Claimed by exactly one worker.
    Started,
    /// The image is available.
    Complete,
    /// Abandoned; no image will ever be attached.
    Failed,
}

/// A queued, running, or finished plot.
#[derive(Clone, Debug)]
pub struct Plot {
    /// Identity of the job.
    pub id: u64,
    /// The tagged parameter payload, decided at job creation.
    pub parameters: PlotParameters,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// When the record was created.
    pub created_at: SystemTime,
    /// When a worker claimed the plot.
    pub started_at: Option<SystemTime>,
    /// When the plot finished.
    pub completed_at: Option<SystemTime>,
    /// When the plot was abandoned.
    pub failed_at: Option<SystemTime>,
    /// Raw 24-bit RGB image data, present once the plot is complete.
    pub image_data: Option<Vec<u8>>,
}

impl Plot {
    /// A freshly accepted, still-pending plot.
    pub fn new(id: u64, parameters: PlotParameters) -> Self {
        Plot {
            id,
            width: parameters.width(),
            height: parameters.height(),
            parameters,
            created_at: SystemTime::now(),
            started_at: None,
            completed_at: None,
            failed_at: None,
            image_data: None,
        }
    }

    /// The state, read off the timestamps.
    pub fn state(&self) -> PlotState {
        if self.failed_at.is_some() {
            PlotState::Failed
        } else if self.completed_at.is_some() {
            PlotState::Complete
        } else if self.started_at.is_some() {
            PlotState::Started
        } else {
            PlotState::Pending
        }
    }

    /// Marks the plot claimed by a worker.  Must only happen once.
    pub fn start(&mut self) {
        debug_assert_eq!(self.state(), PlotState::Pending);
        self.started_at = Some(SystemTime::now());
    }

    /// Attaches the finished image and marks the plot complete.
    pub fn complete(&mut self, image_data: Vec<u8>) {
        debug_assert_eq!(self.state(), PlotState::Started);
        self.image_data = Some(image_data);
        self.completed_at = Some(SystemTime::now());
    }

    /// Marks the plot abandoned.  Any partial image is discarded.
    pub fn fail(&mut self) {
        debug_assert_eq!(self.state(), PlotState::Started);
        self.image_data = None;
        self.failed_at = Some(SystemTime::now());
    }
}

/// Renders the image for a set of parameters, dispatching on the
/// variant.  The deadline bounds the whole plot; on expiry the partial
/// buffer is discarded and `Timeout` comes back instead.
pub fn render(
    parameters: &PlotParameters,
    threads: usize,
    deadline: Instant,
) -> Result<PixelBuffer, PlotError> {
    parameters.validate()?;
    match parameters {
        PlotParameters::Mandelbrot(p) => mandelbrot::plot(p, threads, deadline),
        PlotParameters::Buddhabrot(p) => buddhabrot::plot(p, threads, deadline),
    }
}
