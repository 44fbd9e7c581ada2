//! Plot parameters.  The two renderers take different knobs, so the
//! parameters are a closed tagged variant decided once when a job is
//! created; the variant also selects the plotter later.  The types
//! serialize with a `type` tag so a durable store can keep them as a
//! single JSON column.

use serde::{Deserialize, Serialize};

use crate::error::PlotError;

/// Parameters for a deterministic per-pixel Mandelbrot plot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MandelbrotParameters {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Iteration cap for the escape-time evaluation of each pixel.
    pub max_iterations: usize,
}

/// The size of the random sample set: either an absolute number of
/// candidate points, or a fraction of the total pixel count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleSize {
    /// An absolute number of candidate points.
    Count(u64),
    /// A fraction of the image's total pixel count.
    Fraction(f64),
}

impl SampleSize {
    /// The absolute candidate count for a given image size.
    pub fn resolve(&self, pixels: usize) -> usize {
        match *self {
            SampleSize::Count(n) => n as usize,
            SampleSize::Fraction(f) => (f * pixels as f64) as usize,
        }
    }
}

/// Parameters for a stochastic Buddhabrot plot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuddhabrotParameters {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Iteration cap for orbit replay.
    pub max_iterations: usize,
    /// Iteration cap for the cheap membership rejection of candidate
    /// samples.  Deliberately much smaller than `max_iterations`.
    pub max_sample_iterations: usize,
    /// How many random candidate points each sampling run draws.
    pub sample_size: SampleSize,
    /// How many times the sample-and-accumulate cycle repeats.  More
    /// passes mean more total samples without one huge in-memory
    /// sample set.
    pub passes: usize,
    /// Accumulate directly into clamped grayscale bytes instead of
    /// per-channel normalized counters.
    pub grayscale: bool,
}

/// The closed set of plot requests the engine accepts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlotParameters {
    /// A deterministic per-pixel Mandelbrot plot.
    Mandelbrot(MandelbrotParameters),
    /// A stochastic Buddhabrot plot.
    Buddhabrot(BuddhabrotParameters),
}

impl PlotParameters {
    /// Image width in pixels, whatever the variant.
    pub fn width(&self) -> usize {
        match self {
            PlotParameters::Mandelbrot(p) => p.width,
            PlotParameters::Buddhabrot(p) => p.width,
        }
    }

    /// Image height in pixels, whatever the variant.
    pub fn height(&self) -> usize {
        match self {
            PlotParameters::Mandelbrot(p) => p.height,
            PlotParameters::Buddhabrot(p) => p.height,
        }
    }

    /// Rejects degenerate parameters before any work begins.  A zero
    /// sample size is deliberately *not* rejected; it just produces an
    /// all-black image.
    pub fn validate(&self) -> Result<(), PlotError> {
        let (width, height, max_iterations) = match self {
            PlotParameters::Mandelbrot(p) => (p.width, p.height, p.max_iterations),
            PlotParameters::Buddhabrot(p) => (p.width, p.height, p.max_iterations),
        };
        if width == 0 || height == 0 {
            return Err(PlotError::Validation(
                "image dimensions must be non-zero".to_string(),
            ));
        }
        if max_iterations == 0 {
            return Err(PlotError::Validation(
                "the iteration cap must be non-zero".to_string(),
            ));
        }
        if let PlotParameters::Buddhabrot(p) = self {
            if p.max_sample_iterations == 0 {
                return Err(PlotError::Validation(
                    "the sample iteration cap must be non-zero".to_string(),
                ));
            }
            if p.passes == 0 {
                return Err(PlotError::Validation(
                    "a plot needs at least one pass".to_string(),
                ));
            }
            if let SampleSize::Fraction(f) = p.sample_size {
                if !f.is_finite() || f < 0.0 {
                    return Err(PlotError::Validation(
                        "the sample fraction must be finite and non-negative".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
