//! The mapping between the integral pixel plane and the complex
//! cartesian plane.  Everything here is a linear scale: pixel rows and
//! columns map to imaginary and real coordinates, and orbit points map
//! back to pixel offsets.  The `ComplexRegion` describes the rectangle
//! of the complex plane a plot actually covers, and knows how to
//! stretch its imaginary span so the output image is not squashed when
//! the pixel aspect ratio is not 1:1.

use num::Complex;

use crate::error::PlotError;

/// Left edge of the canonical Mandelbrot region, more or less nicely
/// centered.
pub const INITIAL_MIN_RE: f64 = -2.0;
/// Right edge of the canonical Mandelbrot region.
pub const INITIAL_MAX_RE: f64 = 0.47;
/// Bottom edge of the canonical Mandelbrot region.
pub const INITIAL_MIN_IM: f64 = -1.12;
/// Top edge of the canonical Mandelbrot region.
pub const INITIAL_MAX_IM: f64 = 1.12;

/// Linearly scales a value from one range to another.  A zero-width
/// source range is a caller bug; we fail fast here rather than let a
/// NaN propagate into a buffer index.
pub fn scale(value: f64, from_min: f64, from_max: f64, to_min: f64, to_max: f64) -> f64 {
    assert!(
        from_min != from_max,
        "cannot scale from a zero-width range"
    );
    (value - from_min) / (from_max - from_min) * (to_max - to_min) + to_min
}

/// A rectangle on the complex plane, defined by its minimum and
/// maximum real and imaginary values.  Built once by the plotter that
/// owns it and immutable from then on.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexRegion {
    /// Minimum real value.
    pub min_re: f64,
    /// Maximum real value.
    pub max_re: f64,
    /// Minimum imaginary value.
    pub min_im: f64,
    /// Maximum imaginary value.
    pub max_im: f64,
}

impl ComplexRegion {
    /// Constructor.  Refuses inside-out rectangles.
    pub fn new(min_re: f64, max_re: f64, min_im: f64, max_im: f64) -> Result<Self, PlotError> {
        if max_re < min_re {
            return Err(PlotError::Validation(
                "the minimum real value is not to the left of the maximum".to_string(),
            ));
        }
        if max_im < min_im {
            return Err(PlotError::Validation(
                "the minimum imaginary value is not below the maximum".to_string(),
            ));
        }
        Ok(ComplexRegion {
            min_re,
            max_re,
            min_im,
            max_im,
        })
    }

    /// The canonical Mandelbrot region.
    pub fn initial() -> Self {
        ComplexRegion {
            min_re: INITIAL_MIN_RE,
            max_re: INITIAL_MAX_RE,
            min_im: INITIAL_MIN_IM,
            max_im: INITIAL_MAX_IM,
        }
    }

    /// Is the point inside the region?  Inclusive on every edge.
    pub fn contains(&self, z: Complex<f64>) -> bool {
        z.re >= self.min_re && z.re <= self.max_re && z.im >= self.min_im && z.im <= self.max_im
    }

    /// Adjusts the imaginary span so the region's aspect ratio matches
    /// a `width` x `height` image, expanding or contracting
    /// symmetrically around the span's center.  The real span is left
    /// alone.
    pub fn match_aspect_ratio(mut self, width: usize, height: usize) -> Self {
        let complex_width = self.max_re - self.min_re;
        let aspect_ratio = height as f64 / width as f64;
        let new_complex_height = complex_width * aspect_ratio;
        let half_delta = (new_complex_height - (self.max_im - self.min_im)) / 2.0;
        self.min_im -= half_delta;
        self.max_im += half_delta;
        self
    }
}
