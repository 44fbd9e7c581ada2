// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The deterministic Mandelbrot plotter.  Every pixel maps to a point
//! on the complex plane and gets the escape-time treatment: black if
//! the point is (probably) in the set, otherwise a grayscale value
//! proportional to how quickly it escapes.  Rows are completely
//! independent, so worker threads pull them from a shared iterator
//! and never touch the same bytes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::info;
use num::Complex;

use crate::buffer::{PixelBuffer, RGB_BYTES_PER_PIXEL};
use crate::error::PlotError;
use crate::escape;
use crate::params::MandelbrotParameters;
use crate::planes::{self, INITIAL_MAX_IM, INITIAL_MAX_RE, INITIAL_MIN_IM, INITIAL_MIN_RE};

/// Plots the Mandelbrot set.  Identical parameters always yield a
/// bit-identical image, whatever the thread count or row ordering.
pub fn plot(
    parameters: &MandelbrotParameters,
    threads: usize,
    deadline: Instant,
) -> Result<PixelBuffer, PlotError> {
    let mut buffer = PixelBuffer::new(parameters.width, parameters.height)?;
    if parameters.max_iterations == 0 {
        return Err(PlotError::Validation(
            "the iteration cap must be non-zero".to_string(),
        ));
    }
    info!(
        "mandelbrot plotter started: {}x{} pixels, {} iterations",
        parameters.width, parameters.height, parameters.max_iterations
    );

    // Scale the vertical range so the image doesn't squash or stretch
    // when the aspect ratio isn't 1:1.
    let aspect_ratio = parameters.height as f64 / parameters.width as f64;
    let min_im = aspect_ratio * INITIAL_MIN_IM;
    let max_im = aspect_ratio * INITIAL_MAX_IM;

    let timed_out = AtomicBool::new(false);
    {
        let height = parameters.height;
        let rows = Arc::new(Mutex::new(buffer.rows_mut().enumerate()));
        let timed_out = &timed_out;
        crossbeam::scope(|spawner| {
            for _ in 0..threads.max(1) {
                let rows = rows.clone();
                spawner.spawn(move |_| loop {
                    if Instant::now() >= deadline {
                        timed_out.store(true, Ordering::Relaxed);
                        break;
                    }
                    let row = { rows.lock().unwrap().next() };
                    match row {
                        Some((y, line)) => {
                            let im =
                                planes::scale(y as f64, 0.0, height as f64, min_im, max_im);
                            render_row(line, im, parameters);
                        }
                        None => break,
                    }
                });
            }
        })
        .map_err(|_| PlotError::Unexpected("a render thread panicked".to_string()))?;
    }

    if timed_out.load(Ordering::Relaxed) {
        return Err(PlotError::Timeout);
    }
    info!("mandelbrot plot complete");
    Ok(buffer)
}

/// Renders one image row at a fixed imaginary coordinate.
fn render_row(line: &mut [u8], im: f64, parameters: &MandelbrotParameters) {
    for x in 0..parameters.width {
        let re = planes::scale(
            x as f64,
            0.0,
            parameters.width as f64,
            INITIAL_MIN_RE,
            INITIAL_MAX_RE,
        );
        match escape::escape_time(Complex::new(re, im), parameters.max_iterations) {
            // Points in the set stay black.
            None => {}
            Some(iterations) => {
                let color = (iterations as f64 / parameters.max_iterations as f64 * 255.0) as u8;
                let index = x * RGB_BYTES_PER_PIXEL;
                line[index] = color;
                line[index + 1] = color;
                line[index + 2] = color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn parameters(width: usize, height: usize) -> MandelbrotParameters {
        MandelbrotParameters {
            width,
            height,
            max_iterations: 64,
        }
    }

    #[test]
    fn identical_parameters_give_identical_images() {
        let p = parameters(48, 32);
        let one = plot(&p, 4, far_deadline()).unwrap();
        let two = plot(&p, 1, far_deadline()).unwrap();
        assert_eq!(one.data(), two.data());
    }

    #[test]
    fn center_pixel_is_black() {
        // The center column of the canonical region maps near
        // re = -0.765, im = 0, well inside the set.
        let p = parameters(64, 64);
        let buffer = plot(&p, 2, far_deadline()).unwrap();
        let offset = 32 * buffer.bytes_per_line() + 32 * RGB_BYTES_PER_PIXEL;
        assert_eq!(&buffer.data()[offset..offset + 3], &[0, 0, 0]);
    }

    #[test]
    fn corner_pixels_are_not_black() {
        // The upper-left corner maps to -2 - 1.12i, far outside.
        let p = parameters(64, 64);
        let buffer = plot(&p, 2, far_deadline()).unwrap();
        assert_ne!(buffer.data()[0], 0);
    }

    #[test]
    fn expired_deadline_times_out() {
        let p = parameters(256, 256);
        let result = plot(&p, 2, Instant::now() - Duration::from_secs(1));
        match result {
            Err(PlotError::Timeout) => {}
            other => panic!("expected a timeout, got {:?}", other.map(|b| b.data().len())),
        }
    }
}
