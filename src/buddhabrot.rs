// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The stochastic Buddhabrot plotter.  Where the Mandelbrot renders
//! the points that stay inside the set, the Buddhabrot renders the
//! orbits of points that leave it: draw random points on the complex
//! plane, throw away the ones that are probably in the set, then
//! replay each survivor's orbit and increment every pixel it passes
//! through.  The density of those hits is the image.
//!
//! The plot runs one sampling-and-accumulation cycle per RGB channel
//! per pass.  In channel mode each channel keeps its own hit-count
//! plane and is min-max normalized on its own at the end, which gives
//! the familiar color separation; in grayscale mode all the cycles
//! land in a single plane whose counts are clamped straight to bytes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, info};
use num::Complex;
use rand::distributions::{Distribution, Uniform};

use crate::buffer::{self, HitCounter, PixelBuffer};
use crate::error::PlotError;
use crate::escape::{self, BAILOUT};
use crate::params::BuddhabrotParameters;
use crate::planes::{self, ComplexRegion};

/// How many orbits a worker claims from the shared sample set at a
/// time during accumulation.
const ORBIT_CHUNK: usize = 256;

/// How many candidates a sampling thread draws between deadline
/// checks.
const SAMPLE_BLOCK: usize = 1024;

/// Plots a Buddhabrot.  The output is random by design; only its
/// shape and byte range are deterministic.
pub fn plot(
    parameters: &BuddhabrotParameters,
    threads: usize,
    deadline: Instant,
) -> Result<PixelBuffer, PlotError> {
    let width = parameters.width;
    let height = parameters.height;
    if width == 0 || height == 0 {
        return Err(PlotError::Validation(
            "image dimensions must be non-zero".to_string(),
        ));
    }
    let threads = threads.max(1);
    let sample_size = parameters.sample_size.resolve(width * height);
    let region = ComplexRegion::initial().match_aspect_ratio(width, height);
    info!(
        "buddhabrot plotter started: {}x{} pixels, {} samples/run, {} passes, grayscale: {}",
        width, height, sample_size, parameters.passes, parameters.grayscale
    );

    // One hit plane per channel, or a single shared plane when the
    // whole image is grayscale anyway.
    let channels: Vec<HitCounter> = if parameters.grayscale {
        vec![HitCounter::new(width, height)]
    } else {
        (0..3).map(|_| HitCounter::new(width, height)).collect()
    };

    for pass in 0..parameters.passes {
        for channel in 0..3 {
            let counter = &channels[channel % channels.len()];
            let accepted =
                sample_escapees(sample_size, parameters.max_sample_iterations, threads, deadline)?;
            debug!(
                "pass {} channel {}: {} of {} sample points escaped",
                pass,
                channel,
                accepted.len(),
                sample_size
            );
            accumulate_orbits(&accepted, counter, &region, parameters, threads, deadline)?;
        }
        info!("pass {} complete", pass);
    }

    let buffer = if parameters.grayscale {
        buffer::merge_grayscale(&channels[0])?
    } else {
        buffer::merge_channels(&channels[0], &channels[1], &channels[2])?
    };
    info!("buddhabrot plot complete");
    Ok(buffer)
}

/// Stage A: draw `sample_size` uniform random points over the bailout
/// square [-2,2]x[-2,2] and keep the ones that escape within the
/// cheap iteration cap; those are the orbits worth replaying.  Each
/// thread samples from its own thread-local generator, so there is no
/// shared RNG to contend over, and gathers survivors in its own
/// vector; the vectors are spliced after the join.
fn sample_escapees(
    sample_size: usize,
    max_sample_iterations: usize,
    threads: usize,
    deadline: Instant,
) -> Result<Vec<Complex<f64>>, PlotError> {
    let timed_out = AtomicBool::new(false);
    let mut accepted: Vec<Complex<f64>> = vec![];
    {
        let timed_out = &timed_out;
        crossbeam::scope(|spawner| {
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    // Divide the candidates as evenly as the remainder allows.
                    let count = sample_size / threads + usize::from(t < sample_size % threads);
                    spawner.spawn(move |_| {
                        let span = Uniform::new_inclusive(-BAILOUT, BAILOUT);
                        let mut rng = rand::thread_rng();
                        let mut survivors = vec![];
                        let mut drawn = 0;
                        while drawn < count {
                            if Instant::now() >= deadline {
                                timed_out.store(true, Ordering::Relaxed);
                                break;
                            }
                            let block = SAMPLE_BLOCK.min(count - drawn);
                            for _ in 0..block {
                                let c = Complex::new(
                                    span.sample(&mut rng),
                                    span.sample(&mut rng),
                                );
                                if escape::escape_time(c, max_sample_iterations).is_some() {
                                    survivors.push(c);
                                }
                            }
                            drawn += block;
                        }
                        survivors
                    })
                })
                .collect();
            for handle in handles {
                accepted.extend(handle.join().unwrap());
            }
        })
        .map_err(|_| PlotError::Unexpected("a sampling thread panicked".to_string()))?;
    }
    if timed_out.load(Ordering::Relaxed) {
        return Err(PlotError::Timeout);
    }
    Ok(accepted)
}

/// Stage B: replay each accepted point's orbit and increment the hit
/// counter for every pixel the orbit visits inside the render region.
/// Many threads hammer the same counters at once; the increments are
/// atomic and commutative, so no ordering between them matters.
fn accumulate_orbits(
    accepted: &[Complex<f64>],
    counter: &HitCounter,
    region: &ComplexRegion,
    parameters: &BuddhabrotParameters,
    threads: usize,
    deadline: Instant,
) -> Result<(), PlotError> {
    let timed_out = AtomicBool::new(false);
    {
        let chunks = Arc::new(Mutex::new(accepted.chunks(ORBIT_CHUNK)));
        let timed_out = &timed_out;
        crossbeam::scope(|spawner| {
            for _ in 0..threads {
                let chunks = chunks.clone();
                spawner.spawn(move |_| loop {
                    if Instant::now() >= deadline {
                        timed_out.store(true, Ordering::Relaxed);
                        break;
                    }
                    let chunk = { chunks.lock().unwrap().next() };
                    match chunk {
                        Some(points) => {
                            for &c in points {
                                plot_orbit(c, counter, region, parameters);
                            }
                        }
                        None => break,
                    }
                });
            }
        })
        .map_err(|_| PlotError::Unexpected("an accumulation thread panicked".to_string()))?;
    }
    if timed_out.load(Ordering::Relaxed) {
        return Err(PlotError::Timeout);
    }
    Ok(())
}

/// Replays one orbit, incrementing every visited pixel inside the
/// render region.  The current `z` is recorded before each step (the
/// initial 0 included, when the region covers the origin), and the
/// replay stops as soon as the orbit escapes the bailout band.
fn plot_orbit(
    c: Complex<f64>,
    counter: &HitCounter,
    region: &ComplexRegion,
    parameters: &BuddhabrotParameters,
) {
    let width = parameters.width;
    let height = parameters.height;
    let mut z: Complex<f64> = Complex::new(0.0, 0.0);
    for _ in 0..parameters.max_iterations {
        if z.re.abs() > BAILOUT || z.im.abs() > BAILOUT {
            return;
        }
        if region.contains(z) {
            let x = planes::scale(z.re, region.min_re, region.max_re, 0.0, width as f64) as usize;
            let y = planes::scale(z.im, region.min_im, region.max_im, 0.0, height as f64) as usize;
            // The region's max edges map exactly onto width/height.
            if x < width && y < height {
                counter.increment(x, y);
            }
        }
        z = z * z + c;
    }
}
