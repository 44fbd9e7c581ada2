#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot and Buddhabrot plotting engine.
//!
//! The Mandelbrot takes a point on the complex plane and repeatedly
//! multiplies it by itself, measuring how quickly that number goes to
//! infinity.  That "velocity" is what the Mandelbrot plotter renders,
//! pixel by pixel.  The Buddhabrot turns the question around: take
//! random points that *do* escape, replay the orbit each one traces
//! on its way out, and increment every pixel the orbit passes
//! through.  The accumulated hit density is the image.
//!
//! Around those two renderers sits a small job pipeline: plot
//! requests are validated and queued as [`plot::Plot`] records in a
//! [`repository::PlotRepository`], and a [`worker::PlotWorker`]
//! claims them one at a time, drives the right plotter, and attaches
//! the finished RGB bytes.  Image-container encoding, transport, and
//! storage schemas all live outside this crate; it deals only in
//! `(width, height, rgb bytes)`.

pub mod buddhabrot;
pub mod buffer;
pub mod error;
pub mod escape;
pub mod mandelbrot;
pub mod params;
pub mod planes;
pub mod plot;
pub mod repository;
pub mod worker;

pub use buffer::PixelBuffer;
pub use error::PlotError;
pub use params::{BuddhabrotParameters, MandelbrotParameters, PlotParameters, SampleSize};
pub use plot::{render, Plot, PlotState};
pub use repository::{MemoryRepository, PlotRepository};
pub use worker::PlotWorker;
