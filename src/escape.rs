// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time evaluator shared by both renderers.  Takes a point
//! on the complex plane and repeatedly squares-and-adds it, reporting
//! how quickly the orbit blows past the bailout threshold.  Points
//! whose orbits never blow up within the iteration cap are "probably"
//! in the Mandelbrot set.  Probably, because the cap is finite and
//! escape-time methods can do no better.

use num::Complex;

/// No complex number with a real or imaginary coefficient whose
/// magnitude exceeds 2 can be part of the set, so testing each axis
/// against 2 is a cheaper equivalent of testing `|z| > 2`.
pub const BAILOUT: f64 = 2.0;

/// Iterates `z = z * z + c` from `z = 0` up to `limit` times.  Returns
/// `Some(iterations)` the first time either coefficient of `z` leaves
/// the bailout band, `None` if the point is probably in the set.  The
/// bailout test runs before each step, so the reported count is the
/// number of completed iterations at the moment of escape.
///
/// Pure; callable from any number of threads with no synchronization.
pub fn escape_time(c: Complex<f64>, limit: usize) -> Option<usize> {
    let mut z: Complex<f64> = Complex::new(0.0, 0.0);
    for i in 0..limit {
        if z.re.abs() > BAILOUT || z.im.abs() > BAILOUT {
            return Some(i);
        }
        z = z * z + c;
    }
    None
}
