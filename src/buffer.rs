//! Pixel storage for both renderers.  A `PixelBuffer` is a flat
//! 24-bit RGB byte buffer; a `HitCounter` is a width x height array of
//! atomic counters that the Buddhabrot's sampling threads hammer on
//! concurrently.  Counters only become pixels in a merge pass that
//! runs after every sampling thread has been joined, so the merge
//! reads need no synchronization beyond the join itself.

use std::sync::atomic::{AtomicU32, Ordering};

use num::clamp;

use crate::error::PlotError;

/// The number of bytes in a 24-bit RGB pixel.
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// A flat, zero-initialized RGB byte buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocates an all-black image.  Zero-sized images are refused;
    /// parameter validation should have caught them long before this.
    pub fn new(width: usize, height: usize) -> Result<Self, PlotError> {
        if width == 0 || height == 0 {
            return Err(PlotError::Validation(
                "image dimensions must be non-zero".to_string(),
            ));
        }
        Ok(PixelBuffer {
            width,
            height,
            data: vec![0; width * height * RGB_BYTES_PER_PIXEL],
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The number of bytes in one image row.
    pub fn bytes_per_line(&self) -> usize {
        self.width * RGB_BYTES_PER_PIXEL
    }

    /// The raw RGB bytes, row-major, three bytes per pixel.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Splits the buffer into independent row slices.  Row-parallel
    /// renderers hand these out to threads; no two threads ever share
    /// a row, so the rows need no locking.
    pub fn rows_mut(&mut self) -> std::slice::ChunksMut<'_, u8> {
        let bytes_per_line = self.bytes_per_line();
        self.data.chunks_mut(bytes_per_line)
    }

    /// Surrenders the raw bytes, for attaching to a completed plot.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// A width x height plane of atomic hit counters.  `increment` is safe
/// to call from any number of threads; the counts are only read back
/// after those threads are joined.
pub struct HitCounter {
    width: usize,
    height: usize,
    counts: Vec<AtomicU32>,
}

impl HitCounter {
    /// An all-zero counter plane.
    pub fn new(width: usize, height: usize) -> Self {
        let mut counts = Vec::with_capacity(width * height);
        counts.resize_with(width * height, || AtomicU32::new(0));
        HitCounter {
            width,
            height,
            counts,
        }
    }

    /// Records one orbit hit.  Relative ordering between threads is
    /// irrelevant; addition commutes.
    pub fn increment(&self, x: usize, y: usize) {
        debug_assert!(x < self.width && y < self.height);
        self.counts[y * self.width + x].fetch_add(1, Ordering::Relaxed);
    }

    /// The count at a pixel.  Only meaningful after the sampling
    /// threads are joined.
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.counts[y * self.width + x].load(Ordering::Relaxed)
    }

    /// The largest count anywhere on the plane.
    pub fn max(&self) -> u32 {
        self.counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .max()
            .unwrap_or(0)
    }

    fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed))
    }
}

/// Direct-mode merge: each hit count becomes a grayscale byte,
/// clamped at 255 rather than wrapped, replicated across all three
/// channels.
pub fn merge_grayscale(counter: &HitCounter) -> Result<PixelBuffer, PlotError> {
    let mut buffer = PixelBuffer::new(counter.width, counter.height)?;
    for (i, count) in counter.iter().enumerate() {
        let value = clamp(count, 0, 255) as u8;
        let index = i * RGB_BYTES_PER_PIXEL;
        buffer.data[index] = value;
        buffer.data[index + 1] = value;
        buffer.data[index + 2] = value;
    }
    Ok(buffer)
}

/// Channel-mode merge: each channel is min-max normalized against its
/// own maximum and written to its byte of every pixel.  The maximum is
/// read over the whole channel before any byte is written, so every
/// pixel is normalized against the same denominator.  A channel that
/// received no hits at all stays black.
pub fn merge_channels(
    red: &HitCounter,
    green: &HitCounter,
    blue: &HitCounter,
) -> Result<PixelBuffer, PlotError> {
    let mut buffer = PixelBuffer::new(red.width, red.height)?;
    for (channel, counter) in [red, green, blue].iter().enumerate() {
        let max = counter.max();
        if max == 0 {
            continue;
        }
        for (i, count) in counter.iter().enumerate() {
            let value = (f64::from(count) / f64::from(max) * 255.0) as u8;
            buffer.data[i * RGB_BYTES_PER_PIXEL + channel] = value;
        }
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_black() {
        let buffer = PixelBuffer::new(4, 3).unwrap();
        assert_eq!(buffer.data().len(), 4 * 3 * RGB_BYTES_PER_PIXEL);
        assert!(buffer.data().iter().all(|&b| b == 0));
        assert_eq!(buffer.bytes_per_line(), 12);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(PixelBuffer::new(0, 4).is_err());
        assert!(PixelBuffer::new(4, 0).is_err());
    }

    #[test]
    fn rows_are_disjoint_and_sized() {
        let mut buffer = PixelBuffer::new(5, 4).unwrap();
        let rows: Vec<_> = buffer.rows_mut().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.len() == 15));
    }

    #[test]
    fn grayscale_merge_clamps_at_255() {
        let counter = HitCounter::new(2, 1);
        for _ in 0..300 {
            counter.increment(0, 0);
        }
        counter.increment(1, 0);
        let buffer = merge_grayscale(&counter).unwrap();
        assert_eq!(&buffer.data()[0..3], &[255, 255, 255]);
        assert_eq!(&buffer.data()[3..6], &[1, 1, 1]);
    }

    #[test]
    fn channel_merge_normalizes_per_channel() {
        let red = HitCounter::new(2, 1);
        let green = HitCounter::new(2, 1);
        let blue = HitCounter::new(2, 1);
        // Red: 4 hits and 2 hits, so 255 and 127.
        for _ in 0..4 {
            red.increment(0, 0);
        }
        red.increment(1, 0);
        red.increment(1, 0);
        // Green: a single hit, so its own pixel is full-bright even
        // though the raw count is tiny.
        green.increment(1, 0);
        // Blue: no hits; stays black.
        let buffer = merge_channels(&red, &green, &blue).unwrap();
        assert_eq!(&buffer.data()[0..3], &[255, 0, 0]);
        assert_eq!(&buffer.data()[3..6], &[127, 255, 0]);
    }

    #[test]
    fn channel_merge_with_no_hits_is_black() {
        let red = HitCounter::new(3, 3);
        let green = HitCounter::new(3, 3);
        let blue = HitCounter::new(3, 3);
        let buffer = merge_channels(&red, &green, &blue).unwrap();
        assert!(buffer.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn concurrent_increments_are_lossless() {
        let counter = HitCounter::new(8, 8);
        crossbeam::scope(|spawner| {
            for _ in 0..4 {
                spawner.spawn(|_| {
                    for _ in 0..1000 {
                        counter.increment(3, 5);
                    }
                });
            }
        })
        .unwrap();
        assert_eq!(counter.get(3, 5), 4000);
    }
}
