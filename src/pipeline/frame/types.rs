//! Frame data types

/// A single-channel sensor frame in RGGB Bayer mosaic layout.
#[derive(Debug, Clone)]
pub struct BayerFrame {
    /// Width of the frame in pixels
    pub width: usize,
    /// Height of the frame in pixels
    pub height: usize,
    /// Row-major samples, length `width * height`
    pub data: Vec<f32>,
}

impl BayerFrame {
    /// Replace non-finite samples (NaN, ±inf from bad sensor reads or FITS
    /// blanks) with zero.
    pub fn scrub_non_finite(&mut self) {
        for v in &mut self.data {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
    }
}

/// An image widened to the unsigned 16-bit sample range.
///
/// `channels` is 1 for a bare mosaic or grayscale image and 3 for RGB;
/// 3-channel data is interleaved `[R, G, B, R, G, B, ...]`.
#[derive(Debug, Clone)]
pub struct SensorImage {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u16>,
}
