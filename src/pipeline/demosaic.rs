//! Bayer reconstruction strategies
//!
//! Both pipelines start from the same RGGB mosaic but want different
//! trade-offs: the preview path throws away resolution for speed, the
//! spectrum path keeps full resolution because line positions matter. The
//! two strategies live behind one [`Reconstruction`] selector so each
//! pipeline names its choice instead of carrying its own debayer code.

use std::io::Cursor;

use bayer::{BayerDepth, CFA, Demosaic, RasterDepth, RasterMut};

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::frame::types::BayerFrame;

/// RGB image produced by a reconstruction, interleaved `[R, G, B, ...]`.
#[derive(Debug, Clone)]
pub struct RgbImageData {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

/// How to turn an RGGB mosaic into RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconstruction {
    /// Collapse each 2x2 block into one pixel: R and B taken straight from
    /// their sites, G as the mean of the two green sites. Half resolution,
    /// no interpolation.
    BlockAverage,
    /// Bilinear interpolation at full resolution.
    Bilinear,
}

impl Reconstruction {
    pub fn reconstruct(&self, frame: &BayerFrame) -> Result<RgbImageData> {
        match self {
            Reconstruction::BlockAverage => Ok(block_average(frame)),
            Reconstruction::Bilinear => bilinear(frame),
        }
    }
}

fn block_average(frame: &BayerFrame) -> RgbImageData {
    // Odd trailing rows/columns have no complete 2x2 block and are dropped.
    let half_w = frame.width / 2;
    let half_h = frame.height / 2;
    let at = |y: usize, x: usize| frame.data[y * frame.width + x];

    let mut data = vec![0.0f32; half_w * half_h * 3];
    for y in 0..half_h {
        for x in 0..half_w {
            let r = at(2 * y, 2 * x);
            let g = (at(2 * y, 2 * x + 1) + at(2 * y + 1, 2 * x)) / 2.0;
            let b = at(2 * y + 1, 2 * x + 1);
            let i = (y * half_w + x) * 3;
            data[i] = r;
            data[i + 1] = g;
            data[i + 2] = b;
        }
    }

    RgbImageData {
        width: half_w,
        height: half_h,
        data,
    }
}

fn bilinear(frame: &BayerFrame) -> Result<RgbImageData> {
    let width = frame.width;
    let height = frame.height;

    // The bayer crate works on 16-bit samples; frames on this path come from
    // u16-range sources, so the quantization is exact.
    let mosaic_bytes: Vec<u8> = frame
        .data
        .iter()
        .flat_map(|&v| (v.clamp(0.0, f32::from(u16::MAX)) as u16).to_le_bytes())
        .collect();

    let mut rgb_bytes = vec![0u8; width * height * 3 * 2];
    let mut raster = RasterMut::new(width, height, RasterDepth::Depth16, &mut rgb_bytes);

    bayer::run_demosaic(
        &mut Cursor::new(&mosaic_bytes[..]),
        BayerDepth::Depth16LE,
        CFA::RGGB,
        Demosaic::Linear,
        &mut raster,
    )
    .map_err(|e| PipelineError::DecodeError(format!("Demosaic failed: {:?}", e)))?;

    let data = rgb_bytes
        .chunks_exact(2)
        .map(|b| f32::from(u16::from_le_bytes([b[0], b[1]])))
        .collect();

    Ok(RgbImageData {
        width,
        height,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: usize, height: usize, data: Vec<f32>) -> BayerFrame {
        assert_eq!(data.len(), width * height);
        BayerFrame {
            width,
            height,
            data,
        }
    }

    #[test]
    fn block_average_separates_channels() {
        // R sites hold 1, the two G sites 2 and 3, B sites 4.
        let mosaic = frame(
            4,
            4,
            vec![
                1.0, 2.0, 1.0, 2.0, //
                3.0, 4.0, 3.0, 4.0, //
                1.0, 2.0, 1.0, 2.0, //
                3.0, 4.0, 3.0, 4.0,
            ],
        );

        let rgb = Reconstruction::BlockAverage.reconstruct(&mosaic).unwrap();

        assert_eq!((rgb.width, rgb.height), (2, 2));
        for px in rgb.data.chunks_exact(3) {
            assert_eq!(px, [1.0, 2.5, 4.0]);
        }
    }

    #[test]
    fn block_average_halves_with_floor_division() {
        let rgb = Reconstruction::BlockAverage
            .reconstruct(&frame(5, 7, vec![0.0; 35]))
            .unwrap();
        assert_eq!((rgb.width, rgb.height), (2, 3));
        assert_eq!(rgb.data.len(), 2 * 3 * 3);
    }

    #[test]
    fn block_average_of_zeros_is_zero() {
        let rgb = Reconstruction::BlockAverage
            .reconstruct(&frame(4, 4, vec![0.0; 16]))
            .unwrap();
        assert!(rgb.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn bilinear_keeps_full_resolution() {
        let rgb = Reconstruction::Bilinear
            .reconstruct(&frame(8, 6, vec![100.0; 48]))
            .unwrap();

        assert_eq!((rgb.width, rgb.height), (8, 6));
        assert_eq!(rgb.data.len(), 8 * 6 * 3);
        // A flat mosaic interpolates to the same flat value away from the
        // border, whatever the border handling does.
        for y in 1..5 {
            for x in 1..7 {
                let i = (y * 8 + x) * 3;
                assert_eq!(&rgb.data[i..i + 3], &[100.0, 100.0, 100.0]);
            }
        }
    }
}
