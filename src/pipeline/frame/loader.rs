//! Loader for the spectrum path.
//!
//! The curve pipeline accepts raw FITS exposures and a handful of encoded
//! image formats, all widened to the unsigned 16-bit sample range. Widening
//! preserves values (a 255 stays a 255); it is a precision upcast, not a
//! brightness rescale.

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::frame::fits_reader::read_primary_array;
use crate::pipeline::frame::types::SensorImage;

pub trait SensorLoader {
    fn load(&self, path: &Path) -> Result<SensorImage>;
}

/// Extension-dispatching loader: FITS via the primary HDU, everything else
/// through the image crate.
pub struct StandardSensorLoader;

impl SensorLoader for StandardSensorLoader {
    fn load(&self, path: &Path) -> Result<SensorImage> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        let image = match ext.as_str() {
            "fit" | "fits" => load_fits(path)?,
            _ => load_encoded(path)?,
        };
        debug!(
            "Loaded sensor image {}x{} ({} channel)",
            image.width, image.height, image.channels
        );
        Ok(image)
    }
}

fn load_fits(path: &Path) -> Result<SensorImage> {
    let (width, height, data) = read_primary_array(path)?;
    let data = data
        .into_iter()
        .map(|v| if v.is_finite() { v as u16 } else { 0 })
        .collect();
    Ok(SensorImage {
        width,
        height,
        channels: 1,
        data,
    })
}

fn load_encoded(path: &Path) -> Result<SensorImage> {
    let image = image::open(path)
        .map_err(|e| PipelineError::DecodeError(format!("{}: {}", path.display(), e)))?;

    let (width, height) = (image.width() as usize, image.height() as usize);
    let (channels, data) = match image {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw().into_iter().map(u16::from).collect()),
        DynamicImage::ImageLuma16(buf) => (1, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw().into_iter().map(u16::from).collect()),
        DynamicImage::ImageRgb16(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (
            3,
            buf.into_raw()
                .chunks_exact(4)
                .flat_map(|px| [u16::from(px[0]), u16::from(px[1]), u16::from(px[2])])
                .collect(),
        ),
        DynamicImage::ImageRgba16(buf) => (
            3,
            buf.into_raw()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        ),
        other => (3, other.into_rgb16().into_raw()),
    };

    Ok(SensorImage {
        width,
        height,
        channels,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn grayscale_png_keeps_values_and_single_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mosaic.png");
        let mut img = GrayImage::new(3, 2);
        for (i, p) in img.pixels_mut().enumerate() {
            *p = Luma([(i * 40) as u8]);
        }
        img.save(&path).unwrap();

        let loaded = StandardSensorLoader.load(&path).unwrap();

        assert_eq!((loaded.width, loaded.height, loaded.channels), (3, 2, 1));
        assert_eq!(loaded.data, vec![0, 40, 80, 120, 160, 200]);
    }

    #[test]
    fn rgb_png_stays_three_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.png");
        let img = image::RgbImage::from_fn(2, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        img.save(&path).unwrap();

        let loaded = StandardSensorLoader.load(&path).unwrap();

        assert_eq!((loaded.width, loaded.height, loaded.channels), (2, 2, 3));
        assert_eq!(loaded.data[..3], [0, 0, 7]);
    }

    #[test]
    fn undecodable_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = StandardSensorLoader.load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::DecodeError(_)));
    }
}
