//! FITS frame reader built on the fitrs library.
//!
//! The capture camera writes one FITS file per exposure with the mosaic in
//! the primary HDU. This reader decodes that primary array into floating
//! point, applying the standard BZERO/BSCALE linear scaling when the header
//! carries it, so unsigned 16-bit data stored as offset signed integers comes
//! out in its real range.

use std::path::Path;

use fitrs::{Fits, FitsData, HeaderValue};
use tracing::debug;

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::frame::reader::FrameReader;
use crate::pipeline::frame::types::BayerFrame;

/// Frame reader for raw FITS exposures.
pub struct FitsFrameReader;

impl FrameReader for FitsFrameReader {
    /// Reads the primary data array of a FITS file as a Bayer mosaic frame.
    ///
    /// # Returns
    ///
    /// * `Ok(BayerFrame)` - the primary HDU decoded to `f32` samples
    /// * `Err(PipelineError::MissingData)` - the file parses but holds no
    ///   payload array
    /// * `Err(PipelineError::DecodeError)` - the payload is not a
    ///   2-dimensional image
    fn read_frame(&self, path: &Path) -> Result<BayerFrame> {
        let (width, height, data) = read_primary_array(path)?;
        debug!("Decoded FITS frame {}x{}", width, height);
        Ok(BayerFrame {
            width,
            height,
            data,
        })
    }
}

/// Read the primary HDU of `path` as a 2D `f32` grid, BZERO/BSCALE applied.
pub(crate) fn read_primary_array(path: &Path) -> Result<(usize, usize, Vec<f32>)> {
    let fits = Fits::open(path)
        .map_err(|e| PipelineError::InputReadError(format!("{}: {}", path.display(), e)))?;
    let hdu = fits
        .get(0)
        .ok_or_else(|| PipelineError::MissingData(path.display().to_string()))?;

    let header_real = |key: &str| match hdu.value(key) {
        Some(HeaderValue::IntegerNumber(v)) => Some(*v as f64),
        Some(HeaderValue::RealFloatingNumber(v)) => Some(*v),
        _ => None,
    };
    let bzero = header_real("BZERO").unwrap_or(0.0);
    let bscale = header_real("BSCALE").unwrap_or(1.0);

    let (shape, data) = flatten(hdu.read_data(), bzero, bscale)?;

    if shape.is_empty() || data.is_empty() {
        return Err(PipelineError::MissingData(path.display().to_string()));
    }
    if shape.len() != 2 {
        return Err(PipelineError::DecodeError(format!(
            "{}: expected a 2-dimensional image, got {} axes",
            path.display(),
            shape.len()
        )));
    }

    // FITS axis order is fastest-varying first: NAXIS1 is the width.
    let (width, height) = (shape[0], shape[1]);
    if data.len() != width * height {
        return Err(PipelineError::DecodeError(format!(
            "{}: payload length {} does not match {}x{}",
            path.display(),
            data.len(),
            width,
            height
        )));
    }

    Ok((width, height, data))
}

fn flatten(data: FitsData, bzero: f64, bscale: f64) -> Result<(Vec<usize>, Vec<f32>)> {
    // Blank integer samples come back as None; they carry no flux, so they
    // collapse to zero just like non-finite floats do later in the pipeline.
    let scale = |v: f64| (bzero + bscale * v) as f32;
    match data {
        FitsData::IntegersI32(arr) => Ok((
            arr.shape,
            arr.data
                .into_iter()
                .map(|v| v.map(|x| scale(x as f64)).unwrap_or(0.0))
                .collect(),
        )),
        FitsData::IntegersU32(arr) => Ok((
            arr.shape,
            arr.data
                .into_iter()
                .map(|v| v.map(|x| scale(x as f64)).unwrap_or(0.0))
                .collect(),
        )),
        FitsData::FloatingPoint32(arr) => Ok((
            arr.shape,
            arr.data.into_iter().map(|v| scale(v as f64)).collect(),
        )),
        FitsData::FloatingPoint64(arr) => {
            Ok((arr.shape, arr.data.into_iter().map(scale).collect()))
        }
        FitsData::Characters(_) => Err(PipelineError::DecodeError(
            "primary HDU holds character data, not an image".to_string(),
        )),
    }
}
