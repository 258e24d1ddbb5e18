//! Spectral projection pipeline
//!
//! Collapses an exposure of the dispersed slit into a 1D intensity trace:
//! full-resolution bilinear debayer (line positions matter here, unlike the
//! preview), Rec.601 grayscale, per-column sums, then a linear mapping from
//! column index to wavelength between the two calibration endpoints.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::common::io::write_atomic;
use crate::pipeline::common::types::ConversionOutcome;
use crate::pipeline::demosaic::{Reconstruction, RgbImageData};
use crate::pipeline::frame::{BayerFrame, SensorImage, SensorLoader, StandardSensorLoader};
use crate::pipeline::plot;
use crate::watch::FrameProcessor;

/// File extensions the spectrum watcher picks up.
pub const SPECTRUM_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg", "bmp", "fits"];

/// Wavelength calibration for the dispersion axis.
///
/// `lambda_start_nm` is the wavelength at column 0 and `lambda_end_nm` at the
/// last column. Start may exceed end; that is a spectrograph mounted with
/// reversed dispersion, not an error.
#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    pub lambda_start_nm: f64,
    pub lambda_end_nm: f64,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        // Calibrated against the rig's neon reference lamp.
        Self {
            lambda_start_nm: 693.0609,
            lambda_end_nm: 415.5012,
        }
    }
}

impl SpectrumConfig {
    pub fn builder() -> SpectrumConfigBuilder {
        SpectrumConfigBuilder::default()
    }
}

/// Builder for SpectrumConfig
#[derive(Default)]
pub struct SpectrumConfigBuilder {
    lambda_start_nm: Option<f64>,
    lambda_end_nm: Option<f64>,
}

impl SpectrumConfigBuilder {
    pub fn lambda_start_nm(mut self, nm: f64) -> Self {
        self.lambda_start_nm = Some(nm);
        self
    }

    pub fn lambda_end_nm(mut self, nm: f64) -> Self {
        self.lambda_end_nm = Some(nm);
        self
    }

    pub fn build(self) -> SpectrumConfig {
        let default = SpectrumConfig::default();
        SpectrumConfig {
            lambda_start_nm: self.lambda_start_nm.unwrap_or(default.lambda_start_nm),
            lambda_end_nm: self.lambda_end_nm.unwrap_or(default.lambda_end_nm),
        }
    }
}

/// One summed intensity per image column, with its wavelength axis.
#[derive(Debug, Clone)]
pub struct SpectrumProfile {
    pub wavelengths_nm: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl SpectrumProfile {
    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }
}

/// Inclusive linear wavelength axis: index 0 maps to exactly `start`, index
/// `n - 1` to exactly `end`, whichever endpoint is larger.
pub fn wavelength_axis(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let t = i as f64 / last;
                    start * (1.0 - t) + end * t
                })
                .collect()
        }
    }
}

pub struct SpectrumPipeline<L: SensorLoader = StandardSensorLoader> {
    loader: L,
    config: SpectrumConfig,
    output_dir: PathBuf,
}

impl SpectrumPipeline<StandardSensorLoader> {
    pub fn new(output_dir: PathBuf, config: SpectrumConfig) -> Self {
        Self {
            loader: StandardSensorLoader,
            config,
            output_dir,
        }
    }
}

impl<L: SensorLoader> SpectrumPipeline<L> {
    pub fn with_custom(loader: L, config: SpectrumConfig, output_dir: PathBuf) -> Self {
        Self {
            loader,
            config,
            output_dir,
        }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Project one sensor image onto the wavelength axis.
    pub fn project(&self, image: &SensorImage) -> Result<SpectrumProfile> {
        let rgb = match image.channels {
            1 => {
                let frame = BayerFrame {
                    width: image.width,
                    height: image.height,
                    data: image.data.iter().map(|&v| f32::from(v)).collect(),
                };
                Reconstruction::Bilinear.reconstruct(&frame)?
            }
            3 => RgbImageData {
                width: image.width,
                height: image.height,
                data: image.data.iter().map(|&v| f32::from(v)).collect(),
            },
            n => {
                return Err(PipelineError::DecodeError(format!(
                    "unsupported channel count: {n}"
                )));
            }
        };

        let gray = to_grayscale(&rgb);
        let intensities = column_sums(&gray, rgb.width, rgb.height);
        let wavelengths_nm = wavelength_axis(
            self.config.lambda_start_nm,
            self.config.lambda_end_nm,
            intensities.len(),
        );
        debug!(
            "Projected {} columns over {:.2} -> {:.2} nm",
            intensities.len(),
            self.config.lambda_start_nm,
            self.config.lambda_end_nm
        );

        Ok(SpectrumProfile {
            wavelengths_nm,
            intensities,
        })
    }

    /// Render the curve for one source image, or skip when the target PNG
    /// already exists.
    #[instrument(skip(self), fields(source = %source.display()))]
    pub fn process_file(&self, source: &Path) -> Result<ConversionOutcome> {
        let target = self.target_path(source)?;
        if target.exists() {
            info!("Curve already exists, skipping: {}", target.display());
            return Ok(ConversionOutcome::SkippedExisting);
        }

        let image = self.loader.load(source)?;
        let profile = self.project(&image)?;

        let title = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let png = plot::render_profile(&profile, &self.config, &title)?;
        write_atomic(&target, &png)?;

        info!("Saved curve: {}", target.display());
        Ok(ConversionOutcome::Written)
    }

    fn target_path(&self, source: &Path) -> Result<PathBuf> {
        let stem = source.file_stem().ok_or_else(|| {
            PipelineError::InputReadError(format!("{}: no file name", source.display()))
        })?;
        let mut name = stem.to_os_string();
        name.push(".png");
        Ok(self.output_dir.join(name))
    }
}

impl<L: SensorLoader> FrameProcessor for SpectrumPipeline<L> {
    fn name(&self) -> &str {
        "spectrum"
    }

    fn process(&self, path: &Path) -> Result<()> {
        self.process_file(path).map(|_| ())
    }
}

/// Rec.601 luma, the weighting every display-oriented grayscale uses.
fn to_grayscale(rgb: &RgbImageData) -> Vec<f64> {
    rgb.data
        .chunks_exact(3)
        .map(|px| 0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2]))
        .collect()
}

fn column_sums(gray: &[f64], width: usize, height: usize) -> Vec<f64> {
    let mut sums = vec![0.0f64; width];
    for y in 0..height {
        for (x, sum) in sums.iter_mut().enumerate() {
            *sum += gray[y * width + x];
        }
    }
    sums
}
