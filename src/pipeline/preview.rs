//! Preview conversion pipeline
//!
//! Turns one raw FITS exposure into the color JPEG the touch display shows:
//! block-average debayer, ratio-preserving asinh stretch, 8-bit quantization,
//! vertical flip for the sensor mounting orientation, JPEG encode.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use tracing::{info, instrument};

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::common::io::write_atomic;
use crate::pipeline::common::types::ConversionOutcome;
use crate::pipeline::demosaic::{Reconstruction, RgbImageData};
use crate::pipeline::frame::{FitsFrameReader, FrameReader};
use crate::pipeline::stretch::stretch_rgb;
use crate::watch::FrameProcessor;

/// File extensions the preview watcher picks up.
pub const PREVIEW_EXTENSIONS: &[&str] = &["fits"];

/// Configuration for preview conversion
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Asinh stretch scale; larger values lift faint detail harder
    pub stretch_scale: f32,
    /// JPEG encoder quality, 0-100
    pub jpeg_quality: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            stretch_scale: 500.0,
            jpeg_quality: 95,
        }
    }
}

impl PreviewConfig {
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder::default()
    }
}

/// Builder for PreviewConfig
#[derive(Default)]
pub struct PreviewConfigBuilder {
    stretch_scale: Option<f32>,
    jpeg_quality: Option<u8>,
}

impl PreviewConfigBuilder {
    pub fn stretch_scale(mut self, scale: f32) -> Self {
        self.stretch_scale = Some(scale);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality);
        self
    }

    pub fn build(self) -> PreviewConfig {
        let default = PreviewConfig::default();
        PreviewConfig {
            stretch_scale: self.stretch_scale.unwrap_or(default.stretch_scale),
            jpeg_quality: self.jpeg_quality.unwrap_or(default.jpeg_quality),
        }
    }
}

pub trait PreviewEncoder {
    /// Encode interleaved 8-bit RGB into the output container format.
    fn encode(&self, width: usize, height: usize, rgb: &[u8], quality: u8) -> Result<Vec<u8>>;
}

pub struct JpegPreviewEncoder;

impl PreviewEncoder for JpegPreviewEncoder {
    fn encode(&self, width: usize, height: usize, rgb: &[u8], quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut Cursor::new(&mut bytes), quality)
            .write_image(
                rgb,
                width as u32,
                height as u32,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| PipelineError::EncodeError(e.to_string()))?;
        Ok(bytes)
    }
}

pub struct PreviewPipeline<R: FrameReader = FitsFrameReader, E: PreviewEncoder = JpegPreviewEncoder>
{
    reader: R,
    encoder: E,
    config: PreviewConfig,
    output_dir: PathBuf,
}

impl PreviewPipeline<FitsFrameReader, JpegPreviewEncoder> {
    pub fn new(output_dir: PathBuf, config: PreviewConfig) -> Self {
        Self {
            reader: FitsFrameReader,
            encoder: JpegPreviewEncoder,
            config,
            output_dir,
        }
    }
}

impl<R: FrameReader, E: PreviewEncoder> PreviewPipeline<R, E> {
    pub fn with_custom(reader: R, encoder: E, config: PreviewConfig, output_dir: PathBuf) -> Self {
        Self {
            reader,
            encoder,
            config,
            output_dir,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Convert one exposure, or skip without touching the source when the
    /// target JPEG already exists.
    #[instrument(skip(self), fields(source = %source.display()))]
    pub fn convert_file(&self, source: &Path) -> Result<ConversionOutcome> {
        let target = self.target_path(source)?;
        if target.exists() {
            info!("Preview already exists, skipping: {}", target.display());
            return Ok(ConversionOutcome::SkippedExisting);
        }

        let mut frame = self.reader.read_frame(source)?;
        frame.scrub_non_finite();

        let rgb = Reconstruction::BlockAverage.reconstruct(&frame)?;
        let stretched = stretch_rgb(&rgb, self.config.stretch_scale);
        let mut quantized = quantize_to_u8(&stretched);
        flip_vertical(stretched.width, stretched.height, &mut quantized);

        let bytes = self.encoder.encode(
            stretched.width,
            stretched.height,
            &quantized,
            self.config.jpeg_quality,
        )?;
        write_atomic(&target, &bytes)?;

        info!("Saved preview: {}", target.display());
        Ok(ConversionOutcome::Written)
    }

    fn target_path(&self, source: &Path) -> Result<PathBuf> {
        let stem = source.file_stem().ok_or_else(|| {
            PipelineError::InputReadError(format!("{}: no file name", source.display()))
        })?;
        let mut name = stem.to_os_string();
        name.push(".jpg");
        Ok(self.output_dir.join(name))
    }
}

impl<R: FrameReader, E: PreviewEncoder> FrameProcessor for PreviewPipeline<R, E> {
    fn name(&self) -> &str {
        "preview"
    }

    fn process(&self, path: &Path) -> Result<()> {
        self.convert_file(path).map(|_| ())
    }
}

/// Map [0,1] samples onto 0-255 by truncating cast.
fn quantize_to_u8(image: &RgbImageData) -> Vec<u8> {
    image.data.iter().map(|&v| (v * 255.0) as u8).collect()
}

/// Reverse row order in place; the sensor hangs upside down in the rig.
fn flip_vertical(width: usize, height: usize, rgb: &mut [u8]) {
    let row = width * 3;
    for y in 0..height / 2 {
        let (top, rest) = rgb.split_at_mut((height - 1 - y) * row);
        let top = &mut top[y * row..y * row + row];
        top.swap_with_slice(&mut rest[..row]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame::BayerFrame;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockReader {
        frame: Option<BayerFrame>,
        reads: AtomicUsize,
    }

    impl MockReader {
        fn with_frame(width: usize, height: usize, data: Vec<f32>) -> Self {
            Self {
                frame: Some(BayerFrame {
                    width,
                    height,
                    data,
                }),
                reads: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                frame: None,
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl FrameReader for &MockReader {
        fn read_frame(&self, path: &Path) -> Result<BayerFrame> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.frame
                .clone()
                .ok_or_else(|| PipelineError::MissingData(path.display().to_string()))
        }
    }

    struct CapturingEncoder {
        captured: Mutex<Option<(usize, usize, Vec<u8>)>>,
    }

    impl PreviewEncoder for &CapturingEncoder {
        fn encode(&self, width: usize, height: usize, rgb: &[u8], _quality: u8) -> Result<Vec<u8>> {
            *self.captured.lock().unwrap() = Some((width, height, rgb.to_vec()));
            Ok(b"encoded".to_vec())
        }
    }

    fn gradient_frame() -> MockReader {
        // Bottom half of the sensor is bright, top half dim; flat channels.
        MockReader::with_frame(
            4,
            4,
            vec![
                10.0, 10.0, 10.0, 10.0, //
                10.0, 10.0, 10.0, 10.0, //
                80.0, 80.0, 80.0, 80.0, //
                80.0, 80.0, 80.0, 80.0,
            ],
        )
    }

    #[test]
    fn converts_once_then_skips_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let reader = gradient_frame();
        let pipeline = PreviewPipeline::with_custom(
            &reader,
            JpegPreviewEncoder,
            PreviewConfig::default(),
            dir.path().to_path_buf(),
        );
        let source = Path::new("light_0001.fits");

        assert_eq!(
            pipeline.convert_file(source).unwrap(),
            ConversionOutcome::Written
        );
        let target = dir.path().join("light_0001.jpg");
        assert!(target.exists());
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);

        let first_write = std::fs::metadata(&target).unwrap().modified().unwrap();
        assert_eq!(
            pipeline.convert_file(source).unwrap(),
            ConversionOutcome::SkippedExisting
        );
        // Second call: no source read, no rewrite.
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::metadata(&target).unwrap().modified().unwrap(),
            first_write
        );
    }

    #[test]
    fn preview_is_half_resolution_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let reader = gradient_frame();
        let pipeline = PreviewPipeline::with_custom(
            &reader,
            JpegPreviewEncoder,
            PreviewConfig::default(),
            dir.path().to_path_buf(),
        );

        pipeline.convert_file(Path::new("light_0002.fits")).unwrap();

        let written = image::open(dir.path().join("light_0002.jpg")).unwrap();
        assert_eq!((written.width(), written.height()), (2, 2));
    }

    #[test]
    fn frame_is_flipped_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let reader = gradient_frame();
        let encoder = CapturingEncoder {
            captured: Mutex::new(None),
        };
        let pipeline = PreviewPipeline::with_custom(
            &reader,
            &encoder,
            PreviewConfig::default(),
            dir.path().to_path_buf(),
        );

        pipeline.convert_file(Path::new("light_0003.fits")).unwrap();

        let (width, height, rgb) = encoder.captured.lock().unwrap().take().unwrap();
        assert_eq!((width, height), (2, 2));
        // The bright bottom row of the sensor ends up in the top output row.
        let top: u32 = rgb[..6].iter().map(|&v| u32::from(v)).sum();
        let bottom: u32 = rgb[6..].iter().map(|&v| u32::from(v)).sum();
        assert!(top > bottom);
    }

    #[test]
    fn missing_data_propagates_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reader = MockReader::failing();
        let pipeline = PreviewPipeline::with_custom(
            &reader,
            JpegPreviewEncoder,
            PreviewConfig::default(),
            dir.path().to_path_buf(),
        );

        let err = pipeline.convert_file(Path::new("bad.fits")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingData(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn quantization_truncates() {
        let image = RgbImageData {
            width: 1,
            height: 1,
            data: vec![0.0, 0.999, 1.0],
        };
        assert_eq!(quantize_to_u8(&image), vec![0, 254, 255]);
    }

    #[test]
    fn flip_reverses_row_order() {
        let mut rgb = vec![
            1, 1, 1, 2, 2, 2, //
            3, 3, 3, 4, 4, 4, //
            5, 5, 5, 6, 6, 6,
        ];
        flip_vertical(2, 3, &mut rgb);
        assert_eq!(
            rgb,
            vec![
                5, 5, 5, 6, 6, 6, //
                3, 3, 3, 4, 4, 4, //
                1, 1, 1, 2, 2, 2,
            ]
        );
    }
}
