//! Spectrograph frame-processing pipelines
//!
//! This module provides the two per-frame transforms of the rig, with
//! separate modules for frame loading, Bayer reconstruction, intensity
//! stretching, and the preview/spectrum orchestration.

pub mod common;
pub mod demosaic;
pub mod frame;
pub mod plot;
pub mod preview;
pub mod spectrum;
pub mod stretch;

pub use common::{ConversionOutcome, PipelineError, Result};

pub use frame::{BayerFrame, FitsFrameReader, FrameReader, SensorImage, SensorLoader, StandardSensorLoader};

pub use demosaic::{Reconstruction, RgbImageData};

pub use preview::{JpegPreviewEncoder, PreviewConfig, PreviewConfigBuilder, PreviewEncoder, PreviewPipeline, PREVIEW_EXTENSIONS};

pub use spectrum::{SpectrumConfig, SpectrumConfigBuilder, SpectrumPipeline, SpectrumProfile, SPECTRUM_EXTENSIONS};
