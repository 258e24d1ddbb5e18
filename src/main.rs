use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use astrospec_rs::logger;
use astrospec_rs::pipeline::{
    PREVIEW_EXTENSIONS, PreviewConfig, PreviewPipeline, SPECTRUM_EXTENSIONS, SpectrumConfig,
    SpectrumPipeline,
};
use astrospec_rs::watch::{FolderWatcher, WatchConfig};

/// Watches the spectrograph capture folder and derives a JPEG preview and a
/// wavelength-calibrated curve plot for every new frame.
#[derive(Parser, Debug)]
#[command(name = "astrospec", version, about)]
struct Args {
    /// Directory the capture software drops raw FITS frames into
    #[arg(long, default_value = "image_files/spectrum_camera_img/Light")]
    light_dir: PathBuf,

    /// Output directory for JPEG previews
    #[arg(long, default_value = "image_files/spectrum_camera_img")]
    preview_dir: PathBuf,

    /// Output directory for rendered spectrum curves
    #[arg(long, default_value = "image_files/spectrum_curve_img")]
    curve_dir: PathBuf,

    /// Wavelength at the first image column, in nanometers
    #[arg(long, default_value_t = 693.0609)]
    lambda_start: f64,

    /// Wavelength at the last image column, in nanometers
    #[arg(long, default_value_t = 415.5012)]
    lambda_end: f64,

    /// Asinh stretch scale for the preview tone curve
    #[arg(long, default_value_t = 500.0)]
    stretch_scale: f32,

    /// Preview poll interval in seconds
    #[arg(long, default_value_t = 2)]
    preview_interval: u64,

    /// Spectrum poll interval in seconds
    #[arg(long, default_value_t = 1)]
    spectrum_interval: u64,
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    std::fs::create_dir_all(&args.curve_dir)
        .with_context(|| format!("creating {}", args.curve_dir.display()))?;

    let preview = PreviewPipeline::new(
        args.preview_dir.clone(),
        PreviewConfig::builder()
            .stretch_scale(args.stretch_scale)
            .build(),
    );
    let mut preview_watcher = FolderWatcher::new(
        WatchConfig::new(
            args.light_dir.clone(),
            PREVIEW_EXTENSIONS,
            Duration::from_secs(args.preview_interval),
        ),
        preview,
    );

    let spectrum = SpectrumPipeline::new(
        args.curve_dir.clone(),
        SpectrumConfig::builder()
            .lambda_start_nm(args.lambda_start)
            .lambda_end_nm(args.lambda_end)
            .build(),
    );
    let mut spectrum_watcher = FolderWatcher::new(
        WatchConfig::new(
            args.light_dir.clone(),
            SPECTRUM_EXTENSIONS,
            Duration::from_secs(args.spectrum_interval),
        ),
        spectrum,
    );

    info!(
        "Starting astrospec: watching {} ({:.4} -> {:.4} nm)",
        args.light_dir.display(),
        args.lambda_start,
        args.lambda_end
    );

    // The two pipelines are fully independent: separate processed sets,
    // separate intervals, no ordering guarantee between their outputs.
    std::thread::spawn(move || spectrum_watcher.run());
    preview_watcher.run()
}
