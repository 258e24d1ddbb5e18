//! Spectrum plot rendering
//!
//! Draws the intensity-vs-wavelength trace as a PNG. The x axis runs in
//! calibration order, start wavelength on the left; with reversed dispersion
//! (start > end) the axis therefore reads right-to-left numerically, which
//! keeps red on the same side as on the sensor.

use std::io::Cursor;
use std::ops::Range;

use plotters::coord::ranged1d::{KeyPointHint, NoDefaultFormatting, Ranged, ValueFormatter};
use plotters::prelude::*;

use crate::pipeline::common::error::{PipelineError, Result};
use crate::pipeline::spectrum::{SpectrumConfig, SpectrumProfile};

const PLOT_WIDTH: u32 = 1800;
const PLOT_HEIGHT: u32 = 600;

/// Tick count of the x axis; ticks are rounded to whole nanometers.
const X_TICKS: usize = 11;

/// Linear wavelength axis between the two calibration endpoints, in
/// calibration order rather than ascending order.
#[derive(Clone)]
pub struct WavelengthAxis {
    start: f64,
    end: f64,
}

impl WavelengthAxis {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Evenly spaced tick positions spanning the rendered data range, each
    /// rounded to the nearest integer nanometer.
    pub fn ticks(&self) -> Vec<f64> {
        let (lo, hi) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        (0..X_TICKS)
            .map(|i| {
                let t = i as f64 / (X_TICKS - 1) as f64;
                (lo * (1.0 - t) + hi * t).round()
            })
            .collect()
    }
}

impl Ranged for WavelengthAxis {
    type FormatOption = NoDefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let span = self.end - self.start;
        if span == 0.0 {
            return limit.0;
        }
        let t = (value - self.start) / span;
        limit.0 + (f64::from(limit.1 - limit.0) * t).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.max_num_points() < 2 {
            return Vec::new();
        }
        self.ticks()
    }

    fn range(&self) -> Range<f64> {
        if self.start <= self.end {
            self.start..self.end
        } else {
            self.end..self.start
        }
    }
}

impl ValueFormatter<f64> for WavelengthAxis {
    fn format_ext(&self, value: &f64) -> String {
        format!("{}", value.round() as i64)
    }
}

/// Render a profile to PNG bytes.
pub fn render_profile(
    profile: &SpectrumProfile,
    config: &SpectrumConfig,
    title: &str,
) -> Result<Vec<u8>> {
    if profile.is_empty() {
        return Err(PipelineError::PlotError(
            "cannot plot an empty profile".to_string(),
        ));
    }

    let y_max = profile
        .intensities
        .iter()
        .copied()
        .fold(0.0f64, f64::max);
    let y_top = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

    let mut pixels = vec![0u8; (PLOT_WIDTH * PLOT_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (PLOT_WIDTH, PLOT_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let axis = WavelengthAxis::new(config.lambda_start_nm, config.lambda_end_nm);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(48)
            .y_label_area_size(84)
            .build_cartesian_2d(axis, 0.0..y_top)
            .map_err(plot_error)?;

        let grid = BLACK.mix(0.3);
        chart
            .configure_mesh()
            .x_desc("Wavelength (nm)")
            .y_desc("Intensity (sum over y)")
            .bold_line_style(&grid)
            .light_line_style(&TRANSPARENT)
            .draw()
            .map_err(plot_error)?;

        chart
            .draw_series(LineSeries::new(
                profile
                    .wavelengths_nm
                    .iter()
                    .zip(&profile.intensities)
                    .map(|(&w, &i)| (w, i)),
                &BLACK,
            ))
            .map_err(plot_error)?;

        root.present().map_err(plot_error)?;
    }

    let img = image::RgbImage::from_raw(PLOT_WIDTH, PLOT_HEIGHT, pixels)
        .ok_or_else(|| PipelineError::PlotError("render buffer size mismatch".to_string()))?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| PipelineError::EncodeError(e.to_string()))?;
    Ok(png)
}

fn plot_error<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::PlotError(e.to_string())
}
