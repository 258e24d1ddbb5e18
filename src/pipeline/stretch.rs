//! Ratio-preserving asinh intensity compression
//!
//! The defining numeric contract of the preview path: brightness is remapped
//! through an asinh curve computed on the per-pixel channel mean, then each
//! pixel's channel ratios are reapplied, so color survives while the dynamic
//! range is compressed.

use crate::pipeline::demosaic::RgbImageData;

/// Guards the ratio division on black pixels.
const RATIO_EPSILON: f32 = 1e-6;

/// Normalize an intensity field to [0,1] and compress it with
/// `asinh(scale * x) / asinh(scale)`.
///
/// Non-finite samples are zeroed first. A blank field (max 0 after the
/// minimum subtraction) stays all zero.
pub fn asinh_stretch(values: &[f32], scale: f32) -> Vec<f32> {
    let mut data: Vec<f32> = values
        .iter()
        .map(|v| if v.is_finite() { *v } else { 0.0 })
        .collect();

    let min = data.iter().copied().fold(f32::INFINITY, f32::min);
    if min.is_finite() {
        for v in &mut data {
            *v -= min;
        }
    }

    let max = data.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in &mut data {
            *v /= max;
        }
    }

    let norm = scale.asinh();
    for v in &mut data {
        *v = (scale * *v).asinh() / norm;
    }
    data
}

/// Stretch an RGB image by its overall intensity while keeping each pixel's
/// channel proportions.
pub fn stretch_rgb(image: &RgbImageData, scale: f32) -> RgbImageData {
    let finite = |v: f32| if v.is_finite() { v } else { 0.0 };

    let intensity: Vec<f32> = image
        .data
        .chunks_exact(3)
        .map(|px| (finite(px[0]) + finite(px[1]) + finite(px[2])) / 3.0)
        .collect();

    let stretched = asinh_stretch(&intensity, scale);

    let mut data = Vec::with_capacity(image.data.len());
    for (px, &level) in image.data.chunks_exact(3).zip(&stretched) {
        let r = finite(px[0]);
        let g = finite(px[1]);
        let b = finite(px[2]);
        let total = r + g + b + RATIO_EPSILON;
        data.push(r / total * level);
        data.push(g / total * level);
        data.push(b / total * level);
    }

    RgbImageData {
        width: image.width,
        height: image.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(width: usize, height: usize, data: Vec<f32>) -> RgbImageData {
        assert_eq!(data.len(), width * height * 3);
        RgbImageData {
            width,
            height,
            data,
        }
    }

    #[test]
    fn blank_field_stays_zero() {
        assert!(asinh_stretch(&[0.0; 16], 500.0).iter().all(|&v| v == 0.0));
        let out = stretch_rgb(&rgb(2, 2, vec![0.0; 12]), 500.0);
        assert!(out.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn output_is_bounded_to_unit_interval() {
        let input = rgb(
            2,
            2,
            vec![
                10.0, 700.0, 3.5, //
                0.0, 0.0, 0.0, //
                65535.0, 1.0, 1.0, //
                42.0, 42.0, 42.0,
            ],
        );
        for scale in [10.0, 500.0, 1000.0] {
            let out = stretch_rgb(&input, scale);
            assert!(out.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn brightest_pixel_reaches_one() {
        let stretched = asinh_stretch(&[5.0, 20.0, 80.0], 500.0);
        assert!((stretched[2] - 1.0).abs() < 1e-6);
        assert_eq!(stretched[0], 0.0); // minimum subtraction anchors at zero
    }

    #[test]
    fn non_finite_samples_are_zeroed() {
        let stretched = asinh_stretch(&[f32::NAN, f32::INFINITY, 4.0], 500.0);
        assert!(stretched.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn channel_ratios_survive_the_stretch() {
        // R = G = 2k, B = k everywhere: ratios must come out (0.4, 0.4, 0.2)
        // regardless of k and of the scale constant.
        for k in [0.25f32, 3.0, 900.0] {
            // A gradient in overall brightness, fixed channel proportions.
            let data = vec![
                2.0 * k, 2.0 * k, k, //
                4.0 * k, 4.0 * k, 2.0 * k, //
                6.0 * k, 6.0 * k, 3.0 * k, //
                8.0 * k, 8.0 * k, 4.0 * k,
            ];
            for scale in [50.0, 500.0] {
                let out = stretch_rgb(&rgb(2, 2, data.clone()), scale);
                for px in out.data.chunks_exact(3) {
                    let total: f32 = px.iter().sum();
                    if total == 0.0 {
                        continue; // darkest pixel may stretch to zero
                    }
                    assert!((px[0] / total - 0.4).abs() < 1e-4);
                    assert!((px[1] / total - 0.4).abs() < 1e-4);
                    assert!((px[2] / total - 0.2).abs() < 1e-4);
                }
            }
        }
    }
}
