//! Linear and nonlinear filters.
//!
//! Kernel-size parameters in the configuration are radii: a stored
//! value of `N` produces an actual odd window dimension of `2N + 1`,
//! which is what the separable Gaussian and the median filter require.
//!
//! The Gaussian here carries its own explicit kernel (rather than
//! wrapping [`imageproc::filter::gaussian_blur_f32`], which is
//! sigma-only) so the kernel-size rule stays observable; when the
//! configured sigma is non-positive it is derived from the kernel size
//! as `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.

use image::{GrayImage, Luma};
use imageproc::filter::median_filter;

use crate::config::FilterConfig;
use crate::morphology::{self, StructuringElement};
use crate::raster::{Raster, saturating_sub};

/// Apply the filter group in its fixed sub-order: bilateral, Gaussian,
/// median, background subtraction.
#[must_use]
pub fn apply(raster: &Raster, config: &FilterConfig) -> Raster {
    let mut image = raster.clone();

    if config.bilateral {
        let (d, sc, ss) = (
            config.bilateral_d,
            f64::from(config.bilateral_sigma_color),
            f64::from(config.bilateral_sigma_space),
        );
        image = image.per_channel(|plane| bilateral(plane, d, sc, ss));
    }

    if config.gaussian {
        let kernel = gaussian_kernel(kernel_dimension(config.gaussian_kernel), config.gaussian_sigma);
        image = image.per_channel(|plane| convolve_separable(plane, &kernel));
    }

    if config.median {
        let radius = config.median_kernel;
        image = image.per_channel(|plane| median_filter(plane, radius, radius));
    }

    if config.background_subtraction {
        let bias = config.background_bias;
        let element = StructuringElement::ellipse(20);
        image = image.per_channel(|plane| {
            let background = morphology::open(plane, &element);
            let lifted = saturating_sub(plane, &background);
            let mut out = lifted;
            for px in out.pixels_mut() {
                px.0[0] = px.0[0].saturating_add(bias);
            }
            out
        });
    }

    image
}

/// Odd window dimension for a stored kernel radius.
#[must_use]
pub const fn kernel_dimension(radius: u32) -> u32 {
    radius * 2 + 1
}

/// Build a normalized 1-D Gaussian kernel of the given odd size.
///
/// A non-positive sigma is replaced by the size-derived default.
#[must_use]
pub fn gaussian_kernel(size: u32, sigma: f64) -> Vec<f64> {
    let size = size.max(1) | 1;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((f64::from(size) - 1.0) * 0.5 - 1.0) + 0.8
    };
    let center = f64::from(size / 2);
    let mut kernel: Vec<f64> = (0..size)
        .map(|i| {
            let x = f64::from(i) - center;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable convolution: one horizontal and one vertical pass with the
/// same 1-D kernel. Borders replicate the edge sample.
#[must_use]
pub fn convolve_separable(img: &GrayImage, kernel: &[f64]) -> GrayImage {
    let horizontal = convolve_axis(img, kernel, true);
    convolve_axis(&horizontal, kernel, false)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn convolve_axis(img: &GrayImage, kernel: &[f64], horizontal: bool) -> GrayImage {
    let (w, h) = img.dimensions();
    let half = (kernel.len() / 2) as i32;
    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = 0.0;
        for (i, &weight) in kernel.iter().enumerate() {
            let offset = i as i32 - half;
            let (sx, sy) = if horizontal {
                ((x as i32 + offset).clamp(0, w as i32 - 1), y as i32)
            } else {
                (x as i32, (y as i32 + offset).clamp(0, h as i32 - 1))
            };
            acc += weight * f64::from(img.get_pixel(sx as u32, sy as u32).0[0]);
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// Bilateral filter: a Gaussian-weighted mean where each neighbor is
/// additionally weighted by its intensity distance from the center.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
#[must_use]
pub fn bilateral(img: &GrayImage, diameter: u32, sigma_color: f64, sigma_space: f64) -> GrayImage {
    if diameter < 2 || sigma_color <= 0.0 || sigma_space <= 0.0 {
        return img.clone();
    }
    let radius = (diameter / 2) as i32;
    let (w, h) = img.dimensions();
    let two_sc2 = 2.0 * sigma_color * sigma_color;
    let two_ss2 = 2.0 * sigma_space * sigma_space;

    GrayImage::from_fn(w, h, |x, y| {
        let center = f64::from(img.get_pixel(x, y).0[0]);
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let sample = f64::from(img.get_pixel(nx as u32, ny as u32).0[0]);
                let spatial = f64::from(dx * dx + dy * dy);
                let range = (sample - center) * (sample - center);
                let weight = (-spatial / two_ss2).exp() * (-range / two_sc2).exp();
                weight_sum += weight;
                value_sum += weight * sample;
            }
        }
        Luma([(value_sum / weight_sum).round().clamp(0.0, 255.0) as u8])
    })
}
