//! Thresholding: fixed, Otsu, and adaptive (mean / Gaussian-weighted).
//!
//! The stage always reduces color input to a single channel first. The
//! Otsu path needs at least two distinct intensities; on a constant
//! image it silently falls back to the fixed path at the configured
//! threshold value instead of failing. Adaptive block sizes are forced
//! to the next odd integer.
//!
//! The adaptive paths carry their own local-mean computation (an
//! integral image for the mean variant, a separable Gaussian for the
//! weighted one) because the offset constant `c` has to be subtracted
//! from the local mean before comparison.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

use crate::config::{ThresholdConfig, ThresholdKind};
use crate::filter::{convolve_separable, gaussian_kernel};
use crate::raster::Raster;

/// Apply the threshold stage.
#[must_use]
pub fn apply(raster: &Raster, config: &ThresholdConfig) -> Raster {
    if !config.enabled {
        return raster.clone();
    }
    let gray = raster.to_gray();
    let block = config.adaptive_block_size | 1;

    let out = match config.kind {
        ThresholdKind::Binary => fixed(&gray, config.value, false),
        ThresholdKind::BinaryInv => fixed(&gray, config.value, true),
        ThresholdKind::Otsu => {
            if distinct_values(&gray) > 1 {
                fixed(&gray, otsu_level(&gray), false)
            } else {
                fixed(&gray, config.value, false)
            }
        }
        ThresholdKind::AdaptiveMean => adaptive_mean(&gray, block, config.adaptive_c),
        ThresholdKind::AdaptiveGaussian => adaptive_gaussian(&gray, block, config.adaptive_c),
    };
    Raster::Gray(out)
}

/// Fixed global threshold: strictly above `value` is white (black when
/// inverted).
#[must_use]
pub fn fixed(img: &GrayImage, value: u8, inverted: bool) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let above = img.get_pixel(x, y).0[0] > value;
        Luma([if above != inverted { 255 } else { 0 }])
    })
}

fn distinct_values(img: &GrayImage) -> usize {
    let mut seen = [false; 256];
    for px in img.pixels() {
        seen[usize::from(px.0[0])] = true;
    }
    seen.iter().filter(|&&s| s).count()
}

/// Adaptive mean threshold: white where the pixel exceeds the mean of
/// its `block × block` neighborhood minus `c`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn adaptive_mean(img: &GrayImage, block: u32, c: i32) -> GrayImage {
    let (w, h) = img.dimensions();
    let radius = block / 2;
    let integral = integral_image(img);
    GrayImage::from_fn(w, h, |x, y| {
        let mean = region_mean(&integral, w, h, x, y, radius);
        let above = f64::from(img.get_pixel(x, y).0[0]) > mean - f64::from(c);
        Luma([if above { 255 } else { 0 }])
    })
}

/// Adaptive Gaussian threshold: white where the pixel exceeds the
/// Gaussian-weighted mean of its neighborhood minus `c`.
#[must_use]
pub fn adaptive_gaussian(img: &GrayImage, block: u32, c: i32) -> GrayImage {
    let kernel = gaussian_kernel(block, 0.0);
    let weighted_mean = convolve_separable(img, &kernel);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let local = f64::from(weighted_mean.get_pixel(x, y).0[0]);
        let above = f64::from(img.get_pixel(x, y).0[0]) > local - f64::from(c);
        Luma([if above { 255 } else { 0 }])
    })
}

/// Summed-area table with a zero-padded border; `table[y * (w+1) + x]`
/// holds the sum over the rectangle `[0, x) × [0, y)`.
fn integral_image(img: &GrayImage) -> Vec<u64> {
    let (w, h) = img.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(img.get_pixel(x, y).0[0]);
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }
    table
}

/// Mean over a square window centered on `(cx, cy)`, clamped to the
/// image bounds.
#[allow(clippy::cast_precision_loss)]
fn region_mean(integral: &[u64], w: u32, h: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (w + 1) as usize;
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(w as usize);
    let y2 = ((cy + radius + 1) as usize).min(h as usize);
    let area = ((x2 - x1) * (y2 - y1)) as f64;
    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;
    sum / area
}
