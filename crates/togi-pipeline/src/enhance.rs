//! Enhancement operations: directional text closing, detail and edge
//! boosts, unsharp masking, and kernel sharpening.

use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use crate::config::{EdgeFilter, EnhanceConfig};
use crate::denoise::edge_preserving;
use crate::filter::kernel_dimension;
use crate::morphology::{self, ElementShape, StructuringElement};
use crate::raster::Raster;

/// Apply the enhancement group in its fixed sub-order: text closing,
/// detail boost, edge overlay, unsharp mask, sharpen.
#[must_use]
pub fn apply(raster: &Raster, config: &EnhanceConfig) -> Raster {
    let mut image = raster.clone();

    if config.text {
        let length = kernel_dimension(config.text_kernel);
        let horizontal = StructuringElement::new(ElementShape::Rect, length, 1);
        let vertical = StructuringElement::new(ElementShape::Rect, 1, length);
        image = image.per_channel(|plane| {
            let closed = morphology::close(plane, &horizontal);
            morphology::close(&closed, &vertical)
        });
    }

    if config.detail {
        let (sigma_s, sigma_r) = (f64::from(config.detail_sigma_s), f64::from(config.detail_sigma_r));
        image = image.per_channel(|plane| {
            let smooth = edge_preserving(plane, EdgeFilter::NormConv, sigma_s, sigma_r);
            // Re-amplify the detail layer the smoothing removed.
            add_weighted(plane, 2.0, &smooth, -1.0)
        });
    }

    if config.edges {
        let edges = canny(&image.to_gray(), 50.0, 150.0);
        let strength = f64::from(config.edge_strength);
        image = image.per_channel(|plane| add_weighted(plane, 1.0, &edges, strength));
    }

    if config.unsharp {
        let amount = f64::from(config.unsharp_strength);
        image = image.per_channel(|plane| {
            let blurred = gaussian_blur_f32(plane, 2.0);
            add_weighted(plane, amount, &blurred, 1.0 - amount)
        });
    }

    if config.sharpen {
        let strength = f64::from(config.sharpen_strength);
        let kernel = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];
        image = image.per_channel(|plane| {
            let sharpened = convolve3x3(plane, &kernel);
            add_weighted(plane, 1.0 - strength, &sharpened, strength)
        });
    }

    image
}

/// Pixel-wise `alpha * a + beta * b`, rounded and clamped to 0–255.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn add_weighted(a: &GrayImage, alpha: f64, b: &GrayImage, beta: f64) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let blended = alpha * f64::from(a.get_pixel(x, y).0[0])
            + beta * f64::from(b.get_pixel(x, y).0[0]);
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Direct 3×3 convolution with replicated borders, rounded and clamped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn convolve3x3(img: &GrayImage, kernel: &[f64; 9]) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = 0.0;
        for ky in 0..3i32 {
            for kx in 0..3i32 {
                let sx = (x as i32 + kx - 1).clamp(0, w as i32 - 1) as u32;
                let sy = (y as i32 + ky - 1).clamp(0, h as i32 - 1) as u32;
                acc += kernel[(ky * 3 + kx) as usize] * f64::from(img.get_pixel(sx, sy).0[0]);
            }
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}
