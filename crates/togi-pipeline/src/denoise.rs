//! Denoising: non-local means, edge-preserving smoothing, and iterated
//! small-window bilateral filtering.
//!
//! NL-means and the edge-preserving filter have no `imageproc`
//! counterpart, so both are implemented here. Color images are handled
//! channel-by-channel.

use image::{GrayImage, Luma};

use crate::config::{DenoiseConfig, EdgeFilter};
use crate::filter::bilateral;
use crate::raster::Raster;

/// Apply the denoise group in its fixed sub-order: NL-means,
/// edge-preserving smoothing, iterated bilateral.
#[must_use]
pub fn apply(raster: &Raster, config: &DenoiseConfig) -> Raster {
    let mut image = raster.clone();

    if config.nl_means {
        let (h, template, search) = (
            f64::from(config.strength),
            config.template_window,
            config.search_window,
        );
        image = image.per_channel(|plane| nl_means(plane, h, template, search));
    }

    if config.edge_preserving {
        let (filter, sigma_s, sigma_r) = (
            config.edge_filter,
            f64::from(config.edge_sigma_s),
            f64::from(config.edge_sigma_r),
        );
        image = image.per_channel(|plane| edge_preserving(plane, filter, sigma_s, sigma_r));
    }

    if config.bilateral {
        let iterations = config.bilateral_iterations;
        image = image.per_channel(|plane| {
            let mut out = plane.clone();
            for _ in 0..iterations {
                out = bilateral(&out, 5, 80.0, 80.0);
            }
            out
        });
    }

    image
}

/// Non-local means: each pixel becomes a weighted mean of pixels in its
/// search window, weighted by the similarity of their surrounding
/// patches. `template` and `search` are full odd window widths; `h`
/// controls how quickly dissimilar patches lose weight.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
#[must_use]
pub fn nl_means(img: &GrayImage, h: f64, template: u32, search: u32) -> GrayImage {
    if h <= 0.0 {
        return img.clone();
    }
    let (w, height) = img.dimensions();
    let tr = (template.max(1) | 1) as i32 / 2;
    let sr = (search.max(1) | 1) as i32 / 2;
    let h2 = h * h;

    let sample = |x: i32, y: i32| -> f64 {
        let cx = x.clamp(0, w as i32 - 1) as u32;
        let cy = y.clamp(0, height as i32 - 1) as u32;
        f64::from(img.get_pixel(cx, cy).0[0])
    };

    let patch_distance = |ax: i32, ay: i32, bx: i32, by: i32| -> f64 {
        let mut sum = 0.0;
        for dy in -tr..=tr {
            for dx in -tr..=tr {
                let diff = sample(ax + dx, ay + dy) - sample(bx + dx, by + dy);
                sum += diff * diff;
            }
        }
        let count = f64::from((2 * tr + 1) * (2 * tr + 1));
        sum / count
    };

    GrayImage::from_fn(w, height, |x, y| {
        let (xi, yi) = (x as i32, y as i32);
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for dy in -sr..=sr {
            for dx in -sr..=sr {
                let (nx, ny) = (xi + dx, yi + dy);
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= height as i32 {
                    continue;
                }
                let d2 = patch_distance(xi, yi, nx, ny);
                let weight = (-d2 / h2).exp();
                weight_sum += weight;
                value_sum += weight * f64::from(img.get_pixel(nx as u32, ny as u32).0[0]);
            }
        }
        Luma([(value_sum / weight_sum).round().clamp(0.0, 255.0) as u8])
    })
}

/// Edge-preserving smoothing.
///
/// `sigma_r` is a 0–1 range fraction and scales to intensity units.
/// The [`Recursive`](EdgeFilter::Recursive) variant runs a horizontal
/// then a vertical 1-D range filter; [`NormConv`](EdgeFilter::NormConv)
/// runs a full-window normalized convolution (bilateral).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn edge_preserving(img: &GrayImage, filter: EdgeFilter, sigma_s: f64, sigma_r: f64) -> GrayImage {
    if sigma_s <= 0.0 || sigma_r <= 0.0 {
        return img.clone();
    }
    let sigma_color = sigma_r * 255.0;
    match filter {
        EdgeFilter::Recursive => {
            let radius = (sigma_s.ceil() as u32).clamp(1, 64);
            let rows = range_filter_axis(img, radius, sigma_s, sigma_color, true);
            range_filter_axis(&rows, radius, sigma_s, sigma_color, false)
        }
        EdgeFilter::NormConv => {
            let radius = (sigma_s.ceil() as u32).clamp(1, 8);
            bilateral(img, radius * 2 + 1, sigma_color, sigma_s)
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn range_filter_axis(
    img: &GrayImage,
    radius: u32,
    sigma_space: f64,
    sigma_color: f64,
    horizontal: bool,
) -> GrayImage {
    let (w, h) = img.dimensions();
    let r = radius as i32;
    let two_ss2 = 2.0 * sigma_space * sigma_space;
    let two_sc2 = 2.0 * sigma_color * sigma_color;
    GrayImage::from_fn(w, h, |x, y| {
        let center = f64::from(img.get_pixel(x, y).0[0]);
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for offset in -r..=r {
            let (nx, ny) = if horizontal {
                (x as i32 + offset, y as i32)
            } else {
                (x as i32, y as i32 + offset)
            };
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let sample = f64::from(img.get_pixel(nx as u32, ny as u32).0[0]);
            let spatial = f64::from(offset * offset);
            let range = (sample - center) * (sample - center);
            let weight = (-spatial / two_ss2).exp() * (-range / two_sc2).exp();
            weight_sum += weight;
            value_sum += weight * sample;
        }
        Luma([(value_sum / weight_sum).round().clamp(0.0, 255.0) as u8])
    })
}
