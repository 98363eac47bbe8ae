//! Color-space conversion and gamma correction.
//!
//! Conversions remap a three-channel buffer in place and keep the
//! 8-bit encoding conventions of the original system: hue is halved
//! into 0–179, L* is rescaled to 0–255, and chroma planes are offset by
//! 128. A single-channel buffer passes through every conversion except
//! the (trivial) grayscale one.

use image::{Rgb, RgbImage};

use crate::config::ColorSpace;
use crate::raster::Raster;

/// Convert the working image into the configured color space.
#[must_use]
pub fn convert(raster: &Raster, space: ColorSpace) -> Raster {
    match space {
        ColorSpace::Rgb => raster.clone(),
        ColorSpace::Grayscale => match raster {
            Raster::Gray(_) => raster.clone(),
            Raster::Rgb(_) => Raster::Gray(raster.to_gray()),
        },
        ColorSpace::Hsv => map_color(raster, rgb_to_hsv),
        ColorSpace::Lab => map_color(raster, rgb_to_lab),
        ColorSpace::Yuv => map_color(raster, rgb_to_yuv),
        ColorSpace::YCbCr => map_color(raster, rgb_to_ycbcr),
    }
}

/// Apply gamma correction through a 256-entry lookup table.
///
/// The table is built once per invocation as
/// `round(255 * (i/255)^(1/gamma))`. A gamma of exactly 1.0 (or any
/// non-positive gamma) leaves the image unchanged.
#[must_use]
pub fn apply_gamma(raster: &Raster, gamma: f64) -> Raster {
    if gamma <= 0.0 || (gamma - 1.0).abs() < f64::EPSILON {
        return raster.clone();
    }
    let table = gamma_lut(gamma);
    raster.map_samples(|v| table[usize::from(v)])
}

/// Build the gamma lookup table.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
#[must_use]
pub fn gamma_lut(gamma: f64) -> [u8; 256] {
    let inv = 1.0 / gamma;
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (255.0 * (i as f64 / 255.0).powf(inv)).round() as u8;
    }
    table
}

fn map_color(raster: &Raster, f: impl Fn(u8, u8, u8) -> [u8; 3]) -> Raster {
    match raster {
        Raster::Gray(_) => raster.clone(),
        Raster::Rgb(img) => Raster::Rgb(RgbImage::from_fn(img.width(), img.height(), |x, y| {
            let Rgb([r, g, b]) = *img.get_pixel(x, y);
            Rgb(f(r, g, b))
        })),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f64::from(r), f64::from(g), f64::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let value = max;
    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
    let hue_degrees = if delta <= 0.0 {
        0.0
    } else if (max - rf).abs() < f64::EPSILON {
        60.0 * ((gf - bf) / delta)
    } else if (max - gf).abs() < f64::EPSILON {
        60.0 * ((bf - rf) / delta) + 120.0
    } else {
        60.0 * ((rf - gf) / delta) + 240.0
    };
    let hue_degrees = if hue_degrees < 0.0 {
        hue_degrees + 360.0
    } else {
        hue_degrees
    };

    [
        (hue_degrees / 2.0).round().min(179.0) as u8,
        saturation.round().clamp(0.0, 255.0) as u8,
        value.round().clamp(0.0, 255.0) as u8,
    ]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rgb_to_lab(r: u8, g: u8, b: u8) -> [u8; 3] {
    fn srgb_to_linear(v: f64) -> f64 {
        if v > 0.040_45 {
            ((v + 0.055) / 1.055).powf(2.4)
        } else {
            v / 12.92
        }
    }
    fn lab_f(t: f64) -> f64 {
        if t > 0.008_856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    }

    let rl = srgb_to_linear(f64::from(r) / 255.0);
    let gl = srgb_to_linear(f64::from(g) / 255.0);
    let bl = srgb_to_linear(f64::from(b) / 255.0);

    // D65 reference white.
    let x = (0.412_453 * rl + 0.357_580 * gl + 0.180_423 * bl) / 0.950_456;
    let y = 0.212_671 * rl + 0.715_160 * gl + 0.072_169 * bl;
    let z = (0.019_334 * rl + 0.119_193 * gl + 0.950_227 * bl) / 1.088_754;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let b_star = 200.0 * (fy - fz);

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (b_star + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f64::from(r), f64::from(g), f64::from(b));
    let y = 0.299 * rf + 0.587 * gf + 0.114 * bf;
    let u = 0.492 * (bf - y) + 128.0;
    let v = 0.877 * (rf - y) + 128.0;
    [
        y.round().clamp(0.0, 255.0) as u8,
        u.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    ]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f64::from(r), f64::from(g), f64::from(b));
    let y = 0.299 * rf + 0.587 * gf + 0.114 * bf;
    let cb = 0.564 * (bf - y) + 128.0;
    let cr = 0.713 * (rf - y) + 128.0;
    [
        y.round().clamp(0.0, 255.0) as u8,
        cb.round().clamp(0.0, 255.0) as u8,
        cr.round().clamp(0.0, 255.0) as u8,
    ]
}
