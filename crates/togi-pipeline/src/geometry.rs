//! Geometric operations: crop and resize.
//!
//! Both operations are total: a degenerate or out-of-range crop box is
//! clamped into the image and skipped entirely if nothing remains, and a
//! resize to the current size is a no-op. Neither ever fails.

use image::imageops::{self, FilterType};

use crate::config::ResizeConfig;
use crate::raster::Raster;

/// Crop to the `(x1, y1, x2, y2)` box, clamped into the image bounds.
///
/// A box that is degenerate after clamping (non-positive width or
/// height) leaves the image unchanged.
#[must_use]
pub fn crop(raster: &Raster, bbox: (i32, i32, i32, i32)) -> Raster {
    let (w, h) = (raster.width(), raster.height());
    let (x1, y1, x2, y2) = bbox;

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    let x1 = x1.clamp(0, w as i32) as u32;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    let y1 = y1.clamp(0, h as i32) as u32;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    let x2 = x2.clamp(0, w as i32) as u32;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    let y2 = y2.clamp(0, h as i32) as u32;

    if x2 <= x1 || y2 <= y1 {
        return raster.clone();
    }

    match raster {
        Raster::Gray(img) => {
            Raster::Gray(imageops::crop_imm(img, x1, y1, x2 - x1, y2 - y1).to_image())
        }
        Raster::Rgb(img) => {
            Raster::Rgb(imageops::crop_imm(img, x1, y1, x2 - x1, y2 - y1).to_image())
        }
    }
}

/// Resize to the configured target extent.
///
/// With `maintain_aspect_ratio`, the scale comes from the dominant axis:
/// a landscape image is fitted to the target width, a portrait (or
/// square) image to the target height, and the other axis follows the
/// source aspect ratio. Any axis that grows is resampled with Lanczos3;
/// a pure shrink uses area-averaging (Triangle). Resizing to the current
/// size is a no-op.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn resize(raster: &Raster, config: &ResizeConfig) -> Raster {
    let (w, h) = (raster.width(), raster.height());
    if w == 0 || h == 0 {
        return raster.clone();
    }

    let (new_w, new_h) = if config.maintain_aspect_ratio {
        let aspect = f64::from(w) / f64::from(h);
        if aspect > 1.0 {
            (config.width, (f64::from(config.width) / aspect) as u32)
        } else {
            ((f64::from(config.height) * aspect) as u32, config.height)
        }
    } else {
        (config.width, config.height)
    };
    let (new_w, new_h) = (new_w.max(1), new_h.max(1));

    if (new_w, new_h) == (w, h) {
        return raster.clone();
    }

    let filter = if w < new_w || h < new_h {
        FilterType::Lanczos3
    } else {
        FilterType::Triangle
    };

    match raster {
        Raster::Gray(img) => Raster::Gray(imageops::resize(img, new_w, new_h, filter)),
        Raster::Rgb(img) => Raster::Rgb(imageops::resize(img, new_w, new_h, filter)),
    }
}
