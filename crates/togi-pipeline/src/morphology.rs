//! Flat grayscale morphology over arbitrary structuring elements.
//!
//! Erosion and dilation are plain min/max filters over the element's
//! footprint; out-of-bounds neighbors do not constrain the result. The
//! compound operations (open, close, top-hat, black-hat, gradient) are
//! built from those two primitives with saturating arithmetic.
//!
//! `imageproc`'s morphology module operates on binary images with
//! norm-ball elements only; the pipeline needs grayscale behavior over
//! rectangular, elliptical and cross-shaped elements, so the footprint
//! sweep lives here.

use image::{GrayImage, Luma};

use crate::config::{AdvancedMorphologyConfig, MorphologyConfig};
use crate::raster::{Raster, saturating_sub};

/// Footprint shape of a structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementShape {
    /// Full `w × h` rectangle.
    Rect,
    /// Inscribed ellipse.
    Ellipse,
    /// Center row plus center column.
    Cross,
}

/// A structuring element: a set of offsets around an anchor pixel.
#[derive(Debug, Clone)]
pub struct StructuringElement {
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// Build an element of the given shape and size. Zero dimensions
    /// are bumped to one so the element always covers its anchor.
    #[must_use]
    pub fn new(shape: ElementShape, width: u32, height: u32) -> Self {
        let w = width.max(1);
        let h = height.max(1);
        let offsets = match shape {
            ElementShape::Rect => rect_offsets(w, h),
            ElementShape::Ellipse => ellipse_offsets(w, h),
            ElementShape::Cross => cross_offsets(w, h),
        };
        Self { offsets }
    }

    /// Square ellipse of the given size — the most common case.
    #[must_use]
    pub fn ellipse(size: u32) -> Self {
        Self::new(ElementShape::Ellipse, size, size)
    }

    /// The offset footprint relative to the anchor.
    #[must_use]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

#[allow(clippy::cast_possible_wrap)]
fn rect_offsets(w: u32, h: u32) -> Vec<(i32, i32)> {
    let (cx, cy) = ((w / 2) as i32, (h / 2) as i32);
    let mut offsets = Vec::with_capacity((w * h) as usize);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            offsets.push((x - cx, y - cy));
        }
    }
    offsets
}

/// Elliptical footprint, rasterized row-by-row the way the original
/// system's structuring elements are: for each row, the half-width is
/// `c * sqrt(1 - dy^2 / r^2)` with integer semi-axes `c = w/2`, `r = h/2`.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
fn ellipse_offsets(w: u32, h: u32) -> Vec<(i32, i32)> {
    let (c, r) = ((w / 2) as i32, (h / 2) as i32);
    let inv_r2 = if r > 0 { 1.0 / f64::from(r * r) } else { 0.0 };
    let mut offsets = Vec::new();
    for y in 0..h as i32 {
        let dy = y - r;
        if dy.abs() > r {
            continue;
        }
        let dx = (f64::from(c) * (f64::from(r * r - dy * dy) * inv_r2).sqrt()).round() as i32;
        let x1 = (c - dx).max(0);
        let x2 = (c + dx + 1).min(w as i32);
        for x in x1..x2 {
            offsets.push((x - c, dy));
        }
    }
    if offsets.is_empty() {
        offsets.push((0, 0));
    }
    offsets
}

#[allow(clippy::cast_possible_wrap)]
fn cross_offsets(w: u32, h: u32) -> Vec<(i32, i32)> {
    let (cx, cy) = ((w / 2) as i32, (h / 2) as i32);
    let mut offsets = Vec::new();
    for x in 0..w as i32 {
        offsets.push((x - cx, 0));
    }
    for y in 0..h as i32 {
        if y != cy {
            offsets.push((0, y - cy));
        }
    }
    offsets
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn sweep(img: &GrayImage, element: &StructuringElement, init: u8, pick: impl Fn(u8, u8) -> u8) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = init;
        for &(dx, dy) in element.offsets() {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx >= 0 && ny >= 0 && nx < w as i32 && ny < h as i32 {
                #[allow(clippy::cast_sign_loss)]
                let v = img.get_pixel(nx as u32, ny as u32).0[0];
                acc = pick(acc, v);
            }
        }
        Luma([acc])
    })
}

/// Grayscale erosion: minimum over the element footprint.
#[must_use]
pub fn erode(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    sweep(img, element, u8::MAX, u8::min)
}

/// Grayscale dilation: maximum over the element footprint.
#[must_use]
pub fn dilate(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    sweep(img, element, u8::MIN, u8::max)
}

/// Opening: erosion followed by dilation.
#[must_use]
pub fn open(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(img, element), element)
}

/// Closing: dilation followed by erosion.
#[must_use]
pub fn close(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(img, element), element)
}

/// Top-hat: image minus its opening. Isolates small bright structures.
#[must_use]
pub fn tophat(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    saturating_sub(img, &open(img, element))
}

/// Black-hat: closing minus the image. Isolates small dark structures.
#[must_use]
pub fn blackhat(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    saturating_sub(&close(img, element), img)
}

/// Morphological gradient: dilation minus erosion.
#[must_use]
pub fn gradient(img: &GrayImage, element: &StructuringElement) -> GrayImage {
    saturating_sub(&dilate(img, element), &erode(img, element))
}

/// Apply the basic morphology group: stroke-width normalization
/// followed by the general open/close pass.
#[must_use]
pub fn apply_basic(raster: &Raster, config: &MorphologyConfig) -> Raster {
    let mut image = raster.clone();

    if config.stroke_normalization {
        let element = StructuringElement::ellipse(2);
        let iterations = config.stroke_iterations;
        image = image.per_channel(|plane| {
            let mut out = plane.clone();
            for _ in 0..iterations {
                out = close(&out, &element);
            }
            out
        });
    }

    if config.enabled {
        let element = StructuringElement::ellipse(config.kernel_size.max(1));
        if config.open {
            image = image.per_channel(|plane| open(plane, &element));
        }
        if config.close {
            image = image.per_channel(|plane| close(plane, &element));
        }
    }

    image
}

/// Apply the advanced morphology group: top-hat, black-hat, gradient.
/// The primary `gradient` toggle takes precedence over the secondary
/// `morph_gradient` one.
#[must_use]
pub fn apply_advanced(raster: &Raster, config: &AdvancedMorphologyConfig) -> Raster {
    let mut image = raster.clone();

    if config.tophat {
        let element = StructuringElement::ellipse(config.tophat_kernel.max(1));
        image = image.per_channel(|plane| tophat(plane, &element));
    }

    if config.blackhat {
        let element = StructuringElement::ellipse(config.blackhat_kernel.max(1));
        image = image.per_channel(|plane| blackhat(plane, &element));
    }

    if config.gradient {
        let element = StructuringElement::ellipse(config.gradient_kernel.max(1));
        image = image.per_channel(|plane| gradient(plane, &element));
    } else if config.morph_gradient {
        let element = StructuringElement::ellipse(config.morph_gradient_kernel.max(1));
        image = image.per_channel(|plane| gradient(plane, &element));
    }

    image
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::count_nonzero;

    fn white_square(canvas: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        let mut img = GrayImage::new(canvas, canvas);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        img
    }

    #[test]
    fn rect_footprint_is_full() {
        let se = StructuringElement::new(ElementShape::Rect, 3, 3);
        assert_eq!(se.offsets().len(), 9);
    }

    #[test]
    fn cross_footprint_is_row_plus_column() {
        let se = StructuringElement::new(ElementShape::Cross, 3, 3);
        assert_eq!(se.offsets().len(), 5);
    }

    #[test]
    fn ellipse_3x3_is_cross_shaped() {
        let se = StructuringElement::ellipse(3);
        let mut offsets = se.offsets().to_vec();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![(-1, 0), (0, -1), (0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn degenerate_element_covers_anchor() {
        let se = StructuringElement::new(ElementShape::Ellipse, 0, 0);
        assert_eq!(se.offsets(), &[(0, 0)]);
    }

    #[test]
    fn erosion_shrinks_a_square() {
        let img = white_square(10, 3, 3, 4);
        let eroded = erode(&img, &StructuringElement::new(ElementShape::Rect, 3, 3));
        assert_eq!(count_nonzero(&eroded), 4); // 4x4 shrinks to 2x2
    }

    #[test]
    fn dilation_grows_a_square() {
        let img = white_square(10, 3, 3, 4);
        let dilated = dilate(&img, &StructuringElement::new(ElementShape::Rect, 3, 3));
        assert_eq!(count_nonzero(&dilated), 36); // 4x4 grows to 6x6
    }

    #[test]
    fn opening_removes_an_isolated_pixel() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, Luma([255]));
        let opened = open(&img, &StructuringElement::new(ElementShape::Rect, 3, 3));
        assert_eq!(count_nonzero(&opened), 0);
    }

    #[test]
    fn closing_fills_an_isolated_hole() {
        let mut img = white_square(9, 1, 1, 7);
        img.put_pixel(4, 4, Luma([0]));
        let closed = close(&img, &StructuringElement::new(ElementShape::Rect, 3, 3));
        assert_eq!(closed.get_pixel(4, 4).0[0], 255);
    }

    #[test]
    fn tophat_of_flat_image_is_zero() {
        let img = GrayImage::from_pixel(8, 8, Luma([120]));
        let out = tophat(&img, &StructuringElement::ellipse(3));
        assert_eq!(count_nonzero(&out), 0);
    }

    #[test]
    fn blackhat_of_flat_image_is_zero() {
        let img = GrayImage::from_pixel(8, 8, Luma([120]));
        let out = blackhat(&img, &StructuringElement::ellipse(3));
        assert_eq!(count_nonzero(&out), 0);
    }

    #[test]
    fn gradient_marks_edges_only() {
        let img = white_square(10, 3, 3, 4);
        let out = gradient(&img, &StructuringElement::new(ElementShape::Rect, 3, 3));
        // Interior of the square is flat, so the gradient is hollow.
        assert_eq!(out.get_pixel(4, 4).0[0], 0);
        assert!(out.get_pixel(2, 3).0[0] > 0);
    }

    #[test]
    fn erosion_ignores_out_of_bounds_neighbors() {
        // A white border pixel survives erosion if its in-bounds
        // neighborhood is entirely white.
        let img = GrayImage::from_pixel(5, 5, Luma([255]));
        let eroded = erode(&img, &StructuringElement::new(ElementShape::Rect, 3, 3));
        assert_eq!(eroded.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn basic_group_disabled_is_identity() {
        let img = Raster::Gray(white_square(10, 3, 3, 4));
        assert_eq!(apply_basic(&img, &MorphologyConfig::default()), img);
    }

    #[test]
    fn basic_group_open_drops_speckles() {
        let mut img = white_square(12, 3, 3, 5);
        img.put_pixel(10, 10, Luma([255]));
        let config = MorphologyConfig {
            enabled: true,
            kernel_size: 3,
            open: true,
            close: false,
            ..MorphologyConfig::default()
        };
        let out = apply_basic(&Raster::Gray(img), &config);
        match out {
            Raster::Gray(gray) => {
                assert_eq!(gray.get_pixel(10, 10).0[0], 0, "speckle should be opened away");
                assert_eq!(gray.get_pixel(5, 5).0[0], 255, "blob core should remain");
            }
            Raster::Rgb(_) => unreachable!(),
        }
    }

    #[test]
    fn stroke_normalization_fills_pinholes() {
        let mut img = white_square(9, 1, 1, 7);
        img.put_pixel(4, 4, Luma([0]));
        let config = MorphologyConfig {
            stroke_normalization: true,
            stroke_iterations: 2,
            ..MorphologyConfig::default()
        };
        let out = apply_basic(&Raster::Gray(img), &config);
        match out {
            Raster::Gray(gray) => assert_eq!(gray.get_pixel(4, 4).0[0], 255),
            Raster::Rgb(_) => unreachable!(),
        }
    }

    #[test]
    fn advanced_group_disabled_is_identity() {
        let img = Raster::Gray(white_square(10, 3, 3, 4));
        assert_eq!(apply_advanced(&img, &AdvancedMorphologyConfig::default()), img);
    }

    #[test]
    fn gradient_takes_precedence_over_the_secondary_toggle() {
        let img = Raster::Gray(white_square(12, 3, 3, 5));
        let both = AdvancedMorphologyConfig {
            gradient: true,
            gradient_kernel: 3,
            morph_gradient: true,
            morph_gradient_kernel: 7,
            ..AdvancedMorphologyConfig::default()
        };
        let primary_only = AdvancedMorphologyConfig {
            gradient: true,
            gradient_kernel: 3,
            ..AdvancedMorphologyConfig::default()
        };
        assert_eq!(
            apply_advanced(&img, &both),
            apply_advanced(&img, &primary_only),
        );
    }

    #[test]
    fn tophat_stage_isolates_small_bright_detail() {
        let mut img = GrayImage::from_pixel(12, 12, Luma([40]));
        img.put_pixel(6, 6, Luma([200]));
        let config = AdvancedMorphologyConfig {
            tophat: true,
            tophat_kernel: 3,
            ..AdvancedMorphologyConfig::default()
        };
        let out = apply_advanced(&Raster::Gray(img), &config);
        match out {
            Raster::Gray(gray) => {
                assert!(gray.get_pixel(6, 6).0[0] > 0, "bright detail should be isolated");
                assert_eq!(gray.get_pixel(1, 1).0[0], 0, "flat background should vanish");
            }
            Raster::Rgb(_) => unreachable!(),
        }
    }
}
