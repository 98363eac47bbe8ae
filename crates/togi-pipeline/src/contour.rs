//! Contour and connected-component filtering.
//!
//! Every operation here requires a binary image (see
//! [`Raster::ensure_binary`]): blobs are measured, the ones whose
//! property falls inside the configured inclusive range are drawn into a
//! keep-mask, and the mask is intersected with the working image.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::config::ContourConfig;
use crate::error::PipelineError;
use crate::raster::{Raster, bitwise_and};

/// Apply the contour-filtering group in its fixed sub-order: contour
/// area, connected components, aspect ratio.
///
/// # Errors
///
/// Returns [`PipelineError::NotBinary`] when any enabled filter receives
/// an image with more than two distinct values.
pub fn apply(raster: &Raster, config: &ContourConfig) -> Result<Raster, PipelineError> {
    let mut image = raster.clone();

    if config.contour_filtering {
        let binary = image.ensure_binary()?;
        let mut mask = GrayImage::new(binary.width(), binary.height());
        for contour in external_contours(&binary) {
            let area = contour_area(&contour.points);
            if config.area_min <= area && area <= config.area_max {
                fill_contour(&mut mask, &contour.points, 255);
            }
        }
        image = Raster::Gray(bitwise_and(&binary, &mask));
    }

    if config.connected_components {
        let binary = image.ensure_binary()?;
        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

        let mut areas: Vec<u32> = Vec::new();
        for px in labels.pixels() {
            let label = px.0[0] as usize;
            if label == 0 {
                continue;
            }
            if areas.len() < label {
                areas.resize(label, 0);
            }
            areas[label - 1] += 1;
        }

        let mask = GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
            let label = labels.get_pixel(x, y).0[0] as usize;
            if label == 0 {
                return Luma([0]);
            }
            let area = areas[label - 1];
            if config.component_min_area <= area && area <= config.component_max_area {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        image = Raster::Gray(bitwise_and(&binary, &mask));
    }

    if config.aspect_ratio {
        let binary = image.ensure_binary()?;
        let mut mask = GrayImage::new(binary.width(), binary.height());
        for contour in external_contours(&binary) {
            let ratio = bounding_box_aspect(&contour.points);
            if config.aspect_min <= ratio && ratio <= config.aspect_max {
                fill_contour(&mut mask, &contour.points, 255);
            }
        }
        image = Raster::Gray(bitwise_and(&binary, &mask));
    }

    Ok(image)
}

/// Outermost contours only — holes and nested borders are skipped.
pub(crate) fn external_contours(binary: &GrayImage) -> Vec<Contour<u32>> {
    find_contours::<u32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Contour area by the shoelace formula over the boundary polygon.
#[must_use]
pub(crate) fn contour_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        doubled += f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
    }
    doubled.abs() / 2.0
}

/// Width/height ratio of the contour's bounding box; 0 when degenerate.
#[must_use]
pub(crate) fn bounding_box_aspect(points: &[Point<u32>]) -> f64 {
    let Some(first) = points.first() else {
        return 0.0;
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let w = max_x - min_x + 1;
    let h = max_y - min_y + 1;
    if h == 0 { 0.0 } else { f64::from(w) / f64::from(h) }
}

/// Paint a filled contour into a single-channel canvas.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn fill_contour(canvas: &mut GrayImage, points: &[Point<u32>], value: u8) {
    let mut poly: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        let q = Point::new(p.x as i32, p.y as i32);
        if poly.last() != Some(&q) {
            poly.push(q);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }

    if poly.len() >= 3 {
        draw_polygon_mut(canvas, &poly, Luma([value]));
    } else {
        #[allow(clippy::cast_sign_loss)]
        for p in poly {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < canvas.width() && (p.y as u32) < canvas.height()
            {
                canvas.put_pixel(p.x as u32, p.y as u32, Luma([value]));
            }
        }
    }
}
