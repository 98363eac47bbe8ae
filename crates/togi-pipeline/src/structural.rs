//! Structural operations: Hough-guided line erasure, intensity
//! normalization, contrast stretching, distance transform,
//! skeletonization, watershed markers, and local binary patterns.
//!
//! The binary-precondition operations (distance transform,
//! skeletonization, watershed markers) go through
//! [`Raster::ensure_binary`] and fail hard on anything else.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use imageproc::morphology::dilate;

use crate::config::{DistanceNorm, StructuralConfig};
use crate::error::PipelineError;
use crate::morphology::{self, ElementShape, StructuringElement};
use crate::raster::{Raster, bitwise_or, count_nonzero, saturating_sub};

/// Apply the structural group in its fixed sub-order: Hough erasure,
/// normalization, contrast stretching, distance transform,
/// skeletonization, watershed markers, local binary patterns.
///
/// # Errors
///
/// Returns [`PipelineError::NotBinary`] when the distance transform,
/// skeletonization or watershed markers receive a non-binary image.
pub fn apply(raster: &Raster, config: &StructuralConfig) -> Result<Raster, PipelineError> {
    let mut image = raster.clone();

    if config.hough_line_removal {
        let erased = hough_erase(
            &image.to_gray(),
            config.hough_threshold,
            config.hough_min_line_length,
            config.hough_max_line_gap,
        );
        image = Raster::Gray(erased);
    }

    if config.normalize {
        image = normalize(&image, config.norm_min, config.norm_max);
    }

    if config.contrast_stretch {
        image = contrast_stretch(
            &image,
            config.stretch_min_percentile,
            config.stretch_max_percentile,
        );
    }

    if config.distance_transform {
        let binary = image.ensure_binary()?;
        let distances = chamfer_distance(&binary, config.distance_norm);
        image = Raster::Gray(normalize_distances(&distances, binary.dimensions()));
    }

    if config.skeletonize {
        let binary = image.ensure_binary()?;
        image = Raster::Gray(skeletonize(&binary, config.skeleton_max_iterations));
    }

    if config.watershed_markers {
        let binary = image.ensure_binary()?;
        image = Raster::Gray(watershed_markers(&binary));
    }

    if config.lbp {
        let gray = image.to_gray();
        image = Raster::Gray(local_binary_patterns(
            &gray,
            config.lbp_points,
            config.lbp_radius,
        ));
    }

    Ok(image)
}

/// Erase straight foreground runs along lines found by the Hough
/// transform.
///
/// The standard transform yields infinite lines; each is walked
/// pixel-by-pixel and only runs of foreground at least `min_length`
/// long — bridging gaps up to `max_gap` — are painted out, two pixels
/// thick.
#[must_use]
pub fn hough_erase(img: &GrayImage, vote_threshold: u32, min_length: u32, max_gap: u32) -> GrayImage {
    let options = LineDetectionOptions {
        vote_threshold,
        suppression_radius: 8,
    };
    let lines = detect_lines(img, options);
    tracing::debug!(line_count = lines.len(), vote_threshold, "hough lines detected");

    let mut out = img.clone();
    for line in lines {
        erase_runs_along(&mut out, &line, min_length, max_gap);
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn erase_runs_along(img: &mut GrayImage, line: &PolarLine, min_length: u32, max_gap: u32) {
    let (w, h) = img.dimensions();
    let theta = f64::from(line.angle_in_degrees).to_radians();
    let (sin, cos) = theta.sin_cos();
    let r = f64::from(line.r);

    // Base point on the line, direction along it.
    let (px, py) = (r * cos, r * sin);
    let (dx, dy) = (-sin, cos);
    let diagonal = f64::from(w).hypot(f64::from(h)).ceil() as i64;

    let at = |t: i64| -> Option<(u32, u32)> {
        let x = (t as f64).mul_add(dx, px).round();
        let y = (t as f64).mul_add(dy, py).round();
        if x >= 0.0 && y >= 0.0 && x < f64::from(w) && y < f64::from(h) {
            Some((x as u32, y as u32))
        } else {
            None
        }
    };

    let mut run_start: Option<i64> = None;
    let mut last_foreground: i64 = 0;

    let flush = |start: Option<i64>, end: i64, img: &mut GrayImage| {
        let Some(start) = start else { return };
        if (end - start).unsigned_abs() + 1 < u64::from(min_length) {
            return;
        }
        for t in start..=end {
            if let Some((x, y)) = at(t) {
                img.put_pixel(x, y, Luma([0]));
                // Two-pixel thickness: erase one perpendicular neighbor.
                let nx = f64::from(x) + cos;
                let ny = f64::from(y) + sin;
                if nx >= 0.0 && ny >= 0.0 && nx < f64::from(w) && ny < f64::from(h) {
                    img.put_pixel(nx.round() as u32, ny.round() as u32, Luma([0]));
                }
            }
        }
    };

    for t in -diagonal..=diagonal {
        let foreground = at(t).is_some_and(|(x, y)| img.get_pixel(x, y).0[0] != 0);
        if foreground {
            if run_start.is_none() {
                run_start = Some(t);
            }
            last_foreground = t;
        } else if run_start.is_some() && (t - last_foreground).unsigned_abs() > u64::from(max_gap) {
            flush(run_start.take(), last_foreground, img);
        }
    }
    flush(run_start.take(), last_foreground, img);
}

/// Linear min-max normalization of the full sample range into
/// `[lo, hi]`. A constant image collapses to `lo`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn normalize(raster: &Raster, lo: u8, hi: u8) -> Raster {
    let bytes = raster.as_bytes();
    let (Some(&min), Some(&max)) = (bytes.iter().min(), bytes.iter().max()) else {
        return raster.clone();
    };
    if max == min {
        return raster.map_samples(|_| lo);
    }
    let scale = (f64::from(hi) - f64::from(lo)) / (f64::from(max) - f64::from(min));
    raster.map_samples(|v| {
        ((f64::from(v) - f64::from(min)).mul_add(scale, f64::from(lo)))
            .round()
            .clamp(0.0, 255.0) as u8
    })
}

/// Percentile-based contrast stretch: the `[p_lo, p_hi]` percentile
/// intensities are remapped linearly onto `[0, 255]` and clipped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
#[must_use]
pub fn contrast_stretch(raster: &Raster, p_lo: f64, p_hi: f64) -> Raster {
    let mut sorted: Vec<u8> = raster.as_bytes().to_vec();
    if sorted.is_empty() {
        return raster.clone();
    }
    sorted.sort_unstable();

    let percentile = |q: f64| -> f64 {
        let clamped = q.clamp(0.0, 100.0);
        let pos = clamped / 100.0 * (sorted.len() - 1) as f64;
        let lower = pos.floor() as usize;
        let upper = pos.ceil() as usize;
        let frac = pos - pos.floor();
        f64::from(sorted[lower]).mul_add(1.0 - frac, f64::from(sorted[upper]) * frac)
    };

    let min = percentile(p_lo);
    let max = percentile(p_hi);
    if max <= min {
        return raster.clone();
    }

    raster.map_samples(|v| ((f64::from(v) - min) * 255.0 / (max - min)).round().clamp(0.0, 255.0) as u8)
}

/// Two-pass 3×3 chamfer distance of every foreground pixel to the
/// nearest background (zero) pixel.
#[must_use]
pub fn chamfer_distance(binary: &GrayImage, norm: DistanceNorm) -> Vec<f64> {
    let (axial, diagonal) = match norm {
        DistanceNorm::L1 => (1.0, 2.0),
        DistanceNorm::L2 => (0.955, 1.3693),
        DistanceNorm::Chessboard => (1.0, 1.0),
    };
    let (w, h) = binary.dimensions();
    let (wi, hi) = (w as usize, h as usize);
    let mut dist = vec![0.0f64; wi * hi];
    for y in 0..h {
        for x in 0..w {
            if binary.get_pixel(x, y).0[0] != 0 {
                dist[y as usize * wi + x as usize] = f64::INFINITY;
            }
        }
    }

    // Forward pass.
    for y in 0..hi {
        for x in 0..wi {
            let mut d = dist[y * wi + x];
            if x > 0 {
                d = d.min(dist[y * wi + x - 1] + axial);
            }
            if y > 0 {
                d = d.min(dist[(y - 1) * wi + x] + axial);
                if x > 0 {
                    d = d.min(dist[(y - 1) * wi + x - 1] + diagonal);
                }
                if x + 1 < wi {
                    d = d.min(dist[(y - 1) * wi + x + 1] + diagonal);
                }
            }
            dist[y * wi + x] = d;
        }
    }

    // Backward pass.
    for y in (0..hi).rev() {
        for x in (0..wi).rev() {
            let mut d = dist[y * wi + x];
            if x + 1 < wi {
                d = d.min(dist[y * wi + x + 1] + axial);
            }
            if y + 1 < hi {
                d = d.min(dist[(y + 1) * wi + x] + axial);
                if x + 1 < wi {
                    d = d.min(dist[(y + 1) * wi + x + 1] + diagonal);
                }
                if x > 0 {
                    d = d.min(dist[(y + 1) * wi + x - 1] + diagonal);
                }
            }
            dist[y * wi + x] = d;
        }
    }

    // An all-foreground image has no background to measure against.
    for d in &mut dist {
        if !d.is_finite() {
            *d = 0.0;
        }
    }
    dist
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalize_distances(dist: &[f64], (w, h): (u32, u32)) -> GrayImage {
    let max = dist.iter().copied().fold(0.0f64, f64::max);
    GrayImage::from_fn(w, h, |x, y| {
        let d = dist[y as usize * w as usize + x as usize];
        if max > 0.0 {
            Luma([(d * 255.0 / max).round().clamp(0.0, 255.0) as u8])
        } else {
            Luma([0])
        }
    })
}

/// Morphological skeletonization with a 3×3 cross element.
///
/// Each iteration accumulates the residual between the working image
/// and its opening, then replaces the working image with its erosion.
/// The loop ends when no foreground remains — or at `max_iterations`,
/// which bounds inputs whose borders never erode.
#[must_use]
pub fn skeletonize(binary: &GrayImage, max_iterations: u32) -> GrayImage {
    let element = StructuringElement::new(ElementShape::Cross, 3, 3);
    let mut skeleton = GrayImage::new(binary.width(), binary.height());
    let mut working = binary.clone();

    for _ in 0..max_iterations.max(1) {
        let eroded = morphology::erode(&working, &element);
        let opened = morphology::dilate(&eroded, &element);
        let residual = saturating_sub(&working, &opened);
        skeleton = bitwise_or(&skeleton, &residual);
        working = eroded;
        if count_nonzero(&working) == 0 {
            break;
        }
    }
    skeleton
}

/// Watershed seed markers: the ambiguous boundary region between a
/// dilated "sure background" estimate and a distance-transform-derived
/// "sure foreground" core.
#[must_use]
pub fn watershed_markers(binary: &GrayImage) -> GrayImage {
    // Normalize foreground to 255 so the binary dilation is well-defined
    // for any two-valued input.
    let foreground = GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        Luma([if binary.get_pixel(x, y).0[0] != 0 { 255 } else { 0 }])
    });

    let sure_background = dilate(&foreground, Norm::LInf, 3);

    let dist = chamfer_distance(&foreground, DistanceNorm::L2);
    let max = dist.iter().copied().fold(0.0f64, f64::max);
    let cutoff = 0.7 * max;
    let w = foreground.width() as usize;
    let sure_foreground = GrayImage::from_fn(foreground.width(), foreground.height(), |x, y| {
        Luma([if dist[y as usize * w + x as usize] > cutoff {
            255
        } else {
            0
        }])
    });

    saturating_sub(&sure_background, &sure_foreground)
}

/// Rotation-invariant uniform local binary patterns, rescaled to 0–255.
///
/// Each pixel compares `points` samples on a circle of `radius`
/// (bilinear interpolation) against its center. Patterns with at most
/// two 0/1 transitions map to their popcount; the rest collapse into
/// the single non-uniform bucket `points + 1`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
#[must_use]
pub fn local_binary_patterns(img: &GrayImage, points: u32, radius: u32) -> GrayImage {
    let points = points.clamp(4, 32) as usize;
    let radius = f64::from(radius.max(1));
    let (w, h) = img.dimensions();

    let sample = |fx: f64, fy: f64| -> f64 {
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let fetch = |x: f64, y: f64| -> f64 {
            let cx = (x.max(0.0) as u32).min(w - 1);
            let cy = (y.max(0.0) as u32).min(h - 1);
            f64::from(img.get_pixel(cx, cy).0[0])
        };
        let top = fetch(x0, y0).mul_add(1.0 - tx, fetch(x0 + 1.0, y0) * tx);
        let bottom = fetch(x0, y0 + 1.0).mul_add(1.0 - tx, fetch(x0 + 1.0, y0 + 1.0) * tx);
        top.mul_add(1.0 - ty, bottom * ty)
    };

    let mut codes = GrayImage::new(w, h);
    let mut max_code = 0u8;
    for y in 0..h {
        for x in 0..w {
            let center = f64::from(img.get_pixel(x, y).0[0]);
            let mut bits = vec![false; points];
            for (p, bit) in bits.iter_mut().enumerate() {
                let angle = 2.0 * std::f64::consts::PI * p as f64 / points as f64;
                let sx = f64::from(x) + radius * angle.cos();
                let sy = f64::from(y) + radius * angle.sin();
                *bit = sample(sx, sy) >= center;
            }

            let transitions = (0..points)
                .filter(|&p| bits[p] != bits[(p + 1) % points])
                .count();
            let code = if transitions <= 2 {
                bits.iter().filter(|&&b| b).count() as u8
            } else {
                (points + 1) as u8
            };
            max_code = max_code.max(code);
            codes.put_pixel(x, y, Luma([code]));
        }
    }

    if max_code == 0 {
        return codes;
    }
    let scale = 255.0 / f64::from(max_code);
    GrayImage::from_fn(w, h, |x, y| {
        Luma([(f64::from(codes.get_pixel(x, y).0[0]) * scale) as u8])
    })
}
