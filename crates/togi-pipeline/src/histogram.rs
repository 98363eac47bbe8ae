//! Histogram and contrast operations.
//!
//! Everything in this group operates on single-channel images only; a
//! color buffer passes through untouched, exactly as the enclosing
//! configuration left it. Global equalization wraps `imageproc`; CLAHE
//! and multi-class Otsu have no `imageproc` counterpart and are
//! implemented here.

use image::{GrayImage, Luma};
use imageproc::contrast::equalize_histogram;

use crate::config::HistogramConfig;
use crate::raster::Raster;

/// Apply the histogram group in its fixed sub-order: equalization,
/// CLAHE (or the plain adaptive variant when CLAHE is off), multi-Otsu.
#[must_use]
pub fn apply(raster: &Raster, config: &HistogramConfig) -> Raster {
    let mut image = raster.clone();

    if config.equalization
        && let Raster::Gray(plane) = &image
    {
        image = Raster::Gray(equalize_histogram(plane));
    }

    if config.clahe {
        if let Raster::Gray(plane) = &image {
            image = Raster::Gray(clahe(plane, config.clahe_clip_limit, config.clahe_tile_size));
        }
    } else if config.adaptive_eq
        && let Raster::Gray(plane) = &image
    {
        image = Raster::Gray(clahe(plane, 2.0, config.adaptive_eq_tile_size));
    }

    if config.multi_otsu
        && let Raster::Gray(plane) = &image
    {
        image = Raster::Gray(multi_otsu(plane, config.multi_otsu_classes));
    }

    image
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is divided into a `tiles × tiles` grid; each tile gets a
/// clipped, redistributed histogram and an equalization LUT, and every
/// pixel is remapped by bilinear interpolation between the four nearest
/// tile LUTs.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn clahe(img: &GrayImage, clip_limit: f64, tiles: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let tiles = tiles.clamp(1, w.min(h).max(1));
    let tile_w = w.div_ceil(tiles);
    let tile_h = h.div_ceil(tiles);

    // Per-tile equalization LUTs.
    let mut luts = vec![[0u8; 256]; (tiles * tiles) as usize];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u64; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[usize::from(img.get_pixel(x, y).0[0])] += 1;
                }
            }
            let area = u64::from((x1 - x0) * (y1 - y0)).max(1);

            // Clip and redistribute the excess uniformly.
            let limit = ((clip_limit * area as f64 / 256.0) as u64).max(1);
            let mut excess = 0u64;
            for bin in &mut hist {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let bonus = excess / 256;
            let mut remainder = excess % 256;
            for bin in &mut hist {
                *bin += bonus;
                if remainder > 0 {
                    *bin += 1;
                    remainder -= 1;
                }
            }

            let scale = 255.0 / area as f64;
            let mut cumulative = 0u64;
            let lut = &mut luts[(ty * tiles + tx) as usize];
            for (v, &count) in hist.iter().enumerate() {
                cumulative += count;
                lut[v] = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let last = (tiles - 1) as i64;
    GrayImage::from_fn(w, h, |x, y| {
        let value = usize::from(img.get_pixel(x, y).0[0]);

        // Position in tile-center space.
        let gx = (f64::from(x) + 0.5) / f64::from(tile_w) - 0.5;
        let gy = (f64::from(y) + 0.5) / f64::from(tile_h) - 0.5;
        let x0 = (gx.floor() as i64).clamp(0, last);
        let y0 = (gy.floor() as i64).clamp(0, last);
        let x1 = (x0 + 1).min(last);
        let y1 = (y0 + 1).min(last);
        let fx = (gx - gx.floor()).clamp(0.0, 1.0);
        let fy = (gy - gy.floor()).clamp(0.0, 1.0);

        let at = |tx: i64, ty: i64| -> f64 {
            f64::from(luts[(ty as u32 * tiles + tx as u32) as usize][value])
        };
        let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
        let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
        let blended = top * (1.0 - fy) + bottom * fy;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Multi-class Otsu quantization.
///
/// Finds the `classes - 1` thresholds that maximize between-class
/// variance, buckets every pixel by those thresholds, and remaps bucket
/// indices onto 0–255 evenly spaced by `255 / (classes - 1)`. Classes
/// are clamped to 2–4 to keep the exhaustive threshold search bounded.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn multi_otsu(img: &GrayImage, classes: u32) -> GrayImage {
    let classes = classes.clamp(2, 4) as usize;
    let thresholds = otsu_thresholds(img, classes - 1);
    let step = 255 / (classes as u32 - 1);

    let mut lut = [0u8; 256];
    for (v, entry) in lut.iter_mut().enumerate() {
        let region = thresholds.iter().filter(|&&t| v as u8 >= t).count() as u32;
        *entry = (region * step).min(255) as u8;
    }
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([lut[usize::from(img.get_pixel(x, y).0[0])]])
    })
}

/// Exhaustive search for the `count` thresholds maximizing between-class
/// variance (the sum of `weight * mean^2` over classes).
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn otsu_thresholds(img: &GrayImage, count: usize) -> Vec<u8> {
    let mut hist = [0f64; 256];
    for px in img.pixels() {
        hist[usize::from(px.0[0])] += 1.0;
    }

    // Prefix sums of counts and intensity mass.
    let mut cum_count = [0f64; 257];
    let mut cum_mass = [0f64; 257];
    for i in 0..256 {
        cum_count[i + 1] = cum_count[i] + hist[i];
        cum_mass[i + 1] = cum_mass[i] + hist[i] * i as f64;
    }

    // Score of the class covering intensities [lo, hi).
    let class_score = |lo: usize, hi: usize| -> f64 {
        let weight = cum_count[hi] - cum_count[lo];
        if weight <= 0.0 {
            return 0.0;
        }
        let mean = (cum_mass[hi] - cum_mass[lo]) / weight;
        weight * mean * mean
    };

    let mut best: Vec<usize> = (1..=count).collect();
    let mut best_score = f64::MIN;
    let mut current = vec![0usize; count];

    fn search(
        depth: usize,
        start: usize,
        count: usize,
        current: &mut Vec<usize>,
        best: &mut Vec<usize>,
        best_score: &mut f64,
        class_score: &dyn Fn(usize, usize) -> f64,
    ) {
        if depth == count {
            let mut score = 0.0;
            let mut lo = 0;
            for &t in current.iter() {
                score += class_score(lo, t);
                lo = t;
            }
            score += class_score(lo, 256);
            if score > *best_score {
                *best_score = score;
                best.clone_from(current);
            }
            return;
        }
        for t in start..256 - (count - depth - 1) {
            current[depth] = t;
            search(depth + 1, t + 1, count, current, best, best_score, class_score);
        }
    }

    search(0, 1, count, &mut current, &mut best, &mut best_score, &class_score);
    best.into_iter().map(|t| t as u8).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn disabled_group_is_identity() {
        let img = Raster::Gray(GrayImage::from_pixel(8, 8, Luma([100])));
        assert_eq!(apply(&img, &HistogramConfig::default()), img);
    }

    #[test]
    fn color_input_passes_through() {
        let img = Raster::Rgb(RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30])));
        let config = HistogramConfig {
            equalization: true,
            clahe: true,
            multi_otsu: true,
            ..HistogramConfig::default()
        };
        assert_eq!(apply(&img, &config), img);
    }

    #[test]
    fn equalization_spreads_a_narrow_histogram() {
        let img = GrayImage::from_fn(16, 16, |x, _| {
            if x < 8 { Luma([100]) } else { Luma([110]) }
        });
        let config = HistogramConfig {
            equalization: true,
            ..HistogramConfig::default()
        };
        let out = apply(&Raster::Gray(img), &config);
        let bytes = out.as_bytes();
        let min = bytes.iter().min().unwrap();
        let max = bytes.iter().max().unwrap();
        assert!(max - min > 10, "equalization should widen the range");
    }

    #[test]
    fn clahe_preserves_dimensions_and_stays_in_range() {
        let img = GrayImage::from_fn(32, 24, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (32, 24));
    }

    #[test]
    fn clahe_improves_local_contrast() {
        // Dark left half with faint texture, bright right half.
        let img = GrayImage::from_fn(32, 32, |x, y| {
            if x < 16 {
                Luma([20 + ((x + y) % 2) as u8 * 10])
            } else {
                Luma([200])
            }
        });
        let out = clahe(&img, 4.0, 4);
        // The faint dark-side texture should spread over a wider range.
        let mut dark: Vec<u8> = Vec::new();
        for y in 0..32 {
            for x in 0..12 {
                dark.push(out.get_pixel(x, y).0[0]);
            }
        }
        let min = *dark.iter().min().unwrap();
        let max = *dark.iter().max().unwrap();
        assert!(max - min >= 20, "local contrast should increase, got {min}..{max}");
    }

    #[test]
    fn clahe_on_tiny_image_does_not_panic() {
        let img = GrayImage::from_pixel(3, 3, Luma([128]));
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (3, 3));
    }

    #[test]
    fn multi_otsu_quantizes_three_clusters() {
        let img = GrayImage::from_fn(30, 30, |x, _| {
            if x < 10 {
                Luma([30])
            } else if x < 20 {
                Luma([128])
            } else {
                Luma([220])
            }
        });
        let out = multi_otsu(&img, 3);
        let distinct = Raster::Gray(out.clone()).count_distinct();
        assert_eq!(distinct, 3);
        // Classes remap to multiples of 255 / (classes - 1) = 127.
        for px in out.pixels() {
            assert!(matches!(px.0[0], 0 | 127 | 254));
        }
    }

    #[test]
    fn multi_otsu_two_classes_is_binary() {
        let img = GrayImage::from_fn(20, 20, |x, _| {
            if x < 10 { Luma([40]) } else { Luma([200]) }
        });
        let out = multi_otsu(&img, 2);
        for px in out.pixels() {
            assert!(matches!(px.0[0], 0 | 255));
        }
    }

    #[test]
    fn multi_otsu_clamps_degenerate_class_count() {
        let img = GrayImage::from_fn(10, 10, |x, _| {
            if x < 5 { Luma([40]) } else { Luma([200]) }
        });
        // classes = 0 and 1 would divide by zero unclamped.
        let out = multi_otsu(&img, 0);
        assert_eq!(out.dimensions(), (10, 10));
    }
}
