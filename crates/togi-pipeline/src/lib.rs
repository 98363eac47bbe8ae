//! togi-pipeline: deterministic raster preprocessing for OCR (sans-IO).
//!
//! Transforms an in-memory 8-bit raster through fifteen independently
//! toggleable stage groups — geometry, color, denoising, filtering,
//! histogram operations, line removal, morphology, character shaping,
//! enhancement, thresholding, contour filtering, and structural
//! operations — in a fixed canonical order, driven entirely by a
//! [`Config`] record.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! buffers and returns new buffers. Capture, recognition back ends,
//! persistence and any control surface live elsewhere; caching lives in
//! `togi-cache`.
//!
//! [`process`] is a pure function of `(image, config)`: the same input
//! pair always yields a byte-identical output, which is what makes the
//! content-addressed cache in `togi-cache` sound.

pub mod character;
pub mod color;
pub mod config;
pub mod contour;
pub mod denoise;
pub mod enhance;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod histogram;
pub mod lines;
pub mod morphology;
pub mod raster;
pub mod stage;
pub mod structural;
pub mod threshold;

pub use config::{ColorSpace, Config, DistanceNorm, ThresholdKind};
pub use error::PipelineError;
pub use raster::Raster;
pub use stage::{STAGE_COUNT, Stage, stages};

/// Run the full preprocessing pipeline.
///
/// Applies the fifteen stage groups in canonical order, threading each
/// stage's output into the next. The input buffer is never mutated;
/// every stage returns a fresh buffer. With every enable flag off and
/// the color space at its pass-through setting, the output is
/// byte-identical to the input.
///
/// # Errors
///
/// Returns [`PipelineError::NotBinary`] when a stage with a binary
/// precondition (noise-dot removal, contour/component/aspect filtering,
/// distance transform, skeletonization, watershed markers) receives an
/// image with more than two distinct values. No partial result is
/// produced — the whole run aborts.
pub fn process(image: &Raster, config: &Config) -> Result<Raster, PipelineError> {
    let mut working = image.clone();
    for stage in stages(config) {
        working = stage.apply(&working)?;
        tracing::trace!(
            stage = stage.name(),
            width = working.width(),
            height = working.height(),
            channels = working.channel_count(),
            "stage applied"
        );
    }
    Ok(working)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ThresholdConfig;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[allow(clippy::cast_possible_truncation)]
    fn textured_gray(w: u32, h: u32) -> Raster {
        Raster::Gray(GrayImage::from_fn(w, h, |x, y| {
            Luma([((x * 31 + y * 7) % 256) as u8])
        }))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn textured_rgb(w: u32, h: u32) -> Raster {
        Raster::Rgb(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn disabled_pipeline_is_identity_on_gray() {
        let image = textured_gray(32, 24);
        let out = process(&image, &Config::default()).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn disabled_pipeline_is_identity_on_color() {
        let image = textured_rgb(32, 24);
        let out = process(&image, &Config::default()).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn process_is_deterministic() {
        let image = textured_rgb(48, 32);
        let mut config = Config::default();
        config.filter.gaussian = true;
        config.threshold.enabled = true;
        config.threshold.kind = ThresholdKind::Otsu;
        let first = process(&image, &config).unwrap();
        let second = process(&image, &config).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn crop_produces_the_documented_shape() {
        let image = Raster::Rgb(RgbImage::new(100, 100));
        let mut config = Config::default();
        config.crop.enabled = true;
        config.crop.bbox = Some((10, 10, 50, 50));
        let out = process(&image, &config).unwrap();
        assert_eq!((out.width(), out.height(), out.channel_count()), (40, 40, 3));
    }

    #[test]
    fn resize_preserves_aspect_ratio() {
        let image = Raster::Gray(GrayImage::new(1920, 1080));
        let mut config = Config::default();
        config.resize.enabled = true;
        config.resize.width = 960;
        config.resize.maintain_aspect_ratio = true;
        let out = process(&image, &config).unwrap();
        assert_eq!((out.width(), out.height()), (960, 540));
    }

    #[test]
    fn threshold_output_is_two_valued() {
        let image = textured_gray(40, 40);
        let mut config = Config::default();
        config.threshold = ThresholdConfig {
            enabled: true,
            kind: ThresholdKind::Binary,
            value: 127,
            ..ThresholdConfig::default()
        };
        let out = process(&image, &config).unwrap();
        assert!(out.as_bytes().iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn otsu_on_constant_image_does_not_raise() {
        let image = Raster::Gray(GrayImage::from_pixel(20, 20, Luma([130])));
        let mut config = Config::default();
        config.threshold.enabled = true;
        config.threshold.kind = ThresholdKind::Otsu;
        let out = process(&image, &config).unwrap();
        // Fixed-threshold fallback at the default value 127: 130 is above.
        assert!(out.as_bytes().iter().all(|&v| v == 255));
    }

    #[test]
    fn contour_filtering_requires_binary_input() {
        let image = textured_gray(30, 30);
        let mut config = Config::default();
        config.contour.contour_filtering = true;
        let err = process(&image, &config).unwrap_err();
        assert!(matches!(err, PipelineError::NotBinary { .. }));
    }

    #[test]
    fn threshold_satisfies_downstream_binary_preconditions() {
        // Enabled threshold before contour filtering: the full chain
        // runs without a binary-precondition error.
        let image = textured_rgb(40, 40);
        let mut config = Config::default();
        config.threshold.enabled = true;
        config.threshold.kind = ThresholdKind::Otsu;
        config.contour.contour_filtering = true;
        config.contour.connected_components = true;
        config.structural.distance_transform = true;
        let out = process(&image, &config).unwrap();
        assert_eq!(out.channel_count(), 1);
    }

    #[test]
    fn grayscale_color_space_persists_through_the_run() {
        let image = textured_rgb(20, 20);
        let mut config = Config::default();
        config.color.space = ColorSpace::Grayscale;
        let out = process(&image, &config).unwrap();
        assert_eq!(out.channel_count(), 1);
    }

    #[test]
    fn failing_stage_aborts_the_whole_run() {
        // Skeletonization's precondition fails on textured input, even
        // though earlier enabled stages would have succeeded.
        let image = textured_gray(20, 20);
        let mut config = Config::default();
        config.filter.gaussian = true;
        config.structural.skeletonize = true;
        assert!(process(&image, &config).is_err());
    }

    #[test]
    fn full_chain_produces_a_clean_binary_raster() {
        // A denoise -> threshold -> morphology -> speckle-removal chain
        // representative of real OCR preprocessing.
        let mut img = GrayImage::from_pixel(60, 30, Luma([220]));
        for x in 10..50 {
            for y in 12..18 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        img.put_pixel(55, 5, Luma([40])); // speckle

        let mut config = Config::default();
        config.filter.median = true;
        config.filter.median_kernel = 1;
        config.threshold.enabled = true;
        config.threshold.kind = ThresholdKind::BinaryInv;
        config.threshold.value = 127;
        config.character.noise_dots = true;
        config.character.min_dot_area = 5.0;

        let out = process(&Raster::Gray(img), &config).unwrap();
        assert!(out.as_bytes().iter().all(|&v| v == 0 || v == 255));
        match out {
            Raster::Gray(gray) => {
                assert_eq!(gray.get_pixel(30, 15).0[0], 255, "bar should be foreground");
                assert_eq!(gray.get_pixel(55, 5).0[0], 0, "speckle should be removed");
            }
            Raster::Rgb(_) => unreachable!(),
        }
    }
}
