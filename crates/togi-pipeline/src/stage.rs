//! Stage dispatch: one tagged variant per stage group, applied in the
//! canonical order.
//!
//! Each variant carries only its own group's configuration, so a stage
//! can be constructed and unit-tested in isolation without threading
//! the whole [`Config`] through. [`stages`] lays the fifteen groups out
//! in the fixed order the engine runs them; order matters — crop runs
//! before resize, denoising before sharpening, and thresholding before
//! every stage with a binary precondition.

use crate::config::{
    AdvancedMorphologyConfig, CharacterConfig, ColorConfig, Config, ContourConfig, CropConfig,
    DenoiseConfig, EnhanceConfig, FilterConfig, GammaConfig, HistogramConfig, LineRemovalConfig,
    MorphologyConfig, ResizeConfig, StructuralConfig, ThresholdConfig,
};
use crate::error::PipelineError;
use crate::raster::Raster;
use crate::{
    character, color, contour, denoise, enhance, filter, geometry, histogram, lines, morphology,
    structural, threshold,
};

/// Total number of stage groups in the pipeline.
pub const STAGE_COUNT: usize = 15;

/// One pipeline stage group, carrying its own configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Crop to a bounding box.
    Crop(CropConfig),
    /// Resize to a target extent.
    Resize(ResizeConfig),
    /// Color-space conversion.
    ColorSpace(ColorConfig),
    /// Gamma correction.
    Gamma(GammaConfig),
    /// Denoising.
    Denoise(DenoiseConfig),
    /// Linear/nonlinear filters.
    Filter(FilterConfig),
    /// Histogram and contrast operations.
    Histogram(HistogramConfig),
    /// Ruled-line removal.
    LineRemoval(LineRemovalConfig),
    /// Basic morphology.
    Morphology(MorphologyConfig),
    /// Character-shape operations.
    Character(CharacterConfig),
    /// Enhancement.
    Enhance(EnhanceConfig),
    /// Thresholding.
    Threshold(ThresholdConfig),
    /// Advanced morphology.
    AdvancedMorphology(AdvancedMorphologyConfig),
    /// Contour and connected-component filtering.
    ContourFilter(ContourConfig),
    /// Structural operations.
    Structural(StructuralConfig),
}

impl Stage {
    /// Human-readable stage name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Crop(_) => "crop",
            Self::Resize(_) => "resize",
            Self::ColorSpace(_) => "color_space",
            Self::Gamma(_) => "gamma",
            Self::Denoise(_) => "denoise",
            Self::Filter(_) => "filter",
            Self::Histogram(_) => "histogram",
            Self::LineRemoval(_) => "line_removal",
            Self::Morphology(_) => "morphology",
            Self::Character(_) => "character",
            Self::Enhance(_) => "enhance",
            Self::Threshold(_) => "threshold",
            Self::AdvancedMorphology(_) => "advanced_morphology",
            Self::ContourFilter(_) => "contour_filter",
            Self::Structural(_) => "structural",
        }
    }

    /// Apply this stage to an image, returning a fresh buffer.
    ///
    /// A stage whose enable flags are all off returns its input
    /// unchanged (as a copy — stages never mutate their input).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotBinary`] from the stages with a
    /// binary precondition (character noise dots, contour filters,
    /// distance transform, skeletonization, watershed markers).
    pub fn apply(&self, image: &Raster) -> Result<Raster, PipelineError> {
        match self {
            Self::Crop(config) => Ok(match (config.enabled, config.bbox) {
                (true, Some(bbox)) => geometry::crop(image, bbox),
                _ => image.clone(),
            }),
            Self::Resize(config) => Ok(if config.enabled {
                geometry::resize(image, config)
            } else {
                image.clone()
            }),
            Self::ColorSpace(config) => Ok(color::convert(image, config.space)),
            Self::Gamma(config) => Ok(if config.enabled {
                color::apply_gamma(image, config.value)
            } else {
                image.clone()
            }),
            Self::Denoise(config) => Ok(denoise::apply(image, config)),
            Self::Filter(config) => Ok(filter::apply(image, config)),
            Self::Histogram(config) => Ok(histogram::apply(image, config)),
            Self::LineRemoval(config) => Ok(lines::apply(image, config)),
            Self::Morphology(config) => Ok(morphology::apply_basic(image, config)),
            Self::Character(config) => character::apply(image, config),
            Self::Enhance(config) => Ok(enhance::apply(image, config)),
            Self::Threshold(config) => Ok(threshold::apply(image, config)),
            Self::AdvancedMorphology(config) => Ok(morphology::apply_advanced(image, config)),
            Self::ContourFilter(config) => contour::apply(image, config),
            Self::Structural(config) => structural::apply(image, config),
        }
    }
}

/// The fifteen stage groups in canonical order.
#[must_use]
pub fn stages(config: &Config) -> [Stage; STAGE_COUNT] {
    [
        Stage::Crop(config.crop.clone()),
        Stage::Resize(config.resize.clone()),
        Stage::ColorSpace(config.color.clone()),
        Stage::Gamma(config.gamma.clone()),
        Stage::Denoise(config.denoise.clone()),
        Stage::Filter(config.filter.clone()),
        Stage::Histogram(config.histogram.clone()),
        Stage::LineRemoval(config.lines.clone()),
        Stage::Morphology(config.morphology.clone()),
        Stage::Character(config.character.clone()),
        Stage::Enhance(config.enhance.clone()),
        Stage::Threshold(config.threshold.clone()),
        Stage::AdvancedMorphology(config.advanced_morphology.clone()),
        Stage::ContourFilter(config.contour.clone()),
        Stage::Structural(config.structural.clone()),
    ]
}

/// Compile-time guard: adding a [`Stage`] variant makes this match
/// non-exhaustive and the build fails — reminding you to bump
/// [`STAGE_COUNT`] and extend [`stages`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(stage: &Stage) {
    match stage {
        Stage::Crop(_)
        | Stage::Resize(_)
        | Stage::ColorSpace(_)
        | Stage::Gamma(_)
        | Stage::Denoise(_)
        | Stage::Filter(_)
        | Stage::Histogram(_)
        | Stage::LineRemoval(_)
        | Stage::Morphology(_)
        | Stage::Character(_)
        | Stage::Enhance(_)
        | Stage::Threshold(_)
        | Stage::AdvancedMorphology(_)
        | Stage::ContourFilter(_)
        | Stage::Structural(_) => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[allow(clippy::cast_possible_truncation)]
    fn sample() -> Raster {
        Raster::Gray(GrayImage::from_fn(12, 12, |x, y| {
            Luma([((x * 17 + y * 11) % 256) as u8])
        }))
    }

    #[test]
    fn canonical_order_is_stable() {
        let names: Vec<&str> = stages(&Config::default()).iter().map(Stage::name).collect();
        assert_eq!(
            names,
            vec![
                "crop",
                "resize",
                "color_space",
                "gamma",
                "denoise",
                "filter",
                "histogram",
                "line_removal",
                "morphology",
                "character",
                "enhance",
                "threshold",
                "advanced_morphology",
                "contour_filter",
                "structural",
            ],
        );
        assert_eq!(names.len(), STAGE_COUNT);
    }

    #[test]
    fn every_default_stage_is_identity() {
        let image = sample();
        for stage in stages(&Config::default()) {
            let out = stage.apply(&image).unwrap();
            assert_eq!(out, image, "default {} stage must be identity", stage.name());
        }
    }

    #[test]
    fn default_stages_are_identity_on_color_input() {
        let image = Raster::Rgb(RgbImage::from_pixel(8, 8, image::Rgb([9, 80, 200])));
        for stage in stages(&Config::default()) {
            let out = stage.apply(&image).unwrap();
            assert_eq!(out, image, "default {} stage must be identity", stage.name());
        }
    }

    #[test]
    fn crop_stage_requires_both_flag_and_box() {
        let image = sample();
        let flag_only = Stage::Crop(CropConfig {
            enabled: true,
            bbox: None,
        });
        assert_eq!(flag_only.apply(&image).unwrap(), image);

        let box_only = Stage::Crop(CropConfig {
            enabled: false,
            bbox: Some((2, 2, 6, 6)),
        });
        assert_eq!(box_only.apply(&image).unwrap(), image);

        let both = Stage::Crop(CropConfig {
            enabled: true,
            bbox: Some((2, 2, 6, 6)),
        });
        let out = both.apply(&image).unwrap();
        assert_eq!((out.width(), out.height()), (4, 4));
    }

    #[test]
    fn gamma_stage_is_identity_at_one_even_when_enabled() {
        let image = sample();
        let stage = Stage::Gamma(GammaConfig {
            enabled: true,
            value: 1.0,
        });
        assert_eq!(stage.apply(&image).unwrap(), image);
    }

    #[test]
    fn stage_apply_never_mutates_its_input() {
        let image = sample();
        let before = image.clone();
        let stage = Stage::Gamma(GammaConfig {
            enabled: true,
            value: 2.2,
        });
        let _ = stage.apply(&image).unwrap();
        assert_eq!(image, before);
    }
}
