//! Character-shape operations: separation, dilation, erosion, and
//! speckle removal.
//!
//! The morphological operations work on any image; noise-dot removal
//! requires a binary image because it measures and paints out contours.

use crate::config::CharacterConfig;
use crate::contour::{contour_area, external_contours, fill_contour};
use crate::error::PipelineError;
use crate::morphology::{self, StructuringElement};
use crate::raster::Raster;

/// Apply the character group in its fixed sub-order: separation,
/// dilation, erosion, noise-dot removal.
///
/// # Errors
///
/// Returns [`PipelineError::NotBinary`] when noise-dot removal is
/// enabled and the image has more than two distinct values.
pub fn apply(raster: &Raster, config: &CharacterConfig) -> Result<Raster, PipelineError> {
    let mut image = raster.clone();

    if config.separation {
        let element = StructuringElement::ellipse(config.separation_kernel.max(1));
        image = image.per_channel(|plane| morphology::open(plane, &element));
    }

    if config.dilation {
        let element = StructuringElement::ellipse(config.dilation_kernel.max(1));
        let iterations = config.dilation_iterations;
        image = image.per_channel(|plane| {
            let mut out = plane.clone();
            for _ in 0..iterations {
                out = morphology::dilate(&out, &element);
            }
            out
        });
    }

    if config.erosion {
        let element = StructuringElement::ellipse(config.erosion_kernel.max(1));
        let iterations = config.erosion_iterations;
        image = image.per_channel(|plane| {
            let mut out = plane.clone();
            for _ in 0..iterations {
                out = morphology::erode(&out, &element);
            }
            out
        });
    }

    if config.noise_dots {
        let mut binary = image.ensure_binary()?;
        for contour in external_contours(&binary) {
            if contour_area(&contour.points) < config.min_dot_area {
                fill_contour(&mut binary, &contour.points, 0);
            }
        }
        image = Raster::Gray(binary);
    }

    Ok(image)
}
