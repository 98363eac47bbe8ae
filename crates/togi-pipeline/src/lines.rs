//! Ruled-line removal.
//!
//! A directional opening keeps only structures that fit the 1×N (or
//! N×1) element — i.e. long straight rules — and subtracting that
//! residue from the image removes them while leaving text strokes,
//! which are too short in the probed direction to survive the opening.

use crate::config::LineRemovalConfig;
use crate::morphology::{self, ElementShape, StructuringElement};
use crate::raster::{Raster, saturating_sub};

/// Apply vertical then horizontal rule removal.
#[must_use]
pub fn apply(raster: &Raster, config: &LineRemovalConfig) -> Raster {
    let mut image = raster.clone();

    if config.vertical {
        let element = StructuringElement::new(ElementShape::Rect, 1, config.vertical_kernel.max(1));
        image = image.per_channel(|plane| {
            let rules = morphology::open(plane, &element);
            saturating_sub(plane, &rules)
        });
    }

    if config.horizontal {
        let element =
            StructuringElement::new(ElementShape::Rect, config.horizontal_kernel.max(1), 1);
        image = image.per_channel(|plane| {
            let rules = morphology::open(plane, &element);
            saturating_sub(plane, &rules)
        });
    }

    image
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// A vertical rule at x=5 and a horizontal rule at y=5.
    fn crossed_rules() -> GrayImage {
        let mut img = GrayImage::new(12, 12);
        for y in 0..12 {
            img.put_pixel(5, y, Luma([255]));
        }
        for x in 0..12 {
            img.put_pixel(x, 5, Luma([255]));
        }
        img
    }

    #[test]
    fn disabled_group_is_identity() {
        let img = Raster::Gray(crossed_rules());
        assert_eq!(apply(&img, &LineRemovalConfig::default()), img);
    }

    #[test]
    fn vertical_removal_erases_the_vertical_rule() {
        let config = LineRemovalConfig {
            vertical: true,
            vertical_kernel: 3,
            ..LineRemovalConfig::default()
        };
        let out = apply(&Raster::Gray(crossed_rules()), &config);
        match out {
            Raster::Gray(img) => {
                assert_eq!(img.get_pixel(5, 2).0[0], 0, "vertical rule should be gone");
                assert_eq!(img.get_pixel(2, 5).0[0], 255, "horizontal rule should survive");
            }
            Raster::Rgb(_) => unreachable!(),
        }
    }

    #[test]
    fn horizontal_removal_erases_the_horizontal_rule() {
        let config = LineRemovalConfig {
            horizontal: true,
            horizontal_kernel: 3,
            ..LineRemovalConfig::default()
        };
        let out = apply(&Raster::Gray(crossed_rules()), &config);
        match out {
            Raster::Gray(img) => {
                assert_eq!(img.get_pixel(2, 5).0[0], 0, "horizontal rule should be gone");
                assert_eq!(img.get_pixel(5, 2).0[0], 255, "vertical rule should survive");
            }
            Raster::Rgb(_) => unreachable!(),
        }
    }
}
