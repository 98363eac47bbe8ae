//! Raster buffers shared by every pipeline stage.
//!
//! The pipeline works on dense, row-major, 8-bit rasters with either one
//! or three channels. [`Raster`] is the closed set of those two shapes;
//! stages that only make sense on a single channel reduce explicitly via
//! [`Raster::to_gray`] or [`Raster::ensure_binary`] instead of assuming.
//!
//! Three-channel buffers use the `image` crate's R,G,B byte order
//! throughout. Nothing in the pipeline depends on which primary comes
//! first, only on the order being fixed end to end.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::error::PipelineError;

/// Re-export the underlying buffer types so downstream crates can build
/// and inspect rasters without depending on `image` directly.
pub use image::{GrayImage as GrayBuffer, RgbImage as RgbBuffer};

/// A dense 8-bit raster with one or three channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raster {
    /// Single-channel (grayscale) buffer.
    Gray(GrayImage),
    /// Three-channel buffer in R,G,B byte order.
    Rgb(RgbImage),
}

impl Raster {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Gray(img) => img.width(),
            Self::Rgb(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Gray(img) => img.height(),
            Self::Rgb(img) => img.height(),
        }
    }

    /// Number of channels: 1 for grayscale, 3 for color.
    #[must_use]
    pub const fn channel_count(&self) -> u32 {
        match self {
            Self::Gray(_) => 1,
            Self::Rgb(_) => 3,
        }
    }

    /// The raw sample bytes in row-major order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Gray(img) => img.as_raw(),
            Self::Rgb(img) => img.as_raw(),
        }
    }

    /// Reduce to a single channel using BT.601 luma weights.
    ///
    /// A grayscale raster is returned as a copy; a color raster is
    /// reduced with `0.299*R + 0.587*G + 0.114*B` (integer rounding).
    #[must_use]
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Self::Gray(img) => img.clone(),
            Self::Rgb(img) => GrayImage::from_fn(img.width(), img.height(), |x, y| {
                let Rgb([r, g, b]) = *img.get_pixel(x, y);
                Luma([luma(r, g, b)])
            }),
        }
    }

    /// Apply a single-channel transformation to every channel.
    ///
    /// A grayscale raster is transformed directly. A color raster is
    /// split into its three channels, each transformed independently,
    /// and reassembled — valid for any linear or per-channel operation.
    #[must_use]
    pub fn per_channel(&self, f: impl Fn(&GrayImage) -> GrayImage) -> Self {
        match self {
            Self::Gray(img) => Self::Gray(f(img)),
            Self::Rgb(img) => {
                let channels = split_channels(img);
                let transformed: [GrayImage; 3] = std::array::from_fn(|c| f(&channels[c]));
                Self::Rgb(merge_channels(&transformed))
            }
        }
    }

    /// Apply a pointwise map to every sample in every channel.
    #[must_use]
    pub fn map_samples(&self, f: impl Fn(u8) -> u8) -> Self {
        match self {
            Self::Gray(img) => {
                let mut out = img.clone();
                for px in out.pixels_mut() {
                    px.0[0] = f(px.0[0]);
                }
                Self::Gray(out)
            }
            Self::Rgb(img) => {
                let mut out = img.clone();
                for px in out.pixels_mut() {
                    for sample in &mut px.0 {
                        *sample = f(*sample);
                    }
                }
                Self::Rgb(out)
            }
        }
    }

    /// Number of distinct sample values across the whole buffer.
    #[must_use]
    pub fn count_distinct(&self) -> usize {
        let mut seen = [false; 256];
        for &byte in self.as_bytes() {
            seen[usize::from(byte)] = true;
        }
        seen.iter().filter(|&&s| s).count()
    }

    /// Reduce to a single channel and verify the result is two-valued.
    ///
    /// This is the hard precondition for noise-dot removal, contour and
    /// connected-component filtering, distance transforms, skeletonization
    /// and watershed-marker generation. The pipeline never binarizes on a
    /// stage's behalf — a non-binary input is an error, not a hint.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotBinary`] when more than two distinct
    /// sample values remain after grayscale reduction.
    pub fn ensure_binary(&self) -> Result<GrayImage, PipelineError> {
        let gray = self.to_gray();
        let distinct = Self::Gray(gray.clone()).count_distinct();
        if distinct > 2 {
            return Err(PipelineError::NotBinary { distinct });
        }
        Ok(gray)
    }
}

impl From<GrayImage> for Raster {
    fn from(img: GrayImage) -> Self {
        Self::Gray(img)
    }
}

impl From<RgbImage> for Raster {
    fn from(img: RgbImage) -> Self {
        Self::Rgb(img)
    }
}

/// BT.601 luma of one pixel with integer rounding.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((weighted + 500) / 1000) as u8
}

/// Split a color buffer into its three channel planes.
#[must_use]
pub fn split_channels(img: &RgbImage) -> [GrayImage; 3] {
    std::array::from_fn(|c| {
        GrayImage::from_fn(img.width(), img.height(), |x, y| {
            Luma([img.get_pixel(x, y).0[c]])
        })
    })
}

/// Reassemble three channel planes into a color buffer.
///
/// The planes must share dimensions; this is an internal invariant of
/// [`Raster::per_channel`], which only splits same-size planes.
#[must_use]
pub fn merge_channels(planes: &[GrayImage; 3]) -> RgbImage {
    RgbImage::from_fn(planes[0].width(), planes[0].height(), |x, y| {
        Rgb([
            planes[0].get_pixel(x, y).0[0],
            planes[1].get_pixel(x, y).0[0],
            planes[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Count foreground (non-zero) pixels in a single-channel buffer.
#[must_use]
pub fn count_nonzero(img: &GrayImage) -> u64 {
    img.pixels().filter(|px| px.0[0] != 0).count() as u64
}

/// Saturating pixel-wise subtraction `a - b` of same-size buffers.
#[must_use]
pub fn saturating_sub(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0].saturating_sub(b.get_pixel(x, y).0[0])])
    })
}

/// Bitwise OR of same-size single-channel buffers.
#[must_use]
pub fn bitwise_or(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] | b.get_pixel(x, y).0[0]])
    })
}

/// Bitwise AND of same-size single-channel buffers.
#[must_use]
pub fn bitwise_and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] & b.get_pixel(x, y).0[0]])
    })
}
